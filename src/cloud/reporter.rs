//! Telemetry reporter — publishes state to the dashboard and ingests
//! remote commands.
//!
//! The reporter sits on the [`EventSink`] port: the application core
//! emits events without knowing a dashboard exists, and the reporter
//! translates them into channel publishes. Inbound channel writes are
//! buffered in a bounded queue and translated into [`AppCommand`]s that
//! the main loop feeds back to the service.
//!
//! Transport failures are logged and dropped — the next cadence resends
//! current values anyway, and pump control never waits on the cloud.

use heapless::Deque;
use log::{debug, info, warn};

use crate::adapters::net::LinkInfo;
use crate::app::commands::AppCommand;
use crate::app::events::{AppEvent, TelemetryData};
use crate::app::ports::EventSink;
use crate::config::{SystemConfig, FIRMWARE_VERSION};
use crate::fsm::context::PumpMode;
use crate::fsm::StateId;

use super::channels::{self, Channel};
use super::{ChannelWrite, CloudPort, CloudValue};

/// Bound on buffered inbound writes between loop iterations.
const INBOUND_QUEUE_CAP: usize = 16;

pub struct TelemetryReporter<C: CloudPort> {
    cloud: C,
    link: LinkInfo,
    boot_count: u32,
    inbound: Deque<ChannelWrite, INBOUND_QUEUE_CAP>,
    /// Set when the last publish batch failed, cleared on success.
    publish_failed: bool,
}

impl<C: CloudPort> TelemetryReporter<C> {
    pub fn new(cloud: C) -> Self {
        Self {
            cloud,
            link: LinkInfo::default(),
            boot_count: 0,
            inbound: Deque::new(),
            publish_failed: false,
        }
    }

    /// Update the link snapshot published with telemetry.
    pub fn set_link(&mut self, link: LinkInfo) {
        self.link = link;
    }

    /// Boot count shown on the dashboard (published once at start).
    pub fn set_boot_count(&mut self, count: u32) {
        self.boot_count = count;
    }

    // ── Inbound commands ──────────────────────────────────────

    /// Drain the transport's inbound writes into the bounded queue.
    /// Call once per loop iteration, before processing commands.
    pub fn ingest_pending(&mut self) {
        while let Some(write) = self.cloud.poll() {
            if self.inbound.push_back(write).is_err() {
                warn!("cloud: inbound queue full, dropping write");
                break;
            }
        }
    }

    /// Whether any inbound writes are waiting to be translated.
    pub fn has_pending(&self) -> bool {
        !self.inbound.is_empty()
    }

    /// Pop the next buffered write and translate it into a command.
    ///
    /// `current` is the live config — config-channel writes are applied
    /// as a delta on top of it, so successive writes compose as long as
    /// the caller applies each command before requesting the next.
    pub fn next_command(&mut self, current: &SystemConfig) -> Option<AppCommand> {
        while let Some(write) = self.inbound.pop_front() {
            match translate(&write, current) {
                Some(cmd) => return Some(cmd),
                None => {
                    // Button release or unmapped channel; skip silently.
                    continue;
                }
            }
        }
        None
    }

    // ── Outbound publishing ───────────────────────────────────

    fn publish_telemetry(&mut self, t: &TelemetryData) {
        let mut results = [
            self.cloud
                .publish(channels::CH_AIR_TEMP, &CloudValue::Float(t.temperature)),
            self.cloud
                .publish(channels::CH_HUMIDITY, &CloudValue::Float(t.humidity_pct)),
            self.cloud.publish(
                channels::CH_SOIL_MOISTURE,
                &CloudValue::Float(t.soil_moisture_pct),
            ),
            self.cloud
                .publish(channels::CH_HEAT_INDEX, &CloudValue::Float(t.heat_index)),
            Ok(()),
            Ok(()),
        ];

        if let Some(pct) = self.link.rssi_percent() {
            results[4] = self
                .cloud
                .publish(channels::CH_RSSI, &CloudValue::Int(pct as i64));
        }
        if !self.link.ip.is_empty() {
            results[5] = self
                .cloud
                .publish(channels::CH_IP_ADDR, &CloudValue::str_from(&self.link.ip));
        }

        self.publish_pump_indicators(t.state);
        self.note_batch(results.iter().all(|r| r.is_ok()));
    }

    fn publish_pump_indicators(&mut self, state: StateId) {
        let pump_on = state == StateId::Running;
        let on = self
            .cloud
            .publish(channels::CH_PUMP_ON, &CloudValue::Int(pump_on as i64));
        let off = self
            .cloud
            .publish(channels::CH_PUMP_OFF, &CloudValue::Int(!pump_on as i64));
        debug!(
            "cloud: pump indicator {:?}, widget colour {}",
            state,
            channels::state_colour(state)
        );
        self.note_batch(on.is_ok() && off.is_ok());
    }

    fn publish_identity(&mut self) {
        let fw = self.cloud.publish(
            channels::CH_FW_VERSION,
            &CloudValue::str_from(FIRMWARE_VERSION),
        );
        let boot = self.cloud.publish(
            channels::CH_BOOT_COUNT,
            &CloudValue::Int(self.boot_count as i64),
        );
        if fw.is_ok() && boot.is_ok() {
            info!(
                "cloud: identity published (fw v{}, wake #{})",
                FIRMWARE_VERSION, self.boot_count
            );
        }
        self.note_batch(fw.is_ok() && boot.is_ok());
    }

    /// Log publish failures once per failure streak, not once per value.
    fn note_batch(&mut self, ok: bool) {
        if ok {
            self.publish_failed = false;
        } else if !self.publish_failed {
            warn!("cloud: publish failed, will retry next cadence");
            self.publish_failed = true;
        }
    }
}

impl<C: CloudPort> EventSink for TelemetryReporter<C> {
    fn emit(&mut self, event: &AppEvent) {
        if !self.cloud.is_connected() {
            return;
        }
        match event {
            AppEvent::Telemetry(t) => self.publish_telemetry(t),
            AppEvent::StateChanged { to, .. } => {
                self.publish_pump_indicators(*to);
            }
            AppEvent::MoistureAlarm { moisture_pct } => {
                debug!(
                    "cloud: moisture widget flagged, colour {}",
                    channels::COLOUR_YELLOW
                );
                let r = self.cloud.publish(
                    channels::CH_SOIL_MOISTURE,
                    &CloudValue::Float(*moisture_pct),
                );
                self.note_batch(r.is_ok());
            }
            AppEvent::FaultDetected(_) => {
                self.publish_pump_indicators(StateId::Faulted);
            }
            AppEvent::Started(_) => self.publish_identity(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Channel-write translation
// ───────────────────────────────────────────────────────────────

/// Map an inbound channel write onto an [`AppCommand`].
/// Returns `None` for button releases and unmapped channels.
fn translate(write: &ChannelWrite, current: &SystemConfig) -> Option<AppCommand> {
    let truthy = write.value.as_f32().map(|v| v != 0.0).unwrap_or(false);

    let cmd = match write.channel {
        channels::CH_PUMP_ON if truthy => AppCommand::PumpOn,
        channels::CH_PUMP_OFF if truthy => AppCommand::PumpOff,
        channels::CH_PUMP_BUTTON if truthy => AppCommand::PumpToggle,
        channels::CH_PUMP_MODE => {
            let mode = match write.value.as_f32()? as i32 {
                0 => PumpMode::Auto,
                1 => PumpMode::ForcedOn,
                2 => PumpMode::ForcedOff,
                other => {
                    warn!("cloud: unknown pump mode {}", other);
                    return None;
                }
            };
            AppCommand::SetPumpMode(mode)
        }
        channels::CH_CFG_SAVE if truthy => AppCommand::SaveConfig,
        channels::CH_FACTORY_RESET if truthy => AppCommand::FactoryReset,
        ch if channels::is_config_channel(ch) => {
            let cfg = apply_config_write(ch, &write.value, current)?;
            AppCommand::UpdateConfig(cfg)
        }
        _ => return None,
    };
    Some(cmd)
}

/// Apply a single config-channel write as a delta on `current`.
fn apply_config_write(
    channel: Channel,
    value: &CloudValue,
    current: &SystemConfig,
) -> Option<SystemConfig> {
    let v = value.as_f32()?;
    let mut cfg = current.clone();
    match channel {
        channels::CH_CFG_MIN_AIR_TEMP => cfg.min_air_temp_c = v,
        channels::CH_CFG_MAX_AIR_TEMP => cfg.max_air_temp_c = v,
        channels::CH_CFG_MIN_HUMIDITY => cfg.min_humidity_pct = v,
        channels::CH_CFG_MAX_HUMIDITY => cfg.max_humidity_pct = v,
        channels::CH_CFG_DRY_SOIL => cfg.dry_soil_pct = v,
        channels::CH_CFG_WET_SOIL => cfg.wet_soil_pct = v,
        channels::CH_CFG_PUMP_ON_SECS => cfg.pump_on_secs = v as u16,
        channels::CH_CFG_USE_CELSIUS => cfg.use_celsius = v != 0.0,
        channels::CH_CFG_MOIST_ADJ => cfg.moist_adj_factor = v,
        channels::CH_CFG_ALARM_INTERVAL => cfg.moist_alarm_interval_secs = v as u32,
        channels::CH_CFG_ALARM_LEVEL => cfg.moist_alarm_level_pct = v,
        channels::CH_CFG_SLEEP_FACTOR => cfg.deep_sleep_interval_factor = v as u32,
        channels::CH_CFG_TIME_TO_SLEEP => cfg.time_to_deep_sleep_secs = v as u32,
        channels::CH_CFG_FORCE_SLEEP => cfg.force_deep_sleep = v != 0.0,
        channels::CH_CFG_LOOP_INTERVAL_MS => cfg.control_loop_interval_ms = v as u32,
        channels::CH_CFG_TELEM_INTERVAL => cfg.telemetry_interval_secs = v as u32,
        _ => return None,
    }
    Some(cfg)
}
