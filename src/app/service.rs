//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the FSM, safety supervisor, and shared context.
//! It exposes a clean, hardware-agnostic API.  All I/O flows through
//! port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │       AppService        │
//! ActuatorPort ◀──│  FSM · Safety · Alarm   │
//!                 └────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::fsm::context::{FsmContext, PumpMode};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::safety::SafetySupervisor;
use crate::sensors::dht;

use super::commands::AppCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorPort, ConfigPort, EventSink, SensorPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    safety: SafetySupervisor,
    /// Seconds per control tick (derived from config).
    tick_secs: f32,
    tick_count: u64,
    config_dirty: bool,
    dirty_since_tick: u64,
    /// Tick of the last moisture alarm, for rate limiting.
    last_alarm_tick: Option<u64>,
    /// Deep sleep requested by command; consumed by the main loop.
    sleep_requested: bool,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM — call [`Self::start`] next.
    pub fn new(config: SystemConfig) -> Self {
        let tick_secs = config.control_loop_interval_ms as f32 / 1000.0;
        let safety = SafetySupervisor::new(&config);
        let ctx = FsmContext::new(config);
        let state_table = build_state_table();
        let fsm = Fsm::new(state_table, StateId::Idle);

        Self {
            fsm,
            ctx,
            safety,
            tick_secs,
            tick_count: 0,
            config_dirty: false,
            dirty_since_tick: 0,
            last_alarm_tick: None,
            sleep_requested: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in its default initial state (Idle).
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle: read sensors → safety → FSM → actuators.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`] — this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(&mut self, hw: &mut (impl SensorPort + ActuatorPort), sink: &mut impl EventSink) {
        self.tick_count += 1;
        let prev_state = self.fsm.current_state();
        let prev_faults = self.ctx.fault_flags;

        // 1. Read sensors via SensorPort. On failure the previous reading
        //    is retained and marked stale — the FSM never acts on it.
        match hw.read_all(&self.ctx.config, self.tick_count) {
            Ok(reading) => self.ctx.reading = reading,
            Err(e) => {
                warn!("sensor read failed, retaining previous reading: {}", e);
                self.ctx.reading.fresh = false;
            }
        }

        // 2. Safety evaluation (before the FSM sees the tick).
        self.safety.set_relay_commanded(self.ctx.commands.relay_on);
        let faults = self.safety.evaluate();
        self.ctx.fault_flags = faults;
        if faults != prev_faults && faults != 0 {
            warn!("relay fault latched: flags=0b{:08b}", faults);
            sink.emit(&AppEvent::FaultDetected(faults));
        }

        // 3. FSM tick (pure state logic).
        self.fsm.tick(&mut self.ctx);

        // 4. Apply actuator commands via ActuatorPort.
        self.apply_actuators(hw);

        // 5. Emit state change if the FSM moved.
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }

        // 6. Low-moisture alarm (rate limited).
        self.check_moisture_alarm(sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from dashboard, button, etc.).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::PumpOn => self.set_pump_mode(PumpMode::ForcedOn, hw, sink),
            AppCommand::PumpOff => self.set_pump_mode(PumpMode::ForcedOff, hw, sink),
            AppCommand::PumpToggle => {
                let next = if self.fsm.current_state() == StateId::Running {
                    PumpMode::ForcedOff
                } else {
                    PumpMode::ForcedOn
                };
                self.set_pump_mode(next, hw, sink);
            }
            AppCommand::SetPumpMode(mode) => self.set_pump_mode(mode, hw, sink),
            AppCommand::UpdateConfig(new_config) => match new_config.validate() {
                Ok(()) => {
                    self.mark_config_dirty();
                    self.ctx.config = new_config;
                    info!("Configuration updated at runtime");
                }
                Err(reason) => {
                    // A bad dashboard write must never reach the live
                    // loop or mark the config dirty.
                    warn!("Remote config update rejected: {}", reason);
                }
            },
            AppCommand::SaveConfig => {
                self.dirty_since_tick = 0;
                self.mark_config_dirty();
                info!("Explicit config save requested (will flush on next auto-save check)");
            }
            AppCommand::ForceDeepSleep => {
                info!("Deep sleep requested remotely");
                self.sleep_requested = true;
            }
            AppCommand::FactoryReset => {
                warn!("Factory reset: restoring default configuration");
                self.ctx.config = SystemConfig::default();
                self.ctx.pump_mode = PumpMode::Auto;
                self.dirty_since_tick = 0;
                self.mark_config_dirty();
            }
        }
    }

    fn set_pump_mode(
        &mut self,
        mode: PumpMode,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if self.ctx.pump_mode == mode {
            return;
        }
        info!("Pump mode: {:?} -> {:?}", self.ctx.pump_mode, mode);
        self.ctx.pump_mode = mode;

        // Let the FSM react immediately rather than waiting a full tick.
        let prev = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        self.apply_actuators(hw);
        let new = self.fsm.current_state();
        if new != prev {
            sink.emit(&AppEvent::StateChanged { from: prev, to: new });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the current context.
    ///
    /// Temperature is converted to the configured display unit here; the
    /// heat index was already produced in that unit by the sensor hub.
    pub fn build_telemetry(&self) -> TelemetryData {
        let r = &self.ctx.reading;
        let temperature = if self.ctx.config.use_celsius {
            r.temperature_c
        } else {
            dht::c_to_f(r.temperature_c)
        };
        TelemetryData {
            state: self.fsm.current_state(),
            temperature,
            humidity_pct: r.humidity_pct,
            soil_moisture_pct: r.soil_moisture_pct,
            heat_index: r.heat_index,
            reading_fresh: r.fresh,
            pump_on: self.ctx.commands.relay_on,
            pump_mode: self.ctx.pump_mode,
            fault_flags: self.ctx.fault_flags,
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Seconds since the control loop started.
    pub fn uptime_secs(&self) -> u64 {
        (self.tick_count as f32 * self.tick_secs) as u64
    }

    /// Current latched fault bitmask (0 = no faults).
    pub fn fault_flags(&self) -> u8 {
        self.ctx.fault_flags
    }

    /// Whether a remote deep-sleep request is pending.
    pub fn sleep_requested(&self) -> bool {
        self.sleep_requested
    }

    /// Clone of the live configuration (for dashboard read-back or delta updates).
    pub fn current_config(&self) -> SystemConfig {
        self.ctx.config.clone()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Translate FSM actuator commands into port calls.
    /// Faults override everything: all actuators off, LED handled by the
    /// faulted state's blink pattern.
    fn apply_actuators(&self, hw: &mut impl ActuatorPort) {
        let cmds = &self.ctx.commands;
        if self.safety.has_faults() && cmds.relay_on {
            hw.all_off();
            return;
        }
        hw.set_relay(cmds.relay_on);
        hw.set_led(cmds.led_on);
    }

    /// Emit a moisture alarm when the soil drops below the alarm level,
    /// at most once per `moist_alarm_interval_secs`.
    fn check_moisture_alarm(&mut self, sink: &mut impl EventSink) {
        let r = &self.ctx.reading;
        if !r.fresh || r.soil_moisture_pct >= self.ctx.config.moist_alarm_level_pct {
            return;
        }

        let interval_ticks =
            (self.ctx.config.moist_alarm_interval_secs as f32 / self.tick_secs) as u64;
        let due = match self.last_alarm_tick {
            None => true,
            Some(last) => self.tick_count.saturating_sub(last) >= interval_ticks.max(1),
        };
        if due {
            warn!(
                "Moisture alarm: {:.1}% < {:.1}%",
                r.soil_moisture_pct, self.ctx.config.moist_alarm_level_pct
            );
            self.last_alarm_tick = Some(self.tick_count);
            sink.emit(&AppEvent::MoistureAlarm {
                moisture_pct: r.soil_moisture_pct,
            });
        }
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified. Called by `handle_command(UpdateConfig)`.
    pub fn mark_config_dirty(&mut self) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_tick = self.tick_count;
        }
    }

    /// Check if auto-save should trigger (5 seconds after last change).
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, storage: &mut impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        let ticks_since_dirty = self.tick_count.saturating_sub(self.dirty_since_tick);
        let secs_since_dirty = ticks_since_dirty as f32 * self.tick_secs;
        if secs_since_dirty < 5.0 {
            return false;
        }
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config auto-saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                false
            }
        }
    }

    /// Force-save if dirty (call before deep sleep).
    pub fn force_save_if_dirty(&mut self, storage: &mut impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config force-saved before sleep");
            }
            Err(e) => {
                warn!("Config force-save failed: {}", e);
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;
    use crate::fsm::context::SensorReading;

    // ── Mock ports ────────────────────────────────────────────

    struct MockHw {
        reading: Result<SensorReading, SensorError>,
        relay_on: bool,
        led_on: bool,
    }

    impl MockHw {
        fn with_moisture(pct: f32) -> Self {
            Self {
                reading: Ok(SensorReading {
                    temperature_c: 25.0,
                    humidity_pct: 50.0,
                    soil_moisture_pct: pct,
                    heat_index: 25.0,
                    timestamp_tick: 0,
                    fresh: true,
                }),
                relay_on: false,
                led_on: false,
            }
        }

        fn failing() -> Self {
            Self {
                reading: Err(SensorError::NoData),
                relay_on: false,
                led_on: false,
            }
        }
    }

    impl SensorPort for MockHw {
        fn read_all(
            &mut self,
            _config: &SystemConfig,
            tick: u64,
        ) -> Result<SensorReading, SensorError> {
            self.reading.map(|mut r| {
                r.timestamp_tick = tick;
                r
            })
        }
    }

    impl ActuatorPort for MockHw {
        fn set_relay(&mut self, on: bool) {
            self.relay_on = on;
        }
        fn set_led(&mut self, lit: bool) {
            self.led_on = lit;
        }
        fn is_relay_on(&self) -> bool {
            self.relay_on
        }
        fn all_off(&mut self) {
            self.relay_on = false;
            self.led_on = false;
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<AppEvent>,
    }

    impl EventSink for RecordingSink {
        fn emit(&mut self, event: &AppEvent) {
            self.events.push(event.clone());
        }
    }

    fn started_service() -> (AppService, RecordingSink) {
        let mut sink = RecordingSink::default();
        let mut app = AppService::new(SystemConfig::default());
        app.start(&mut sink);
        (app, sink)
    }

    // ── Tests ─────────────────────────────────────────────────

    #[test]
    fn dry_soil_starts_pump_and_relay_follows() {
        let (mut app, mut sink) = started_service();
        let mut hw = MockHw::with_moisture(20.0); // below dry threshold 30

        app.tick(&mut hw, &mut sink);
        assert_eq!(app.state(), StateId::Running);
        assert!(hw.relay_on);
        assert!(hw.led_on);
    }

    #[test]
    fn wet_soil_keeps_pump_off() {
        let (mut app, mut sink) = started_service();
        let mut hw = MockHw::with_moisture(80.0);

        for _ in 0..10 {
            app.tick(&mut hw, &mut sink);
        }
        assert_eq!(app.state(), StateId::Idle);
        assert!(!hw.relay_on);
    }

    #[test]
    fn sensor_failure_retains_previous_reading() {
        let (mut app, mut sink) = started_service();

        // Seed a valid wet reading first.
        let mut hw = MockHw::with_moisture(80.0);
        app.tick(&mut hw, &mut sink);
        let before = app.build_telemetry();
        assert!(before.reading_fresh);

        // Then fail; values are retained but marked stale.
        let mut hw = MockHw::failing();
        app.tick(&mut hw, &mut sink);
        let after = app.build_telemetry();
        assert!(!after.reading_fresh);
        assert_eq!(after.soil_moisture_pct, before.soil_moisture_pct);
        assert_eq!(app.state(), StateId::Idle);
    }

    #[test]
    fn pump_runs_for_configured_burst_then_stops() {
        let (mut app, mut sink) = started_service();
        let mut hw = MockHw::with_moisture(20.0);

        app.tick(&mut hw, &mut sink); // Idle -> Running
        assert_eq!(app.state(), StateId::Running);

        // Default pump_on_secs = 20 at 1 Hz.
        for _ in 0..20 {
            app.tick(&mut hw, &mut sink);
        }
        assert_eq!(app.state(), StateId::Idle);
        assert!(!hw.relay_on);

        // Budget for this wake is spent; dry soil must not restart it.
        for _ in 0..10 {
            app.tick(&mut hw, &mut sink);
        }
        assert_eq!(app.state(), StateId::Idle);
        assert!(!hw.relay_on);
    }

    #[test]
    fn soil_reaching_wet_stops_pump_early() {
        let (mut app, mut sink) = started_service();
        let mut hw = MockHw::with_moisture(20.0);

        app.tick(&mut hw, &mut sink);
        assert_eq!(app.state(), StateId::Running);

        hw = MockHw::with_moisture(75.0); // above wet threshold 70
        hw.relay_on = true;
        app.tick(&mut hw, &mut sink);
        assert_eq!(app.state(), StateId::Idle);
        assert!(!hw.relay_on);
    }

    #[test]
    fn forced_off_blocks_watering() {
        let (mut app, mut sink) = started_service();
        let mut hw = MockHw::with_moisture(20.0);

        app.handle_command(AppCommand::PumpOff, &mut hw, &mut sink);
        for _ in 0..10 {
            app.tick(&mut hw, &mut sink);
        }
        assert_eq!(app.state(), StateId::Idle);
        assert!(!hw.relay_on);
    }

    #[test]
    fn forced_on_starts_pump_on_wet_soil() {
        let (mut app, mut sink) = started_service();
        let mut hw = MockHw::with_moisture(80.0);

        app.tick(&mut hw, &mut sink);
        assert_eq!(app.state(), StateId::Idle);

        app.handle_command(AppCommand::PumpOn, &mut hw, &mut sink);
        app.tick(&mut hw, &mut sink);
        assert_eq!(app.state(), StateId::Running);
        assert!(hw.relay_on);
    }

    #[test]
    fn moisture_alarm_is_rate_limited() {
        let (mut app, mut sink) = started_service();
        // 10% < alarm level 15%, and also < dry threshold so the pump runs;
        // the alarm is independent of pump state.
        let mut hw = MockHw::with_moisture(10.0);

        for _ in 0..60 {
            app.tick(&mut hw, &mut sink);
        }
        let alarms = sink
            .events
            .iter()
            .filter(|e| matches!(e, AppEvent::MoistureAlarm { .. }))
            .count();
        // Default interval is 600 s — only the first alarm fires in 60 ticks.
        assert_eq!(alarms, 1);
    }

    #[test]
    fn force_sleep_command_sets_flag() {
        let (mut app, mut sink) = started_service();
        let mut hw = MockHw::with_moisture(50.0);
        assert!(!app.sleep_requested());
        app.handle_command(AppCommand::ForceDeepSleep, &mut hw, &mut sink);
        assert!(app.sleep_requested());
    }

    #[test]
    fn factory_reset_restores_defaults_and_marks_dirty() {
        let (mut app, mut sink) = started_service();
        let mut hw = MockHw::with_moisture(50.0);

        let mut custom = SystemConfig::default();
        custom.pump_on_secs = 5;
        app.handle_command(AppCommand::UpdateConfig(custom), &mut hw, &mut sink);
        assert_eq!(app.current_config().pump_on_secs, 5);

        app.handle_command(AppCommand::FactoryReset, &mut hw, &mut sink);
        assert_eq!(
            app.current_config().pump_on_secs,
            SystemConfig::default().pump_on_secs
        );
        assert!(app.is_config_dirty());
    }

    #[test]
    fn invalid_remote_config_update_is_rejected() {
        let (mut app, mut sink) = started_service();
        let mut hw = MockHw::with_moisture(20.0);

        let before = app.current_config();
        let mut bad = SystemConfig::default();
        bad.wet_soil_pct = 10.0; // below dry threshold — would chatter the relay
        app.handle_command(AppCommand::UpdateConfig(bad), &mut hw, &mut sink);

        // The write never reaches the live config and leaves nothing to save.
        assert_eq!(app.current_config(), before);
        assert!(!app.is_config_dirty());

        // The burst on dry soil runs uninterrupted on the valid thresholds.
        app.tick(&mut hw, &mut sink);
        assert_eq!(app.state(), StateId::Running);
        for _ in 0..5 {
            app.tick(&mut hw, &mut sink);
            assert_eq!(app.state(), StateId::Running);
            assert!(hw.relay_on);
        }
    }

    #[test]
    fn telemetry_converts_to_fahrenheit_when_configured() {
        let mut sink = RecordingSink::default();
        let mut config = SystemConfig::default();
        config.use_celsius = false;
        let mut app = AppService::new(config);
        app.start(&mut sink);

        let mut hw = MockHw::with_moisture(50.0); // 25 °C mock air temp
        app.tick(&mut hw, &mut sink);
        let t = app.build_telemetry();
        assert!((t.temperature - 77.0).abs() < 0.1);
    }
}
