//! Property and fuzz-style tests for robustness of the control core.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use smartfarm::adapters::net::rssi_to_percent;
use smartfarm::adapters::nvs::NvsAdapter;
use smartfarm::app::events::AppEvent;
use smartfarm::app::ports::{ActuatorPort, ConfigPort, EventSink, SensorPort, StoragePort};
use smartfarm::app::service::AppService;
use smartfarm::cloud::reporter::TelemetryReporter;
use smartfarm::cloud::{ChannelWrite, CloudValue, SimCloud};
use smartfarm::config::SystemConfig;
use smartfarm::error::SensorError;
use smartfarm::fsm::context::SensorReading;
use smartfarm::fsm::StateId;
use smartfarm::power::{BootCounter, DeepSleepScheduler, MAX_SLEEP_SECS};

// ── Shared mocks ──────────────────────────────────────────────

struct SeqHw {
    moistures: Vec<f32>,
    idx: usize,
    relay_on: bool,
}

impl SeqHw {
    fn new(moistures: Vec<f32>) -> Self {
        Self {
            moistures,
            idx: 0,
            relay_on: false,
        }
    }
}

impl SensorPort for SeqHw {
    fn read_all(&mut self, _config: &SystemConfig, tick: u64) -> Result<SensorReading, SensorError> {
        let pct = self.moistures[self.idx % self.moistures.len()];
        self.idx += 1;
        Ok(SensorReading {
            temperature_c: 22.0,
            humidity_pct: 50.0,
            soil_moisture_pct: pct,
            heat_index: 22.0,
            timestamp_tick: tick,
            fresh: true,
        })
    }
}

impl ActuatorPort for SeqHw {
    fn set_relay(&mut self, on: bool) {
        self.relay_on = on;
    }
    fn set_led(&mut self, _lit: bool) {}
    fn is_relay_on(&self) -> bool {
        self.relay_on
    }
    fn all_off(&mut self) {
        self.relay_on = false;
    }
}

struct NullSink;
impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

// ── Watering-burst invariants ─────────────────────────────────

proptest! {
    /// For any sequence of (valid) moisture readings the relay is never
    /// commanded on for longer than one burst at a stretch, and normal
    /// sensor-driven operation never trips the relay overrun guard.
    #[test]
    fn relay_streak_never_exceeds_burst_length(
        moistures in proptest::collection::vec(0.0f32..=100.0, 1..=40),
        pump_on_secs in 5u16..=30,
    ) {
        let config = SystemConfig {
            pump_on_secs,
            ..Default::default()
        };
        let mut app = AppService::new(config);
        let mut sink = NullSink;
        app.start(&mut sink);
        let mut hw = SeqHw::new(moistures);

        let mut streak = 0u32;
        let mut max_streak = 0u32;
        for _ in 0..200 {
            app.tick(&mut hw, &mut sink);
            if hw.relay_on {
                streak += 1;
                max_streak = max_streak.max(streak);
            } else {
                streak = 0;
            }
        }

        prop_assert!(
            max_streak <= pump_on_secs as u32,
            "relay on for {} consecutive ticks, burst limit {}",
            max_streak,
            pump_on_secs
        );
        prop_assert_ne!(app.state(), StateId::Faulted);
        prop_assert_eq!(app.fault_flags(), 0);
    }

    /// Once the wake-cycle budget is spent, dry soil never restarts the
    /// pump, no matter how long the wake lasts.
    #[test]
    fn spent_budget_blocks_restart(extra_ticks in 1u32..=500) {
        let config = SystemConfig::default(); // burst 20s
        let mut app = AppService::new(config.clone());
        let mut sink = NullSink;
        app.start(&mut sink);
        let mut hw = SeqHw::new(vec![10.0]); // permanently dry

        // First burst: enter + pump_on_secs ticks of running.
        for _ in 0..(config.pump_on_secs as u32 + 2) {
            app.tick(&mut hw, &mut sink);
        }
        prop_assert_eq!(app.state(), StateId::Idle);

        for _ in 0..extra_ticks {
            app.tick(&mut hw, &mut sink);
            prop_assert!(!hw.relay_on);
        }
    }
}

// ── Sleep plan bounds ─────────────────────────────────────────

proptest! {
    /// The sleep duration is always at least one second and never above
    /// the clamp, for any factor/window combination a remote write could
    /// produce.
    #[test]
    fn sleep_plan_is_always_bounded(
        factor in 0u32..=u32::MAX,
        window in 0u32..=u32::MAX,
    ) {
        let cfg = SystemConfig {
            force_deep_sleep: true,
            deep_sleep_interval_factor: factor,
            time_to_deep_sleep_secs: window,
            ..Default::default()
        };
        let plan = DeepSleepScheduler::new().decide(0, &cfg).unwrap();
        prop_assert!(plan.duration_us >= 1_000_000);
        prop_assert!(plan.duration_us <= MAX_SLEEP_SECS * 1_000_000);
    }
}

// ── Boot counter monotonicity ─────────────────────────────────

proptest! {
    /// The boot counter strictly increases across wakes, regardless of
    /// unrelated storage traffic in between.
    #[test]
    fn boot_counter_strictly_increases(
        wakes in 1usize..=50,
        noise_keys in proptest::collection::vec("[a-z]{1,8}", 0..=5),
    ) {
        let mut nvs = NvsAdapter::new().unwrap();
        let mut last = 0u32;
        for _ in 0..wakes {
            for key in &noise_keys {
                nvs.write("other_ns", key, b"noise").unwrap();
            }
            let count = BootCounter::increment_and_persist(&mut nvs);
            prop_assert!(count > last);
            last = count;
        }
        prop_assert_eq!(last, wakes as u32);
    }
}

// ── Config persistence round-trip ─────────────────────────────

fn arb_valid_config() -> impl Strategy<Value = SystemConfig> {
    (
        (1.0f32..=49.0, 51.0f32..=100.0), // dry < wet with a gap
        1u16..=600,
        (0.1f32..=10.0, 0.0f32..=100.0),
        (10u32..=86_400, 1u32..=100, 5u32..=3600),
        (100u32..=5000, 1u32..=3600),
        any::<bool>(),
    )
        .prop_map(
            |(
                (dry, wet),
                pump_on_secs,
                (moist_adj, alarm_level),
                (alarm_interval, factor, window),
                (loop_ms, telem_secs),
                use_celsius,
            )| SystemConfig {
                dry_soil_pct: dry,
                wet_soil_pct: wet,
                pump_on_secs,
                moist_adj_factor: moist_adj,
                moist_alarm_level_pct: alarm_level,
                moist_alarm_interval_secs: alarm_interval,
                deep_sleep_interval_factor: factor,
                time_to_deep_sleep_secs: window,
                control_loop_interval_ms: loop_ms,
                telemetry_interval_secs: telem_secs,
                use_celsius,
                ..Default::default()
            },
        )
}

proptest! {
    /// Any config that passes validation survives the postcard encode /
    /// NVS store / decode cycle bit-exact.
    #[test]
    fn valid_config_roundtrips_through_nvs(cfg in arb_valid_config()) {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.save(&cfg).unwrap();
        let loaded = nvs.load().unwrap();
        prop_assert_eq!(loaded, cfg);
    }
}

// ── RSSI mapping ──────────────────────────────────────────────

proptest! {
    #[test]
    fn rssi_percent_is_bounded_and_monotone(a in i8::MIN..=i8::MAX, b in i8::MIN..=i8::MAX) {
        let pa = rssi_to_percent(a);
        let pb = rssi_to_percent(b);
        prop_assert!(pa <= 100);
        prop_assert!(pb <= 100);
        if a <= b {
            prop_assert!(pa <= pb, "stronger signal must never map lower");
        }
    }
}

// ── Inbound channel-write fuzz ────────────────────────────────

proptest! {
    /// Arbitrary channel writes — any channel number, any value — must
    /// never panic and must only ever yield well-formed commands.
    #[test]
    fn arbitrary_channel_writes_never_panic(
        writes in proptest::collection::vec(
            (0u8..=255, prop_oneof![
                (-1000i64..=1000).prop_map(CloudValue::Int),
                (-1000.0f32..=1000.0).prop_map(CloudValue::Float),
                "[ -~]{0,32}".prop_map(|s| CloudValue::str_from(&s)),
            ]),
            0..=16,
        ),
    ) {
        let mut cloud = SimCloud::new();
        for (channel, value) in writes {
            cloud.inbound.push_back(ChannelWrite { channel, value });
        }
        let mut reporter = TelemetryReporter::new(cloud);
        reporter.ingest_pending();

        let cfg = SystemConfig::default();
        while reporter.next_command(&cfg).is_some() {}
    }
}
