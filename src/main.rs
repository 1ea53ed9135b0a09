//! SmartFarm Firmware — Main Entry Point
//!
//! Hexagonal architecture with an event-driven wake cycle:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink    NvsAdapter    Esp32Time     │
//! │  (Sensor+Actuator) (EventSink)     (Config+NVS)  (clock/delay) │
//! │  WifiAdapter       TelemetryReporter<LogCloud>                 │
//! │  (link + RSSI)     (EventSink + command inbox)                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · Safety · Moisture alarm                         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  DeepSleepScheduler · BootCounter (persisted wake count)       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The firmware wakes, increments the boot counter, waters if the soil
//! is dry, syncs the dashboard, and goes back to deep sleep. Deep sleep
//! restarts the whole process, so the loop below only ever runs for the
//! configured wake window.
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use smartfarm::adapters::hardware::HardwareAdapter;
use smartfarm::adapters::log_sink::LogEventSink;
use smartfarm::adapters::net::WifiAdapter;
use smartfarm::adapters::nvs::NvsAdapter;
use smartfarm::adapters::time::Esp32TimeAdapter;
use smartfarm::app::events::AppEvent;
use smartfarm::app::ports::{ActuatorPort, ConfigPort, EventSink};
use smartfarm::app::service::AppService;
use smartfarm::cloud::reporter::TelemetryReporter;
use smartfarm::cloud::{CloudPort, LogCloud};
use smartfarm::config::SystemConfig;
use smartfarm::drivers::relay::RelayDriver;
use smartfarm::drivers::status_led::StatusLed;
use smartfarm::drivers::{hw_init, watchdog::Watchdog};
use smartfarm::events::{self, push_event, Event};
use smartfarm::fsm::StateId;
use smartfarm::pins;
use smartfarm::power::{BootCounter, DeepSleepScheduler, SleepPlatform};
use smartfarm::sensors::{dht::DhtSensor, soil::SoilMoistureSensor, SensorHub};

/// WiFi credentials baked in at build time, like the rest of the board
/// configuration. Absent values leave the device in offline mode (the
/// pump logic runs regardless).
const WIFI_SSID: Option<&str> = option_env!("SMARTFARM_WIFI_SSID");
const WIFI_PASS: Option<&str> = option_env!("SMARTFARM_WIFI_PASS");

// ── Fan-out event sink ────────────────────────────────────────
//
// The app core emits each event once; this sink copies it to the
// serial log and to the dashboard reporter.

struct Sinks<C: CloudPort> {
    log: LogEventSink,
    reporter: TelemetryReporter<C>,
}

impl<C: CloudPort> EventSink for Sinks<C> {
    fn emit(&mut self, event: &AppEvent) {
        self.log.emit(event);
        self.reporter.emit(event);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Platform bootstrap ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }
    #[cfg(not(target_os = "espidf"))]
    env_logger_init();

    info!("SmartFarm v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = Watchdog::new();

    // ── 3. NVS + boot counter ─────────────────────────────────
    // The boot counter is incremented and persisted before anything
    // else has a side effect, so a crash later in the cycle can never
    // lose a wake count.
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!(
                "NVS init failed ({}), running with defaults and no persistence",
                e
            );
            return Err(anyhow::anyhow!("NVS unavailable: {}", e));
        }
    };
    let boot_count = BootCounter::increment_and_persist(&mut nvs);

    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 4. Network link ───────────────────────────────────────
    let mut wifi = WifiAdapter::new();
    match (WIFI_SSID, WIFI_PASS) {
        (Some(ssid), pass) => {
            if let Err(e) = wifi.set_credentials(ssid, pass.unwrap_or("")) {
                warn!("WiFi credentials rejected: {}", e);
            } else if let Err(e) = wifi.connect() {
                warn!("WiFi connect failed ({}), continuing offline", e);
            }
        }
        _ => info!("No WiFi credentials baked in; offline mode"),
    }

    // ── 5. Adapters ───────────────────────────────────────────
    let sensor_hub = SensorHub::new(
        DhtSensor::new(pins::DHT_DATA_GPIO),
        SoilMoistureSensor::new(pins::SOIL_MOIST_ADC_CHANNEL),
    );
    let mut hw = HardwareAdapter::new(sensor_hub, RelayDriver::new(), StatusLed::new());

    let mut reporter = TelemetryReporter::new(LogCloud);
    reporter.set_boot_count(boot_count);
    reporter.set_link(wifi.link_info());
    let mut sinks = Sinks {
        log: LogEventSink::new(),
        reporter,
    };

    let time = Esp32TimeAdapter::new();
    let sleep_scheduler = DeepSleepScheduler::new();

    #[cfg(target_os = "espidf")]
    let mut sleeper = smartfarm::power::EspDeepSleep;
    #[cfg(not(target_os = "espidf"))]
    let mut sleeper = smartfarm::power::SimSleep::new();

    // ── 6. App service ────────────────────────────────────────
    let mut app = AppService::new(config.clone());
    app.start(&mut sinks);

    info!(
        "System ready (wake #{}, window {}s). Entering control loop.",
        boot_count, config.time_to_deep_sleep_secs
    );

    // ── 7. Control loop ───────────────────────────────────────
    let telemetry_ticks =
        ((config.telemetry_interval_secs as u64 * 1000) / config.control_loop_interval_ms as u64)
            .max(1);
    let mut telemetry_counter: u64 = 0;

    loop {
        time.delay_ms(config.control_loop_interval_ms);
        push_event(Event::ControlTick);

        telemetry_counter += 1;
        if telemetry_counter >= telemetry_ticks {
            push_event(Event::TelemetryTick);
            telemetry_counter = 0;
        }

        // Maintain the link and pull inbound dashboard writes.
        wifi.poll();
        sinks.reporter.set_link(wifi.link_info());
        sinks.reporter.ingest_pending();
        if sinks.reporter.has_pending() {
            push_event(Event::CommandReceived);
        }

        events::drain_events(|event| match event {
            Event::ControlTick => {
                app.tick(&mut hw, &mut sinks);
            }
            Event::TelemetryTick => {
                let t = app.build_telemetry();
                sinks.emit(&AppEvent::Telemetry(t));
            }
            Event::CommandReceived => {
                while let Some(cmd) = sinks.reporter.next_command(&app.current_config()) {
                    app.handle_command(cmd, &mut hw, &mut sinks);
                }
            }
        });

        // Config auto-save (5s debounce after last change).
        app.auto_save_if_needed(&mut nvs);

        // Feed watchdog on every iteration.
        watchdog.feed();

        // Sleep decision — last thing in the iteration so a full tick
        // (including safety evaluation) always precedes it.
        let mut sleep_cfg = app.current_config();
        if app.sleep_requested() {
            sleep_cfg.force_deep_sleep = true;
        }
        if let Some(plan) = sleep_scheduler.decide(app.uptime_secs(), &sleep_cfg) {
            if app.state() == StateId::Running {
                info!("sleep deferred: watering burst in progress");
                continue;
            }
            app.force_save_if_dirty(&mut nvs);
            hw.all_off();
            info!(
                "wake #{} done after {}s ({} ticks); sleeping for {}s",
                boot_count,
                time.uptime_secs(),
                app.tick_count(),
                plan.duration_us / 1_000_000
            );
            sleeper.deep_sleep(plan.duration_us);

            // On hardware deep_sleep() never returns; the simulation
            // records the request and we end the process instead.
            #[cfg(not(target_os = "espidf"))]
            return Ok(());
        }
    }
}

/// Minimal host logger so simulation runs produce output.
#[cfg(not(target_os = "espidf"))]
fn env_logger_init() {
    struct StderrLogger;
    impl log::Log for StderrLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }
        fn log(&self, record: &log::Record) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
        fn flush(&self) {}
    }
    static LOGGER: StderrLogger = StderrLogger;
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Info));
}
