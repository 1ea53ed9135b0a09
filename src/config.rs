//! System configuration parameters.
//!
//! All tunable parameters for the irrigation controller. Values can be
//! overridden from the dashboard (virtual-pin writes) and are persisted to
//! NVS so they survive deep-sleep power cycles.

use serde::{Deserialize, Serialize};

/// Firmware version published on the dashboard version channel.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Air thresholds ---
    /// Minimum acceptable air temperature (°C).
    pub min_air_temp_c: f32,
    /// Maximum acceptable air temperature (°C).
    pub max_air_temp_c: f32,
    /// Minimum acceptable relative humidity (%).
    pub min_humidity_pct: f32,
    /// Maximum acceptable relative humidity (%).
    pub max_humidity_pct: f32,

    // --- Soil thresholds ---
    /// Soil moisture (%) at or below which the soil counts as dry.
    pub dry_soil_pct: f32,
    /// Soil moisture (%) at or above which the soil counts as wet.
    pub wet_soil_pct: f32,

    // --- Pump ---
    /// Seconds the pump runs per watering burst (10–50).
    pub pump_on_secs: u16,

    // --- Units & calibration ---
    /// Report temperatures in Celsius (`false` = Fahrenheit).
    pub use_celsius: bool,
    /// Linear scale applied to the raw soil-moisture ADC voltage.
    pub moist_adj_factor: f32,

    // --- Moisture alarm ---
    /// Minimum seconds between repeated low-moisture alarms.
    pub moist_alarm_interval_secs: u32,
    /// Soil moisture (%) below which the low-moisture alarm fires.
    pub moist_alarm_level_pct: f32,

    // --- Deep sleep ---
    /// Multiplier on `time_to_deep_sleep_secs` for the sleep duration.
    pub deep_sleep_interval_factor: u32,
    /// Seconds of active wake time before the device re-enters deep sleep.
    pub time_to_deep_sleep_secs: u32,
    /// Remote flag: sleep immediately on the next scheduler decision.
    pub force_deep_sleep: bool,

    // --- Timing ---
    /// Control loop interval (milliseconds).
    pub control_loop_interval_ms: u32,
    /// Telemetry report interval (seconds).
    pub telemetry_interval_secs: u32,
}

impl SystemConfig {
    /// Range-check every field. Called before a remote write reaches the
    /// live config and again before persistence; a value that fails here
    /// is rejected outright, never clamped.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(1.0..=99.0).contains(&self.dry_soil_pct) {
            return Err("dry_soil_pct must be 1.0–99.0");
        }
        if !(2.0..=100.0).contains(&self.wet_soil_pct) {
            return Err("wet_soil_pct must be 2.0–100.0");
        }
        if self.dry_soil_pct >= self.wet_soil_pct {
            return Err("dry_soil_pct must be < wet_soil_pct");
        }
        if !(1..=600).contains(&self.pump_on_secs) {
            return Err("pump_on_secs must be 1–600");
        }
        if !(0.1..=10.0).contains(&self.moist_adj_factor) {
            return Err("moist_adj_factor must be 0.1–10.0");
        }
        if !(0.0..=100.0).contains(&self.moist_alarm_level_pct) {
            return Err("moist_alarm_level_pct must be 0.0–100.0");
        }
        if !(10..=86_400).contains(&self.moist_alarm_interval_secs) {
            return Err("moist_alarm_interval_secs must be 10–86400");
        }
        if !(1..=100).contains(&self.deep_sleep_interval_factor) {
            return Err("deep_sleep_interval_factor must be 1–100");
        }
        if !(5..=3600).contains(&self.time_to_deep_sleep_secs) {
            return Err("time_to_deep_sleep_secs must be 5–3600");
        }
        if !(100..=5000).contains(&self.control_loop_interval_ms) {
            return Err("control_loop_interval_ms must be 100–5000");
        }
        if !(1..=3600).contains(&self.telemetry_interval_secs) {
            return Err("telemetry_interval_secs must be 1–3600");
        }
        if self.min_air_temp_c >= self.max_air_temp_c {
            return Err("min_air_temp_c must be < max_air_temp_c");
        }
        if self.min_humidity_pct >= self.max_humidity_pct {
            return Err("min_humidity_pct must be < max_humidity_pct");
        }
        Ok(())
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Air
            min_air_temp_c: 5.0,
            max_air_temp_c: 40.0,
            min_humidity_pct: 20.0,
            max_humidity_pct: 95.0,

            // Soil
            dry_soil_pct: 30.0,
            wet_soil_pct: 70.0,

            // Pump
            pump_on_secs: 20,

            // Units & calibration
            use_celsius: true,
            moist_adj_factor: 1.0,

            // Moisture alarm
            moist_alarm_interval_secs: 600,
            moist_alarm_level_pct: 15.0,

            // Deep sleep
            deep_sleep_interval_factor: 2,
            time_to_deep_sleep_secs: 30,
            force_deep_sleep: false,

            // Timing
            control_loop_interval_ms: 1000, // 1 Hz
            telemetry_interval_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.dry_soil_pct < c.wet_soil_pct);
        assert!(c.min_air_temp_c < c.max_air_temp_c);
        assert!(c.min_humidity_pct < c.max_humidity_pct);
        assert!((10..=50).contains(&c.pump_on_secs));
        assert!(c.moist_adj_factor > 0.0);
        assert!(c.control_loop_interval_ms > 0);
        assert!(c.deep_sleep_interval_factor >= 1);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SystemConfig {
            dry_soil_pct: 25.5,
            pump_on_secs: 45,
            force_deep_sleep: true,
            ..Default::default()
        };
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn dry_below_wet_invariant() {
        let c = SystemConfig::default();
        assert!(
            c.dry_soil_pct < c.wet_soil_pct,
            "dry threshold must stay below wet to prevent pump oscillation"
        );
    }

    #[test]
    fn alarm_level_below_dry() {
        let c = SystemConfig::default();
        assert!(
            c.moist_alarm_level_pct < c.dry_soil_pct,
            "alarm should only fire when watering alone is not keeping up"
        );
    }
}
