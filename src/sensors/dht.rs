//! DHT22 temperature / relative-humidity sensor.
//!
//! Single-wire protocol, read through the `hw_init` shim. Readings are
//! validated against the physical range of the part before use: humidity
//! must lie in [0, 100] % and temperature in [-40, 80] °C. Anything else
//! fails the sample so the control loop retains its previous reading.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-banged single-wire read via `hw_init::dht_read`.
//! On host/test: reads from injected atomics (tenths of a unit).

use crate::drivers::hw_init;
use crate::error::SensorError;

/// Physical limits of the DHT22.
const HUMIDITY_MIN: f32 = 0.0;
const HUMIDITY_MAX: f32 = 100.0;
const TEMP_MIN_C: f32 = -40.0;
const TEMP_MAX_C: f32 = 80.0;

#[derive(Debug, Clone, Copy)]
pub struct DhtReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

pub struct DhtSensor {
    gpio: i32,
}

impl DhtSensor {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }

    /// Read and validate one temperature/humidity sample.
    pub fn read(&mut self) -> Result<DhtReading, SensorError> {
        let (temp_x10, humid_x10) = hw_init::dht_read(self.gpio).ok_or(SensorError::NoData)?;

        let temperature_c = temp_x10 as f32 / 10.0;
        let humidity_pct = humid_x10 as f32 / 10.0;

        if !(HUMIDITY_MIN..=HUMIDITY_MAX).contains(&humidity_pct)
            || !(TEMP_MIN_C..=TEMP_MAX_C).contains(&temperature_c)
        {
            return Err(SensorError::OutOfRange);
        }

        Ok(DhtReading {
            temperature_c,
            humidity_pct,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit conversion and heat index
// ---------------------------------------------------------------------------

/// Celsius → Fahrenheit.
pub fn c_to_f(c: f32) -> f32 {
    c * 1.8 + 32.0
}

/// Fahrenheit → Celsius.
pub fn f_to_c(f: f32) -> f32 {
    (f - 32.0) / 1.8
}

/// Heat index from temperature (°C) and relative humidity (%).
///
/// Uses the simple Steadman approximation, switching to the full Rothfusz
/// regression (with low-humidity and high-humidity adjustments) when the
/// simple result exceeds 80 °F — the same scheme the common DHT libraries
/// implement. Returns °C; the caller converts for display if needed.
pub fn heat_index_c(temperature_c: f32, humidity_pct: f32) -> f32 {
    let t = c_to_f(temperature_c);
    let rh = humidity_pct;

    let mut hi = 0.5 * (t + 61.0 + ((t - 68.0) * 1.2) + (rh * 0.094));

    if hi > 80.0 {
        hi = -42.379 + 2.049_015_23 * t + 10.143_331_27 * rh
            - 0.224_755_41 * t * rh
            - 0.006_837_83 * t * t
            - 0.054_817_17 * rh * rh
            + 0.001_228_74 * t * t * rh
            + 0.000_852_82 * t * rh * rh
            - 0.000_001_99 * t * t * rh * rh;

        if rh < 13.0 && (80.0..=112.0).contains(&t) {
            hi -= ((13.0 - rh) * 0.25) * ((17.0 - (t - 95.0).abs()) * (1.0 / 17.0)).sqrt();
        } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
            hi += ((rh - 85.0) * 0.1) * ((87.0 - t) * 0.2);
        }
    }

    f_to_c(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversion_roundtrip() {
        for c in [-40.0_f32, 0.0, 25.0, 80.0] {
            assert!((f_to_c(c_to_f(c)) - c).abs() < 0.001);
        }
        assert!((c_to_f(0.0) - 32.0).abs() < 0.001);
        assert!((c_to_f(100.0) - 212.0).abs() < 0.001);
    }

    #[test]
    fn heat_index_near_temp_in_mild_conditions() {
        // At 20 °C the heat index tracks the dry-bulb temperature closely.
        let hi = heat_index_c(20.0, 50.0);
        assert!((hi - 20.0).abs() < 2.5, "hi={hi}");
    }

    #[test]
    fn heat_index_exceeds_temp_when_hot_and_humid() {
        // 34 °C at 80 % RH feels far hotter than the dry-bulb reading.
        let hi = heat_index_c(34.0, 80.0);
        assert!(hi > 40.0, "hi={hi}");
    }

    #[test]
    fn heat_index_below_temp_when_hot_and_dry() {
        let hi = heat_index_c(34.0, 10.0);
        assert!(hi < 34.0, "hi={hi}");
    }

    #[cfg(not(target_os = "espidf"))]
    #[test]
    fn rejects_out_of_range_humidity() {
        let _guard = crate::drivers::hw_init::sim_lock();
        crate::drivers::hw_init::sim_set_dht(250, 1500); // 25.0 °C, 150.0 %
        let mut dht = DhtSensor::new(crate::pins::DHT_DATA_GPIO);
        assert_eq!(dht.read().unwrap_err(), SensorError::OutOfRange);
    }

    #[cfg(not(target_os = "espidf"))]
    #[test]
    fn accepts_plausible_reading() {
        let _guard = crate::drivers::hw_init::sim_lock();
        crate::drivers::hw_init::sim_set_dht(253, 618); // 25.3 °C, 61.8 %
        let mut dht = DhtSensor::new(crate::pins::DHT_DATA_GPIO);
        let r = dht.read().unwrap();
        assert!((r.temperature_c - 25.3).abs() < 0.01);
        assert!((r.humidity_pct - 61.8).abs() < 0.01);
    }
}
