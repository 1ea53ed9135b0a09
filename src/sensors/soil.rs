//! Resistive soil-moisture sensor on ADC1.
//!
//! The sensor voltage rises as the soil dries (higher resistance), so the
//! raw ADC count is inverted into a wetness percentage, scaled by the
//! user-tunable calibration factor and clamped to [0, 100] %.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the oneshot ADC via hw_init.
//! On host/test: reads from a static atomic for injection.

use crate::drivers::hw_init;
use crate::error::SensorError;

/// Full-scale ADC count (12-bit).
const ADC_MAX: f32 = 4095.0;

#[derive(Debug, Clone, Copy)]
pub struct SoilReading {
    pub raw: u16,
    /// Calibrated wetness, clamped to [0, 100] %.
    pub moisture_pct: f32,
}

pub struct SoilMoistureSensor {
    adc_channel: u32,
}

impl SoilMoistureSensor {
    pub fn new(adc_channel: u32) -> Self {
        Self { adc_channel }
    }

    /// Read the sensor and convert to a calibrated percentage.
    ///
    /// `adj_factor` is the user calibration factor applied linearly to the
    /// raw wetness before clamping (sensor elements vary a lot between batches).
    pub fn read(&mut self, adj_factor: f32) -> Result<SoilReading, SensorError> {
        let raw = hw_init::adc1_read(self.adc_channel).ok_or(SensorError::AdcReadFailed)?;

        let wetness = 1.0 - (raw as f32 / ADC_MAX);
        let moisture_pct = (wetness * 100.0 * adj_factor).clamp(0.0, 100.0);

        Ok(SoilReading { raw, moisture_pct })
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::pins;

    fn sensor() -> SoilMoistureSensor {
        SoilMoistureSensor::new(pins::SOIL_MOIST_ADC_CHANNEL)
    }

    #[test]
    fn dry_soil_reads_low_percent() {
        let _guard = hw_init::sim_lock();
        hw_init::sim_set_soil_adc(4095);
        let r = sensor().read(1.0).unwrap();
        assert!(r.moisture_pct < 1.0);
    }

    #[test]
    fn submerged_soil_reads_high_percent() {
        let _guard = hw_init::sim_lock();
        hw_init::sim_set_soil_adc(0);
        let r = sensor().read(1.0).unwrap();
        assert!((r.moisture_pct - 100.0).abs() < 0.01);
    }

    #[test]
    fn midpoint_scales_linearly() {
        let _guard = hw_init::sim_lock();
        hw_init::sim_set_soil_adc(2048);
        let r = sensor().read(1.0).unwrap();
        assert!((r.moisture_pct - 50.0).abs() < 1.0);
    }

    #[test]
    fn adj_factor_scales_and_clamps() {
        let _guard = hw_init::sim_lock();
        hw_init::sim_set_soil_adc(2048);
        let r = sensor().read(1.5).unwrap();
        assert!((r.moisture_pct - 75.0).abs() < 1.5);

        // Over-scaled readings clamp at 100 %.
        hw_init::sim_set_soil_adc(0);
        let r = sensor().read(2.0).unwrap();
        assert!((r.moisture_pct - 100.0).abs() < 0.01);
    }
}
