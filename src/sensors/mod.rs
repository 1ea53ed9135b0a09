//! Sensor subsystem — individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns every sensor driver and produces a [`SensorReading`] each
//! sample cycle that gets written into `FsmContext.reading`. A failed
//! sample returns the error to the caller, which retains the previous
//! reading for that cycle — one flaky read must never crash the loop or
//! flap the pump.

pub mod dht;
pub mod soil;

use crate::config::SystemConfig;
use crate::error::SensorError;
use crate::fsm::context::SensorReading;
use dht::DhtSensor;
use soil::SoilMoistureSensor;

/// Aggregates all sensor drivers and produces a unified reading.
pub struct SensorHub {
    dht: DhtSensor,
    soil: SoilMoistureSensor,
}

impl SensorHub {
    /// Construct a new hub. Pass in pre-built drivers (built in main
    /// where peripheral ownership is established).
    pub fn new(dht: DhtSensor, soil: SoilMoistureSensor) -> Self {
        Self { dht, soil }
    }

    /// Sample every sensor and build a validated [`SensorReading`].
    ///
    /// Fails if any underlying driver returns no-data or a physically
    /// implausible value; the caller treats that as "skip this cycle,
    /// keep the last known reading".
    pub fn sample(
        &mut self,
        config: &SystemConfig,
        tick: u64,
    ) -> Result<SensorReading, SensorError> {
        let air = self.dht.read()?;
        let soil = self.soil.read(config.moist_adj_factor)?;

        let hi_c = dht::heat_index_c(air.temperature_c, air.humidity_pct);
        let heat_index = if config.use_celsius {
            hi_c
        } else {
            dht::c_to_f(hi_c)
        };

        Ok(SensorReading {
            temperature_c: air.temperature_c,
            humidity_pct: air.humidity_pct,
            soil_moisture_pct: soil.moisture_pct,
            heat_index,
            timestamp_tick: tick,
            fresh: true,
        })
    }
}
