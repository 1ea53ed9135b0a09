//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and both actuator drivers, exposing them
//! through [`SensorPort`] and [`ActuatorPort`].  This is the only
//! module in the system that touches actual hardware.  On non-espidf
//! targets, the underlying drivers use cfg-gated simulation stubs.

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::config::SystemConfig;
use crate::drivers::relay::RelayDriver;
use crate::drivers::status_led::StatusLed;
use crate::error::SensorError;
use crate::fsm::context::SensorReading;
use crate::sensors::SensorHub;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    sensor_hub: SensorHub,
    relay: RelayDriver,
    led: StatusLed,
}

impl HardwareAdapter {
    pub fn new(sensor_hub: SensorHub, relay: RelayDriver, led: StatusLed) -> Self {
        Self {
            sensor_hub,
            relay,
            led,
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_all(&mut self, config: &SystemConfig, tick: u64) -> Result<SensorReading, SensorError> {
        self.sensor_hub.sample(config, tick)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn set_relay(&mut self, on: bool) {
        self.relay.set(on);
    }

    fn set_led(&mut self, lit: bool) {
        self.led.set(lit);
    }

    fn is_relay_on(&self) -> bool {
        self.relay.is_on()
    }

    fn all_off(&mut self) {
        self.relay.set(false);
        self.led.off();
    }
}
