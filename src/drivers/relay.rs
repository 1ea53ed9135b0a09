//! Pump relay driver.
//!
//! A single digital output energising the pump relay coil. Board polarity
//! is configured in `pins::RELAY_ACTIVE_HIGH`.
//!
//! ## Safety contract
//!
//! The relay must never stay energised past the configured run budget.
//! Enforced by the safety supervisor; this driver is a dumb actuator.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the real GPIO via the hw_init shim.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Open,
    Closed,
}

pub struct RelayDriver {
    state: RelayState,
}

impl RelayDriver {
    pub fn new() -> Self {
        let mut relay = Self {
            state: RelayState::Closed, // force the first set() through
        };
        relay.set(false);
        relay
    }

    /// Energise (`true`) or release (`false`) the relay coil.
    pub fn set(&mut self, on: bool) {
        let level = if pins::RELAY_ACTIVE_HIGH { on } else { !on };
        hw_init::gpio_write(pins::PUMP_RELAY_GPIO, level);
        self.state = if on { RelayState::Closed } else { RelayState::Open };
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == RelayState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_released() {
        let relay = RelayDriver::new();
        assert!(!relay.is_on());
    }

    #[test]
    fn set_toggles_state() {
        let mut relay = RelayDriver::new();
        relay.set(true);
        assert_eq!(relay.state(), RelayState::Closed);
        relay.set(false);
        assert_eq!(relay.state(), RelayState::Open);
    }
}
