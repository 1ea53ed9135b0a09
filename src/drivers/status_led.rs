//! Onboard status LED driver.
//!
//! Single-colour LED on GPIO2: lit while the pump runs, blinking in the
//! faulted state (the blink cadence comes from the FSM handler).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the real GPIO via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

pub struct StatusLed {
    lit: bool,
}

impl StatusLed {
    pub fn new() -> Self {
        let mut led = Self { lit: true };
        led.set(false);
        led
    }

    pub fn set(&mut self, lit: bool) {
        hw_init::gpio_write(pins::STATUS_LED_GPIO, lit);
        self.lit = lit;
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
