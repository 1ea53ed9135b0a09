//! Hardware drivers — dumb actuators and the raw peripheral shims.
//!
//! Policy lives in the FSM and safety supervisor; drivers only translate
//! commands into register writes (or in-memory state on host targets).

pub mod hw_init;
pub mod relay;
pub mod status_led;
pub mod watchdog;
