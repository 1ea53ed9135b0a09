//! Driven adapters — concrete implementations of the port traits.
//!
//! Each adapter bridges one outside-world concern (peripherals, NVS,
//! WiFi link, logging) to the hexagonal core in [`crate::app`].

pub mod hardware;
pub mod log_sink;
pub mod net;
pub mod nvs;
pub mod time;
