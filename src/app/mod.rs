//! Application layer — hexagonal core and its boundary types.
//!
//! The domain logic ([`service::AppService`]) never touches hardware or
//! the network directly; everything flows through the port traits in
//! [`ports`], implemented by the adapters in [`crate::adapters`].

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

pub use commands::AppCommand;
pub use events::{AppEvent, TelemetryData};
pub use service::AppService;
