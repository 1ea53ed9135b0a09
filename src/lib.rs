//! SmartFarm irrigation controller firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod cloud;
pub mod config;
pub mod events;
pub mod fsm;
pub mod power;
pub mod safety;

pub mod error;
pub mod pins;

// Hardware-facing modules; the actual peripheral access inside is
// guarded by cfg attributes, host builds get simulation backends.
pub mod adapters;
pub mod drivers;
pub mod sensors;
