//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, publish to the
//! dashboard, etc.

use crate::fsm::context::PumpMode;
use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// One or more relay faults were latched.
    FaultDetected(u8),

    /// Soil moisture dropped below the alarm level (rate limited).
    MoistureAlarm { moisture_pct: f32 },

    /// The application service has started (carries initial state).
    Started(StateId),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
///
/// Temperature and heat index are already in the configured display unit;
/// the cloud reporter adds link-level fields (RSSI, IP) on publish.
#[derive(Debug, Clone)]
pub struct TelemetryData {
    pub state: StateId,
    pub temperature: f32,
    pub humidity_pct: f32,
    pub soil_moisture_pct: f32,
    pub heat_index: f32,
    pub reading_fresh: bool,
    pub pump_on: bool,
    pub pump_mode: PumpMode,
    pub fault_flags: u8,
}
