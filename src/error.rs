//! Error types for the SmartFarm firmware subsystems.
//!
//! All variants are `Copy` so they can be passed through the safety
//! supervisor and FSM without allocation.
//!
//! Severity tiers:
//! - sensor / comms errors are recoverable — skip the cycle, retry later;
//! - relay faults are safety-critical — the pump is forced OFF for the
//!   remainder of the wake cycle;
//! - config errors degrade to defaults.

use core::fmt;

// ---------------------------------------------------------------------------
// Sensor errors (recoverable — caller retains the last known reading)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The DHT driver returned no data (timeout / checksum failure).
    NoData,
    /// ADC read returned an error.
    AdcReadFailed,
    /// Reading is outside the physically plausible range
    /// (e.g. humidity not in [0,100] %).
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no data from sensor"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

// ---------------------------------------------------------------------------
// Relay faults (safety-critical)
// ---------------------------------------------------------------------------

/// Relay faults trigger an immediate transition to the FAULTED state and
/// force the pump OFF. They are accumulated in a bitfield by the safety
/// supervisor and are not auto-cleared until the next wake cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelayFault {
    /// The relay has been energised past the configured run budget.
    Overrun = 0b0000_0001,
}

impl RelayFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for RelayFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overrun => write!(f, "relay run-time overrun"),
        }
    }
}

// ---------------------------------------------------------------------------
// Communications errors (recoverable — retried next cycle)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// The cloud link is down; publish skipped this cycle.
    TransportUnavailable,
    /// A publish was attempted and rejected by the transport.
    PublishFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportUnavailable => write!(f, "transport unavailable"),
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}
