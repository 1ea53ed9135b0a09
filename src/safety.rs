//! Relay safety supervisor.
//!
//! The supervisor runs **every tick before the FSM** and accumulates a
//! fault bitmask in `FsmContext.fault_flags`. The FSM state handlers check
//! this mask to decide whether to transition to `Faulted`.
//!
//! ## Fault lifecycle
//!
//! 1. The relay is commanded on past the configured run budget
//!    (plus a short grace margin for transition latency).
//! 2. The supervisor sets the `RelayFault::Overrun` bit.
//! 3. The FSM transitions to `Faulted`; `faulted_enter` kills the relay.
//! 4. The fault is latched for the remainder of the wake cycle — a stuck
//!    or over-driven relay is never retried until the next reboot.
//!
//! Latching (rather than the clear-on-recovery pattern used for
//! environmental conditions) is deliberate: an overrun means either the
//! FSM failed to stop the burst or the relay driver is not responding,
//! and both are only safely resolved by a power cycle.

use crate::config::SystemConfig;
use crate::error::RelayFault;
use log::error;

/// Extra seconds of commanded-on time tolerated beyond `pump_on_secs`
/// before the overrun guard trips. Covers one-tick transition latency.
const OVERRUN_GRACE_SECS: f32 = 2.0;

/// Relay run-time supervisor.
pub struct SafetySupervisor {
    /// Latched fault bitmask.
    faults: u8,
    /// Whether the relay is currently commanded on (set by main loop).
    relay_commanded: bool,
    /// Consecutive ticks the relay has been commanded on.
    relay_on_ticks: u32,
    /// Seconds per control tick.
    tick_secs: f32,
    /// Commanded-on seconds at which the overrun guard trips.
    overrun_limit_secs: f32,
}

impl SafetySupervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            faults: 0,
            relay_commanded: false,
            relay_on_ticks: 0,
            tick_secs: config.control_loop_interval_ms as f32 / 1000.0,
            overrun_limit_secs: config.pump_on_secs as f32 + OVERRUN_GRACE_SECS,
        }
    }

    /// Inform the supervisor whether the relay is currently commanded on.
    pub fn set_relay_commanded(&mut self, on: bool) {
        if !on {
            self.relay_on_ticks = 0;
        }
        self.relay_commanded = on;
    }

    /// Evaluate the run-time guard. Returns the updated fault bitmask.
    pub fn evaluate(&mut self) -> u8 {
        if self.relay_commanded {
            self.relay_on_ticks = self.relay_on_ticks.saturating_add(1);
            let on_secs = self.relay_on_ticks as f32 * self.tick_secs;
            if on_secs > self.overrun_limit_secs && self.faults & RelayFault::Overrun.mask() == 0 {
                error!(
                    "SAFETY FAULT: relay on {:.0}s > limit {:.0}s",
                    on_secs, self.overrun_limit_secs
                );
                self.faults |= RelayFault::Overrun.mask();
            }
        }
        self.faults
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }
}
