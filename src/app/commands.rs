//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (dashboard
//! channels, the physical button) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

use crate::config::SystemConfig;
use crate::fsm::context::PumpMode;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Dashboard "pump on" button: force the pump on (run-budget still applies).
    PumpOn,

    /// Dashboard "pump off" button: force the pump off.
    PumpOff,

    /// Physical button press: toggle between forced-on and forced-off.
    PumpToggle,

    /// Select the watering mode directly.
    SetPumpMode(PumpMode),

    /// Hot-reload configuration (e.g. from dashboard channel writes).
    UpdateConfig(SystemConfig),

    /// Explicitly persist the current config to NVS immediately.
    SaveConfig,

    /// Request immediate deep sleep at the end of this loop iteration.
    ForceDeepSleep,

    /// Restore factory defaults and persist them.
    FactoryReset,
}
