//! Dashboard virtual-pin channel map.
//!
//! Channel IDs are part of the dashboard contract — widgets on the
//! mobile app are bound to these numbers, so they must never be
//! renumbered without updating the dashboard project.

use crate::fsm::StateId;

/// Dashboard channel identifier (virtual pin number).
pub type Channel = u8;

// ── Pump controls and indicators ──────────────────────────────

/// Pump-running indicator LED (also accepts a "pump on" button write).
pub const CH_PUMP_ON: Channel = 0;
/// Pump-stopped indicator LED (also accepts a "pump off" button write).
pub const CH_PUMP_OFF: Channel = 1;
/// Momentary pump toggle button.
pub const CH_PUMP_BUTTON: Channel = 2;

// ── Sensor read-outs ──────────────────────────────────────────

pub const CH_AIR_TEMP: Channel = 3;
pub const CH_HUMIDITY: Channel = 4;
pub const CH_SOIL_MOISTURE: Channel = 5;
pub const CH_HEAT_INDEX: Channel = 12;

// ── Device / link status ──────────────────────────────────────

pub const CH_IP_ADDR: Channel = 8;
/// Signal strength as 0–100 %.
pub const CH_RSSI: Channel = 9;
pub const CH_FW_VERSION: Channel = 10;
pub const CH_BOOT_COUNT: Channel = 38;

// ── Configuration writes (dashboard → device) ─────────────────
//
// V20–V37 are inherited widget bindings; V28/V34 (sensor model
// selectors) and V29 (DHT trim) have no counterpart here and are
// ignored on ingest. New controls live above V40.

pub const CH_CFG_MIN_AIR_TEMP: Channel = 20;
pub const CH_CFG_MAX_AIR_TEMP: Channel = 21;
pub const CH_CFG_MIN_HUMIDITY: Channel = 22;
pub const CH_CFG_MAX_HUMIDITY: Channel = 23;
pub const CH_CFG_DRY_SOIL: Channel = 24;
pub const CH_CFG_WET_SOIL: Channel = 25;
pub const CH_CFG_PUMP_ON_SECS: Channel = 26;
pub const CH_CFG_USE_CELSIUS: Channel = 27;
/// Watering mode selector: 0 = auto, 1 = forced on, 2 = forced off.
pub const CH_PUMP_MODE: Channel = 30;
pub const CH_CFG_ALARM_INTERVAL: Channel = 31;
pub const CH_CFG_ALARM_LEVEL: Channel = 32;
pub const CH_CFG_MOIST_ADJ: Channel = 33;
pub const CH_CFG_SLEEP_FACTOR: Channel = 35;
pub const CH_CFG_TIME_TO_SLEEP: Channel = 36;
pub const CH_CFG_FORCE_SLEEP: Channel = 37;

/// Restore factory defaults.
pub const CH_FACTORY_RESET: Channel = 40;

pub const CH_CFG_LOOP_INTERVAL_MS: Channel = 41;
pub const CH_CFG_TELEM_INTERVAL: Channel = 42;
pub const CH_CFG_SAVE: Channel = 43;

/// Whether a channel carries a config-field write.
pub fn is_config_channel(ch: Channel) -> bool {
    matches!(
        ch,
        CH_CFG_MIN_AIR_TEMP..=CH_CFG_FORCE_SLEEP | CH_CFG_LOOP_INTERVAL_MS | CH_CFG_TELEM_INTERVAL
    )
}

// ── Widget colours ────────────────────────────────────────────

pub const COLOUR_GREEN: &str = "#23C48E";
pub const COLOUR_BLUE: &str = "#04C0F8";
pub const COLOUR_YELLOW: &str = "#ED9D00";
pub const COLOUR_RED: &str = "#D3435C";

/// Colour shown on the pump indicator for a given controller state.
pub fn state_colour(state: StateId) -> &'static str {
    match state {
        StateId::Idle => COLOUR_BLUE,
        StateId::Running => COLOUR_GREEN,
        StateId::Faulted => COLOUR_RED,
    }
}
