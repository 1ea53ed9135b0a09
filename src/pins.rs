//! GPIO / peripheral pin assignments for the SmartFarm controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers. Change a pin here and it propagates everywhere.
//!
//! Assignments follow the ESP32 DevKit wiring: DHT data on GPIO22 (the I²C
//! SCL pin, repurposed), pump relay on GPIO23, soil-moisture sensor on the
//! ADC1-capable GPIO32, onboard blue LED on GPIO2.

// ---------------------------------------------------------------------------
// Pump relay
// ---------------------------------------------------------------------------

/// Digital output driving the pump relay coil.
pub const PUMP_RELAY_GPIO: i32 = 23;

/// Relay board polarity: `true` = coil energised on logic HIGH.
pub const RELAY_ACTIVE_HIGH: bool = true;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT22 single-wire data line.
pub const DHT_DATA_GPIO: i32 = 22;

/// Resistive soil-moisture sensor — analog voltage into ADC1.
/// GPIO32 = ADC1 channel 4 on the ESP32.
pub const SOIL_MOIST_ADC_GPIO: i32 = 32;
/// ADC1 channel index for the soil-moisture sensor.
pub const SOIL_MOIST_ADC_CHANNEL: u32 = 4;

// ---------------------------------------------------------------------------
// Status LED (onboard, single colour)
// ---------------------------------------------------------------------------

/// Onboard blue LED, used as a wake/pump activity indicator.
pub const STATUS_LED_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// WiFi signal classification (dBm)
// ---------------------------------------------------------------------------

/// Below this the link is considered weak.
pub const RSSI_WEAK_DBM: i8 = -81;
/// Below this (but above weak) the link is considered merely OK.
pub const RSSI_OK_DBM: i8 = -71;
/// Maps to 0 % signal on the dashboard gauge.
pub const RSSI_0_PERCENT_DBM: i8 = -105;
/// Maps to 100 % signal on the dashboard gauge.
pub const RSSI_100_PERCENT_DBM: i8 = -30;
