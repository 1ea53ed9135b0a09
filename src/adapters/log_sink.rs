//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! The cloud reporter implements the same trait for dashboard publishing.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | state={:?} | T={:.1}\u{00b0} H={:.1}% | soil={:.1}% | \
                     HI={:.1}\u{00b0} | pump={} mode={:?} | fresh={} | faults=0b{:08b}",
                    t.state,
                    t.temperature,
                    t.humidity_pct,
                    t.soil_moisture_pct,
                    t.heat_index,
                    if t.pump_on { "ON" } else { "off" },
                    t.pump_mode,
                    t.reading_fresh,
                    t.fault_flags,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::FaultDetected(flags) => {
                warn!("FAULT | latched, flags=0b{:08b}", flags);
            }
            AppEvent::MoistureAlarm { moisture_pct } => {
                warn!("ALARM | soil critically dry: {:.1}%", moisture_pct);
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
        }
    }
}
