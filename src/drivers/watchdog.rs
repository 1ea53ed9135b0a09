//! Task Watchdog Timer (TWDT) driver.
//!
//! Subscribes the main task to the TWDT so a stalled control loop ends in
//! a reset instead of a stuck relay. A reset is safe for this firmware:
//! the boot counter and config live in NVS, and the relay is released by
//! the GPIO defaults until `hw_init` reconfigures it.
//!
//! The main loop must call [`Watchdog::feed`] every iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// TWDT timeout. Must exceed the slowest permitted control-loop interval
/// (5 s, the `control_loop_interval_ms` validation ceiling) plus one
/// worst-case NVS commit.
pub const WATCHDOG_TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl Watchdog {
    /// Reconfigure the TWDT and subscribe the current task.
    pub fn new() -> Self {
        // SAFETY: called once from main before the control loop; the TWDT
        // API is safe to reconfigure from the subscribing task.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: WATCHDOG_TIMEOUT_MS,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                log::warn!(
                    "TWDT reconfigure returned {} (may already be configured)",
                    ret
                );
            }

            let ret = esp_task_wdt_add(core::ptr::null_mut());
            let subscribed = ret == ESP_OK;
            if subscribed {
                log::info!(
                    "Watchdog: control loop subscribed ({} ms, panic on trigger)",
                    WATCHDOG_TIMEOUT_MS
                );
            } else {
                log::warn!("Watchdog: failed to subscribe ({})", ret);
            }

            Self { subscribed }
        }
    }

    /// Feed the watchdog. Must be called at least every [`WATCHDOG_TIMEOUT_MS`].
    pub fn feed(&self) {
        if self.subscribed {
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Watchdog {
    pub fn new() -> Self {
        log::info!("Watchdog(sim): no-op");
        Self {}
    }

    pub fn feed(&self) {}
}
