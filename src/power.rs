//! Deep-sleep scheduling and the persisted boot counter.
//!
//! Deep sleep halts the processor and clears volatile memory; it is the
//! firmware's last-resort recovery path (timeout → full process restart
//! with persisted state). The scheduler therefore must always eventually
//! fire: no error anywhere else in the loop is allowed to prevent it.
//!
//! ## Wake-cycle contract
//!
//! 1. `BootCounter::increment_and_persist` runs before any other side
//!    effect at wake — a crash mid-cycle never loses a count.
//! 2. `DeepSleepScheduler::decide` is consulted once per loop iteration;
//!    when it returns a [`SleepPlan`] the caller force-saves dirty config,
//!    releases the relay, and suspends via a [`SleepPlatform`].

use crate::app::ports::StoragePort;
use crate::config::SystemConfig;
use log::{info, warn};

/// Upper bound on one sleep interval. Keeps a bad remote config write
/// from making the device unreachable for days.
pub const MAX_SLEEP_SECS: u64 = 21_600; // 6 h

const US_PER_SEC: u64 = 1_000_000;

const BOOT_NAMESPACE: &str = "smartfarm";
const BOOT_KEY: &str = "bootcnt";

// ---------------------------------------------------------------------------
// Sleep plan
// ---------------------------------------------------------------------------

/// The scheduler's verdict for this wake cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepPlan {
    /// How long to sleep, in microseconds. Always > 0 and bounded by
    /// [`MAX_SLEEP_SECS`].
    pub duration_us: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Decides, once per wake cycle, whether and for how long to deep sleep.
pub struct DeepSleepScheduler;

impl DeepSleepScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Return a [`SleepPlan`] if the device should sleep now.
    ///
    /// - `force_deep_sleep` sleeps immediately;
    /// - otherwise the device stays awake for `time_to_deep_sleep_secs`
    ///   (telemetry sync, command reception) before sleeping.
    pub fn decide(&self, uptime_secs: u64, config: &SystemConfig) -> Option<SleepPlan> {
        if config.force_deep_sleep {
            info!("sleep: forced remotely");
            return Some(self.plan(config));
        }

        if uptime_secs >= config.time_to_deep_sleep_secs as u64 {
            info!("sleep: wake window of {}s elapsed", uptime_secs);
            return Some(self.plan(config));
        }

        None
    }

    fn plan(&self, config: &SystemConfig) -> SleepPlan {
        let secs = (config.deep_sleep_interval_factor as u64)
            .saturating_mul(config.time_to_deep_sleep_secs as u64);
        // A zero interval would spin the device through endless reboots;
        // a huge one makes it unreachable. Clamp both ends.
        let secs = secs.clamp(1, MAX_SLEEP_SECS);
        SleepPlan {
            duration_us: secs * US_PER_SEC,
        }
    }
}

impl Default for DeepSleepScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Boot counter
// ---------------------------------------------------------------------------

/// Monotonically increasing wake counter, persisted in NVS.
///
/// Read-only everywhere except here: the counter is incremented exactly
/// once per wake and written back before any other side effect runs.
pub struct BootCounter;

impl BootCounter {
    /// Read the persisted count, increment it, persist, and return the
    /// new value. Missing or short records count as zero (first boot).
    pub fn increment_and_persist(storage: &mut impl StoragePort) -> u32 {
        let mut buf = [0u8; 4];
        let previous = match storage.read(BOOT_NAMESPACE, BOOT_KEY, &mut buf) {
            Ok(4) => u32::from_le_bytes(buf),
            Ok(_) | Err(_) => 0,
        };

        let count = previous.saturating_add(1);
        if let Err(e) = storage.write(BOOT_NAMESPACE, BOOT_KEY, &count.to_le_bytes()) {
            // The count still increases monotonically within this wake;
            // the next boot re-reads the last successfully persisted value.
            warn!("boot counter persist failed: {}", e);
        }
        info!("wake #{}", count);
        count
    }

    /// Read the persisted count without modifying it.
    pub fn peek(storage: &impl StoragePort) -> u32 {
        let mut buf = [0u8; 4];
        match storage.read(BOOT_NAMESPACE, BOOT_KEY, &mut buf) {
            Ok(4) => u32::from_le_bytes(buf),
            Ok(_) | Err(_) => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Sleep platform
// ---------------------------------------------------------------------------

/// Platform seam for the actual suspend call, so the scheduler logic is
/// testable on the host.
pub trait SleepPlatform {
    /// Suspend the whole process. On real hardware this does not return.
    fn deep_sleep(&mut self, duration_us: u64);
}

/// ESP-IDF deep sleep. Does not return; execution resumes in `main()`
/// after the RTC timer fires.
#[cfg(target_os = "espidf")]
pub struct EspDeepSleep;

#[cfg(target_os = "espidf")]
impl SleepPlatform for EspDeepSleep {
    fn deep_sleep(&mut self, duration_us: u64) {
        info!("entering deep sleep for {} us", duration_us);
        unsafe {
            esp_idf_svc::sys::esp_deep_sleep(duration_us);
        }
    }
}

/// Host simulation: records the request instead of suspending.
#[cfg(not(target_os = "espidf"))]
pub struct SimSleep {
    pub last_duration_us: Option<u64>,
}

#[cfg(not(target_os = "espidf"))]
impl SimSleep {
    pub fn new() -> Self {
        Self {
            last_duration_us: None,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimSleep {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl SleepPlatform for SimSleep {
    fn deep_sleep(&mut self, duration_us: u64) {
        info!("sim sleep for {} us", duration_us);
        self.last_duration_us = Some(duration_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_sleep_uses_factor_times_window() {
        let cfg = SystemConfig {
            force_deep_sleep: true,
            deep_sleep_interval_factor: 2,
            time_to_deep_sleep_secs: 30,
            ..Default::default()
        };
        let plan = DeepSleepScheduler::new().decide(0, &cfg).unwrap();
        assert_eq!(plan.duration_us, 60_000_000);
    }

    #[test]
    fn stays_awake_during_wake_window() {
        let cfg = SystemConfig::default(); // 30 s window
        let sched = DeepSleepScheduler::new();
        assert_eq!(sched.decide(0, &cfg), None);
        assert_eq!(sched.decide(29, &cfg), None);
        assert!(sched.decide(30, &cfg).is_some());
    }

    #[test]
    fn duration_is_bounded_above() {
        let cfg = SystemConfig {
            force_deep_sleep: true,
            deep_sleep_interval_factor: u32::MAX,
            time_to_deep_sleep_secs: u32::MAX,
            ..Default::default()
        };
        let plan = DeepSleepScheduler::new().decide(0, &cfg).unwrap();
        assert_eq!(plan.duration_us, MAX_SLEEP_SECS * 1_000_000);
    }

    #[test]
    fn duration_is_never_zero() {
        let cfg = SystemConfig {
            force_deep_sleep: true,
            deep_sleep_interval_factor: 0,
            time_to_deep_sleep_secs: 30,
            ..Default::default()
        };
        let plan = DeepSleepScheduler::new().decide(0, &cfg).unwrap();
        assert!(plan.duration_us >= 1_000_000);
    }
}
