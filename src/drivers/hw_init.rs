//! One-shot hardware peripheral initialization and raw I/O shims.
//!
//! Configures the ADC channel and GPIO directions using raw ESP-IDF sys
//! calls, and exposes the narrow read/write shims the drivers build on.
//! Called once from `main()` before the control loop starts.
//!
//! On non-espidf targets every shim is backed by static atomics so host
//! tests can inject sensor values and observe pin writes.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicI16, AtomicU16, Ordering};

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

// ── Init ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe {
        adc_oneshot_config_channel(ADC1_HANDLE, pins::SOIL_MOIST_ADC_CHANNEL, &chan_cfg)
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!(
        "hw_init: ADC1 configured (CH{}=soil moisture)",
        pins::SOIL_MOIST_ADC_CHANNEL
    );
    Ok(())
}

/// Read one raw sample from an ADC1 channel. `None` on driver error.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Option<u16> {
    let mut raw: i32 = 0;
    // SAFETY: ADC1_HANDLE is written once during init_adc() before this
    // function is called; single-threaded main-loop access guaranteed.
    let ret = unsafe { adc_oneshot_read(ADC1_HANDLE, channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return None;
    }
    Some(raw.max(0) as u16)
}

/// Serialise access to the shared simulation statics. Tests that inject
/// sensor values must hold this guard for their whole body, otherwise
/// the parallel test runner interleaves injections.
#[cfg(not(target_os = "espidf"))]
pub fn sim_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(not(target_os = "espidf"))]
static SIM_SOIL_ADC: AtomicU16 = AtomicU16::new(2048);
#[cfg(not(target_os = "espidf"))]
static SIM_SOIL_FAIL: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Option<u16> {
    if SIM_SOIL_FAIL.load(Ordering::Relaxed) {
        return None;
    }
    Some(SIM_SOIL_ADC.load(Ordering::Relaxed))
}

/// Inject a raw soil-moisture ADC count (host tests only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_soil_adc(raw: u16) {
    SIM_SOIL_FAIL.store(false, Ordering::Relaxed);
    SIM_SOIL_ADC.store(raw, Ordering::Relaxed);
}

/// Make the next ADC reads fail (host tests only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_soil_fail(fail: bool) {
    SIM_SOIL_FAIL.store(fail, Ordering::Relaxed);
}

// ── GPIO outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for pin in [pins::PUMP_RELAY_GPIO, pins::STATUS_LED_GPIO] {
        let ret = unsafe { gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_OUTPUT) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe {
            gpio_set_level(pin, 0);
        }
    }
    info!(
        "hw_init: GPIO outputs configured (relay={}, led={})",
        pins::PUMP_RELAY_GPIO,
        pins::STATUS_LED_GPIO
    );
    Ok(())
}

/// Set a GPIO output level.
#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: pin was configured as an output in init_gpio_outputs().
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── DHT single-wire read ──────────────────────────────────────

/// Read the DHT22: returns `(temperature_x10, humidity_x10)` in tenths,
/// or `None` on timeout / checksum failure.
#[cfg(target_os = "espidf")]
pub fn dht_read(gpio: i32) -> Option<(i16, i16)> {
    // Busy-wait for the line to reach `level`, bounded by `timeout_us`.
    // Returns the wait duration, or None on timeout.
    unsafe fn wait_level(gpio: i32, level: u32, timeout_us: u32) -> Option<u32> {
        let mut waited = 0;
        // SAFETY: gpio is configured as input by the caller.
        while unsafe { gpio_get_level(gpio) } as u32 != level {
            if waited >= timeout_us {
                return None;
            }
            unsafe { esp_rom_delay_us(1) };
            waited += 1;
        }
        Some(waited)
    }

    let mut data = [0u8; 5];

    // SAFETY: single-wire protocol on a pin owned by this driver;
    // called only from the single-threaded control loop.
    unsafe {
        // Host start signal: pull low ≥1 ms, release, then listen.
        gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_OUTPUT);
        gpio_set_level(gpio, 0);
        esp_rom_delay_us(1100);
        gpio_set_level(gpio, 1);
        esp_rom_delay_us(30);
        gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_INPUT);

        // Sensor response: ~80 µs low, ~80 µs high.
        wait_level(gpio, 0, 90)?;
        wait_level(gpio, 1, 90)?;
        wait_level(gpio, 0, 90)?;

        // 40 data bits: 50 µs low, then 26–28 µs high = 0, ~70 µs high = 1.
        for bit in 0..40 {
            wait_level(gpio, 1, 70)?;
            let high_us = wait_level(gpio, 0, 90)?;
            if high_us > 40 {
                data[bit / 8] |= 1 << (7 - (bit % 8));
            }
        }
    }

    let checksum = data[0]
        .wrapping_add(data[1])
        .wrapping_add(data[2])
        .wrapping_add(data[3]);
    if checksum != data[4] {
        return None;
    }

    let humidity_x10 = ((data[0] as i16) << 8) | data[1] as i16;
    let mut temp_x10 = (((data[2] & 0x7F) as i16) << 8) | data[3] as i16;
    if data[2] & 0x80 != 0 {
        temp_x10 = -temp_x10;
    }

    Some((temp_x10, humidity_x10))
}

#[cfg(not(target_os = "espidf"))]
static SIM_DHT_TEMP_X10: AtomicI16 = AtomicI16::new(250);
#[cfg(not(target_os = "espidf"))]
static SIM_DHT_HUMID_X10: AtomicI16 = AtomicI16::new(500);
#[cfg(not(target_os = "espidf"))]
static SIM_DHT_FAIL: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn dht_read(_gpio: i32) -> Option<(i16, i16)> {
    if SIM_DHT_FAIL.load(Ordering::Relaxed) {
        return None;
    }
    Some((
        SIM_DHT_TEMP_X10.load(Ordering::Relaxed),
        SIM_DHT_HUMID_X10.load(Ordering::Relaxed),
    ))
}

/// Inject a DHT reading in tenths of a unit (host tests only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_dht(temp_x10: i16, humid_x10: i16) {
    SIM_DHT_FAIL.store(false, Ordering::Relaxed);
    SIM_DHT_TEMP_X10.store(temp_x10, Ordering::Relaxed);
    SIM_DHT_HUMID_X10.store(humid_x10, Ordering::Relaxed);
}

/// Make the next DHT reads fail (host tests only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_dht_fail(fail: bool) {
    SIM_DHT_FAIL.store(fail, Ordering::Relaxed);
}
