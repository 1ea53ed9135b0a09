//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to. It contains the latest sensor reading, actuator command
//! outputs, timing information, configuration, pump mode, and accumulated
//! relay faults.

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Sensor reading (read-only to state handlers; written by the sensor hub)
// ---------------------------------------------------------------------------

/// A point-in-time reading of the environment sensors.
///
/// Immutable once produced; superseded each sample cycle. When a sample
/// fails, the previous reading is retained and `fresh` stays `false` for
/// that cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorReading {
    /// Air temperature (°C) — always stored in Celsius internally.
    pub temperature_c: f32,
    /// Relative humidity (%).
    pub humidity_pct: f32,
    /// Calibrated soil moisture (%), clamped to [0, 100].
    pub soil_moisture_pct: f32,
    /// Heat index in the configured display unit.
    pub heat_index: f32,
    /// Control-loop tick at which this reading was produced.
    pub timestamp_tick: u64,
    /// `true` if this reading was produced this cycle (not retained).
    pub fresh: bool,
}

// ---------------------------------------------------------------------------
// Pump mode (remote override)
// ---------------------------------------------------------------------------

/// Watering mode selected from the dashboard pump button / mode channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PumpMode {
    /// Moisture-threshold driven watering.
    #[default]
    Auto,
    /// Remote override: run the pump regardless of moisture
    /// (still bounded by the run-time guard).
    ForcedOn,
    /// Remote override: keep the pump off regardless of moisture.
    ForcedOff,
}

// ---------------------------------------------------------------------------
// Actuator commands (written by state handlers; consumed by main loop)
// ---------------------------------------------------------------------------

/// Commands that state handlers write to request actuator actions.
/// The main loop applies these to the actual drivers each tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActuatorCommands {
    /// Desired pump relay state.
    pub relay_on: bool,
    /// Desired status LED state (lit while watering).
    pub led_on: bool,
}

impl ActuatorCommands {
    /// Everything off — safe default.
    pub fn all_off() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
    /// Duration of one tick in seconds (inverse of control loop frequency).
    pub tick_period_secs: f32,

    // -- Sensor data --
    /// Latest sensor reading. Updated before each FSM tick.
    pub reading: SensorReading,

    // -- Actuator outputs --
    /// Commands to be applied to actuators after the FSM tick.
    pub commands: ActuatorCommands,

    // -- Configuration --
    /// System configuration (tunable parameters).
    pub config: SystemConfig,

    // -- Overrides --
    /// Current pump mode (remote override or automatic).
    pub pump_mode: PumpMode,

    // -- Run budget --
    /// Seconds the relay has been commanded on during this wake cycle.
    pub run_secs_this_wake: f32,

    // -- Safety --
    /// Accumulated relay fault bitmask (see `RelayFault::mask()`).
    /// Set by the safety supervisor, read by state handlers.
    pub fault_flags: u8,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            tick_period_secs: config.control_loop_interval_ms as f32 / 1000.0,
            reading: SensorReading::default(),
            commands: ActuatorCommands::all_off(),
            config,
            pump_mode: PumpMode::Auto,
            run_secs_this_wake: 0.0,
            fault_flags: 0,
        }
    }

    /// Seconds elapsed since the current state was entered.
    pub fn secs_in_state(&self) -> f32 {
        self.ticks_in_state as f32 * self.tick_period_secs
    }

    /// Returns `true` if **any** relay fault is active.
    pub fn has_faults(&self) -> bool {
        self.fault_flags != 0
    }

    /// Run-budget seconds still available in this wake cycle.
    pub fn run_budget_secs(&self) -> f32 {
        (self.config.pump_on_secs as f32 - self.run_secs_this_wake).max(0.0)
    }

    /// `true` while the wake cycle still has watering budget left.
    pub fn has_run_budget(&self) -> bool {
        self.run_budget_secs() >= self.tick_period_secs
    }
}
