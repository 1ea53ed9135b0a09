//! Function-pointer finite state machine for the pump controller.
//!
//! Classic embedded FSM pattern expressed in safe Rust:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  StateTable                                               │
//! │  ┌─────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ StateId │ on_enter  │ on_exit  │ on_update         │   │
//! │  ├─────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ Idle    │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Running │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Faulted │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  └─────────┴───────────┴──────────┴───────────────────┘   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the current
//! pointer. All functions receive `&mut FsmContext` which holds the
//! sensor reading, actuator commands, config, and timing.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of the pump controller states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    /// Relay off; waiting for dry soil or a remote command.
    Idle = 0,
    /// Relay on; bounded by the run-time budget.
    Running = 1,
    /// Relay overrun guard tripped; terminal for this wake cycle.
    Faulted = 2,
}

impl StateId {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert a `u8` index back to `StateId`. Panics on out-of-range in
    /// debug builds; returns `Faulted` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Faulted,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Faulted
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]); the mutable
/// [`FsmContext`] is threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition, bypassing the current state's
    /// `on_update` verdict. No-op if `next` is already current.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        // Update pointer and timing
        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::{FsmContext, PumpMode};
    use super::*;
    use crate::config::SystemConfig;
    use crate::error::RelayFault;

    fn make_ctx() -> FsmContext {
        let mut ctx = FsmContext::new(SystemConfig::default());
        // A fresh mid-range reading keeps the FSM in Idle unless a test
        // drives it elsewhere.
        ctx.reading.soil_moisture_pct = 50.0;
        ctx.reading.fresh = true;
        ctx
    }

    fn make_fsm() -> Fsm {
        Fsm::new(states::build_state_table(), StateId::Idle)
    }

    /// Drive moisture to a value and tick once.
    fn tick_with_moisture(fsm: &mut Fsm, ctx: &mut FsmContext, pct: f32) {
        ctx.reading.soil_moisture_pct = pct;
        ctx.reading.fresh = true;
        fsm.tick(ctx);
    }

    #[test]
    fn starts_in_idle() {
        let fsm = make_fsm();
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn start_runs_on_enter() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.commands.relay_on = true;
        fsm.start(&mut ctx);
        assert!(!ctx.commands.relay_on, "idle_enter must command relay off");
    }

    #[test]
    fn tick_increments_counter() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.ticks_in_current_state(), 1);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.ticks_in_current_state(), 2);
    }

    #[test]
    fn idle_to_running_on_dry_soil() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        let below_dry = ctx.config.dry_soil_pct - 5.0;
        tick_with_moisture(&mut fsm, &mut ctx, below_dry);
        assert_eq!(fsm.current_state(), StateId::Running);
        assert!(ctx.commands.relay_on);
    }

    #[test]
    fn idle_stays_when_soil_moist() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        let above_dry = ctx.config.dry_soil_pct + 5.0;
        tick_with_moisture(&mut fsm, &mut ctx, above_dry);
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn stale_reading_never_starts_pump() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.reading.soil_moisture_pct = 0.0;
        ctx.reading.fresh = false;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn running_stops_after_pump_on_secs() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        tick_with_moisture(&mut fsm, &mut ctx, 10.0);
        assert_eq!(fsm.current_state(), StateId::Running);

        let ticks_needed =
            (ctx.config.pump_on_secs as f32 / ctx.tick_period_secs) as u64 + 1;
        for _ in 0..ticks_needed {
            tick_with_moisture(&mut fsm, &mut ctx, 10.0);
        }
        assert_eq!(fsm.current_state(), StateId::Idle);
        assert!(!ctx.commands.relay_on);
    }

    #[test]
    fn running_early_stops_when_soil_wet() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        tick_with_moisture(&mut fsm, &mut ctx, 10.0);
        assert_eq!(fsm.current_state(), StateId::Running);

        let above_wet = ctx.config.wet_soil_pct + 1.0;
        tick_with_moisture(&mut fsm, &mut ctx, above_wet);
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn forced_on_starts_pump_regardless_of_moisture() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.pump_mode = PumpMode::ForcedOn;
        tick_with_moisture(&mut fsm, &mut ctx, 90.0);
        assert_eq!(fsm.current_state(), StateId::Running);
    }

    #[test]
    fn forced_on_is_not_stopped_by_wet_soil() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        // Manual force-on on saturated soil must hold Running tick after
        // tick (no relay chatter), until the burst timer expires.
        ctx.pump_mode = PumpMode::ForcedOn;
        let saturated = ctx.config.wet_soil_pct + 10.0;
        for _ in 0..5 {
            tick_with_moisture(&mut fsm, &mut ctx, saturated);
            assert_eq!(fsm.current_state(), StateId::Running);
            assert!(ctx.commands.relay_on);
        }

        let burst_ticks = (ctx.config.pump_on_secs as f32 / ctx.tick_period_secs) as u64 + 1;
        for _ in 0..burst_ticks {
            tick_with_moisture(&mut fsm, &mut ctx, saturated);
        }
        assert_eq!(fsm.current_state(), StateId::Idle);
        assert!(!ctx.commands.relay_on);
    }

    #[test]
    fn forced_off_blocks_auto_start() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.pump_mode = PumpMode::ForcedOff;
        tick_with_moisture(&mut fsm, &mut ctx, 0.0);
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn forced_off_stops_running_pump() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        tick_with_moisture(&mut fsm, &mut ctx, 10.0);
        assert_eq!(fsm.current_state(), StateId::Running);

        ctx.pump_mode = PumpMode::ForcedOff;
        tick_with_moisture(&mut fsm, &mut ctx, 10.0);
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn exhausted_budget_blocks_restart() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.run_secs_this_wake = ctx.config.pump_on_secs as f32;
        tick_with_moisture(&mut fsm, &mut ctx, 0.0);
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn forced_on_respects_run_budget() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.run_secs_this_wake = ctx.config.pump_on_secs as f32;
        ctx.pump_mode = PumpMode::ForcedOn;
        tick_with_moisture(&mut fsm, &mut ctx, 0.0);
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn fault_sends_any_state_to_faulted() {
        for start_state in [StateId::Idle, StateId::Running] {
            let mut fsm = make_fsm();
            let mut ctx = make_ctx();
            fsm.start(&mut ctx);
            if start_state != StateId::Idle {
                fsm.force_transition(start_state, &mut ctx);
            }

            ctx.fault_flags = RelayFault::Overrun.mask();
            fsm.tick(&mut ctx);
            assert_eq!(
                fsm.current_state(),
                StateId::Faulted,
                "expected Faulted from {:?}",
                start_state
            );
        }
    }

    #[test]
    fn faulted_kills_relay() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        ctx.commands.relay_on = true;
        fsm.force_transition(StateId::Faulted, &mut ctx);
        assert!(!ctx.commands.relay_on);
    }

    #[test]
    fn faulted_is_terminal_for_the_wake_cycle() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        fsm.force_transition(StateId::Faulted, &mut ctx);

        // Even after the flags clear, Faulted holds until reboot.
        ctx.fault_flags = 0;
        for _ in 0..10 {
            tick_with_moisture(&mut fsm, &mut ctx, 0.0);
        }
        assert_eq!(fsm.current_state(), StateId::Faulted);
        assert!(!ctx.commands.relay_on);
    }

    #[test]
    fn state_id_from_index_roundtrip() {
        for i in 0..StateId::COUNT {
            let id = StateId::from_index(i);
            assert_eq!(id as usize, i);
        }
    }
}
