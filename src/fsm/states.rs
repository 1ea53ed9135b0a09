//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap.
//!
//! ```text
//!  IDLE ──[soil ≤ dry ∧ budget left]──▶ RUNNING
//!    ▲                                     │
//!    │  [burst done / soil ≥ wet (auto) /  │
//!    │   forced off]                       │
//!    └─────────────────────────────────────┘
//!
//!  Any state ──[relay overrun]──▶ FAULTED (terminal until next wake)
//! ```
//!
//! A reading that failed this cycle (`fresh == false`) can never start the
//! pump; it can still stop it, since the burst timer and remote commands do
//! not depend on the sensor.

use super::context::{FsmContext, PumpMode};
use super::{StateDescriptor, StateId};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 — Running
        StateDescriptor {
            id: StateId::Running,
            name: "Running",
            on_enter: Some(running_enter),
            on_exit: Some(running_exit),
            on_update: running_update,
        },
        // Index 2 — Faulted
        StateDescriptor {
            id: StateId::Faulted,
            name: "Faulted",
            on_enter: Some(faulted_enter),
            on_exit: None,
            on_update: faulted_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.commands.relay_on = false;
    ctx.commands.led_on = false;
    info!("IDLE: relay off, monitoring soil moisture");
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    // Guard: any relay fault → Faulted
    if ctx.has_faults() {
        return Some(StateId::Faulted);
    }

    // The run budget caps total watering per wake cycle; once spent,
    // nothing (including a remote force-on) restarts the pump.
    if !ctx.has_run_budget() {
        return None;
    }

    match ctx.pump_mode {
        PumpMode::ForcedOn => return Some(StateId::Running),
        PumpMode::ForcedOff => return None,
        PumpMode::Auto => {}
    }

    // Trigger: fresh reading with soil at or below the dry threshold.
    if ctx.reading.fresh && ctx.reading.soil_moisture_pct <= ctx.config.dry_soil_pct {
        info!(
            "IDLE: soil {:.1}% ≤ dry {:.1}% → watering",
            ctx.reading.soil_moisture_pct, ctx.config.dry_soil_pct
        );
        return Some(StateId::Running);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING state — relay on, bounded watering burst
// ═══════════════════════════════════════════════════════════════════════════

fn running_enter(ctx: &mut FsmContext) {
    ctx.commands.relay_on = true;
    ctx.commands.led_on = true;
    info!(
        "RUNNING: pump on for up to {:.0}s (mode {:?})",
        ctx.run_budget_secs(),
        ctx.pump_mode
    );
}

fn running_exit(ctx: &mut FsmContext) {
    ctx.commands.relay_on = false;
    ctx.commands.led_on = false;
    info!(
        "RUNNING: pump off after {:.0}s ({:.0}s used this wake)",
        ctx.secs_in_state(),
        ctx.run_secs_this_wake
    );
}

fn running_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.has_faults() {
        return Some(StateId::Faulted);
    }

    // Account the relay-on time against the wake-cycle budget.
    ctx.run_secs_this_wake += ctx.tick_period_secs;

    // Remote "pump off" stops the burst immediately.
    if ctx.pump_mode == PumpMode::ForcedOff {
        info!("RUNNING: remote pump-off received");
        return Some(StateId::Idle);
    }

    // Early stop: the soil reached the wet threshold. A manual force-on
    // deliberately overrides this check; the burst timer and the run
    // budget still bound it.
    if ctx.pump_mode != PumpMode::ForcedOn
        && ctx.reading.fresh
        && ctx.reading.soil_moisture_pct >= ctx.config.wet_soil_pct
    {
        info!(
            "RUNNING: soil {:.1}% ≥ wet {:.1}% → early stop",
            ctx.reading.soil_moisture_pct, ctx.config.wet_soil_pct
        );
        return Some(StateId::Idle);
    }

    // Burst timer expired.
    if ctx.secs_in_state() >= ctx.config.pump_on_secs as f32 {
        return Some(StateId::Idle);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAULTED state — relay overrun guard tripped, terminal until next wake
// ═══════════════════════════════════════════════════════════════════════════

fn faulted_enter(ctx: &mut FsmContext) {
    ctx.commands = super::context::ActuatorCommands::all_off();
    warn!(
        "FAULTED: relay forced off, fault_flags=0b{:08b} — held until next wake",
        ctx.fault_flags
    );
}

fn faulted_update(ctx: &mut FsmContext) -> Option<StateId> {
    // Blink the status LED so the fault is visible on the board.
    ctx.commands.led_on = ctx.ticks_in_state % 2 == 0;
    ctx.commands.relay_on = false;

    // A relay overrun is a hardware-safety fault: it is never retried
    // within the same wake cycle. Deep sleep (reboot) is the recovery path.
    None
}
