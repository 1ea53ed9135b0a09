//! Event queue between producers (timer cadence, ISR-context callbacks,
//! the cloud transport) and the single consumer control loop.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Timer tick  │────▶│              │     │              │
//! │ Cloud inbox │────▶│  Event Queue │────▶│  Main Loop   │
//! │ Software    │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Events carry no payload; the payload lives wherever the producer put
//! it (the cloud adapter's inbound queue, the sensor context), and the
//! event is just the "go look" signal.

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 32;

/// System event types, ordered by rough priority.
/// Lower discriminant = higher priority when multiple events
/// are pending simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// FSM control loop tick (1 Hz by default).
    ControlTick = 20,
    /// Telemetry report timer fired.
    TelemetryTick = 30,
    /// One or more commands are waiting in the cloud inbound queue.
    CommandReceived = 31,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Producers write, main loop reads (consume).
// Uses atomic head/tail indices.  The buffer is intentionally
// kept in a static so ISR callbacks can access it.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER is single-producer/single-consumer.
// Producer (push_event): timer-callback / main-task context — one writer.
// Consumer (pop_event): main-loop task — one reader.
// The head/tail atomics enforce the SPSC discipline; a slot is only
// read after the Release store that published it.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Safe to call from ISR context (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: only one producer; the slot at `head` is not visible to
    // the consumer until the Release store below.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed) as usize;
    let tail = EVENT_TAIL.load(Ordering::Relaxed) as usize;
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        20 => Some(Event::ControlTick),
        30 => Some(Event::TelemetryTick),
        31 => Some(Event::CommandReceived),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The queue is a process-wide static, so exercise it in one test to
    // avoid cross-test interference under the parallel test runner.
    #[test]
    fn fifo_push_pop_and_overflow() {
        while pop_event().is_some() {}

        assert!(push_event(Event::ControlTick));
        assert!(push_event(Event::TelemetryTick));
        assert!(push_event(Event::CommandReceived));
        assert_eq!(queue_len(), 3);

        assert_eq!(pop_event(), Some(Event::ControlTick));
        assert_eq!(pop_event(), Some(Event::TelemetryTick));
        assert_eq!(pop_event(), Some(Event::CommandReceived));
        assert_eq!(pop_event(), None);

        // Fill to capacity - 1 (one slot is sacrificed to tell
        // full from empty), then verify overflow drops.
        for _ in 0..31 {
            assert!(push_event(Event::ControlTick));
        }
        assert!(!push_event(Event::ControlTick));

        let mut drained = 0;
        drain_events(|_| drained += 1);
        assert_eq!(drained, 31);
    }
}
