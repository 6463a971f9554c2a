//! Monotonic future-time event queue.
//!
//! Delivers delayed callbacks to devices — e.g. "line printed in N ticks".
//! Callbacks are modeled as a tagged `(target, op, arg)` triple rather than
//! a raw function pointer (see DESIGN NOTES, "Event callbacks"): `target`
//! is an opaque device index the owner assigns meaning to, `op` is a
//! small integer operation code, and `arg` is a single payload word. The
//! owner (a device or the channel set) is responsible for interpreting
//! `(target, op, arg)` when [`EventQueue::advance`] yields it back.

use crate::Ticks;

/// A scheduled future event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub fire_time: Ticks,
    pub target: u32,
    pub op: u32,
    pub arg: i32,
    /// Insertion sequence, used only to break ties at equal `fire_time`
    /// so that `advance` is stable in insertion order.
    seq: u64,
}

impl Event {
    #[must_use]
    pub const fn fire_time(&self) -> Ticks {
        self.fire_time
    }
}

/// A time-ordered queue of [`Event`]s.
///
/// Stable in insertion order for equal fire times. Callbacks fired during
/// `advance` may insert new events, but an event inserted for the *current*
/// `now` will not fire until the next call to `advance` (no reentrancy
/// within one advance).
#[derive(Debug, Default)]
pub struct EventQueue {
    now: Ticks,
    pending: Vec<Event>,
    next_seq: u64,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Ticks::ZERO,
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    #[must_use]
    pub const fn now(&self) -> Ticks {
        self.now
    }

    /// Schedule `target`/`op`/`arg` to fire `delay` ticks from now.
    pub fn insert(&mut self, delay: Ticks, target: u32, op: u32, arg: i32) {
        let event = Event {
            fire_time: self.now + delay,
            target,
            op,
            arg,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        // Insertion-sorted by (fire_time, seq) so `advance` can just pop
        // from the front; ties resolve in insertion order.
        let pos = self
            .pending
            .partition_point(|e| (e.fire_time, e.seq) <= (event.fire_time, event.seq));
        self.pending.insert(pos, event);
    }

    /// Advance the queue by one tick, returning every event whose
    /// `fire_time` has now arrived, in the order they were scheduled for
    /// equal fire times. Events inserted by this call (via a caller
    /// re-invoking `insert` after reading the result) will not appear
    /// until a later `advance`, since `now` has already moved past them
    /// only once a subsequent call observes it.
    pub fn advance(&mut self) -> Vec<Event> {
        self.now += Ticks::new(1);
        self.drain_due()
    }

    /// Pop and return every event due at or before the current `now`.
    fn drain_due(&mut self) -> Vec<Event> {
        let split = self.pending.partition_point(|e| e.fire_time <= self.now);
        self.pending.drain(..split).collect()
    }

    /// Remove every pending event targeting `target` (used on device reset).
    pub fn cancel_all_for(&mut self, target: u32) {
        self.pending.retain(|e| e.target != target);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
