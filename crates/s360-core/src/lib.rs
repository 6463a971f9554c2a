//! Core traits and types for the System/360 simulator.
//!
//! Everything advances one macro-cycle at a time:
//! the micro-engine steps, every attached device runs its `bus_func` once,
//! and the event queue advances by one tick. No preemption, no internal
//! parallelism.

pub mod bustag;
pub mod events;
pub mod observable;
pub mod ticks;
pub mod trace;

pub use bustag::{BusTag, TagLines};
pub use events::{Event, EventQueue};
pub use observable::{Observable, Value};
pub use ticks::Ticks;
pub use trace::{TraceCategory, TraceRecord, TraceSink};
