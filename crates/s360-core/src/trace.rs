//! Leveled, category-masked trace sink.
//!
//! This models the "Trace Sink" leaf of the component table: a consumer of
//! structured trace records. The actual text formatter/file writer is an
//! external collaborator (out of scope, corresponds to `logger.c` in the
//! original implementation) — the core only ever emits [`TraceRecord`]s
//! through the [`TraceSink`] trait.

use core::fmt;

/// Bitmask of trace categories, mirroring the original `LOG_*` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceCategory(pub u32);

impl TraceCategory {
    pub const INFO: Self = Self(1 << 0);
    pub const WARN: Self = Self(1 << 1);
    pub const ERROR: Self = Self(1 << 2);
    pub const TRACE: Self = Self(1 << 3);
    pub const ITRACE: Self = Self(1 << 4);
    pub const MICRO: Self = Self(1 << 5);
    pub const REG: Self = Self(1 << 6);
    pub const MEM: Self = Self(1 << 7);
    pub const MPXCHN: Self = Self(1 << 8);
    pub const SELCHN: Self = Self(1 << 9);
    pub const DEVICE: Self = Self(1 << 10);
    pub const CONSOLE: Self = Self(1 << 11);
    pub const TAPE: Self = Self(1 << 12);
    pub const DISK: Self = Self(1 << 13);
    pub const CARD: Self = Self(1 << 14);
    pub const EVENT: Self = Self(1 << 15);

    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0xFFFF);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl core::ops::BitOr for TraceCategory {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One structured trace event. Formatting is left to the sink.
#[derive(Debug, Clone)]
pub struct TraceRecord {
    pub category: TraceCategory,
    pub cycle: u64,
    pub message: String,
}

impl TraceRecord {
    #[must_use]
    pub fn new(category: TraceCategory, cycle: u64, message: impl Into<String>) -> Self {
        Self {
            category,
            cycle,
            message: message.into(),
        }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>10}] {}", self.cycle, self.message)
    }
}

/// A consumer of trace records, filtered by enabled category mask.
pub trait TraceSink {
    /// Returns the set of categories this sink wants to receive.
    fn enabled(&self) -> TraceCategory;

    /// Receive one trace record. Callers must check `enabled()` first;
    /// sinks may assume every record they receive is wanted, matching how
    /// the original `log_trace!`-style macros skip formatting work
    /// entirely when the category bit is clear.
    fn emit(&mut self, record: TraceRecord);

    /// Emit `record` only if its category is enabled.
    fn emit_if_enabled(&mut self, record: TraceRecord) {
        if self.enabled().contains(record.category) {
            self.emit(record);
        }
    }
}

/// A sink that discards everything. The default for headless/test runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn enabled(&self) -> TraceCategory {
        TraceCategory::NONE
    }

    fn emit(&mut self, _record: TraceRecord) {}
}

/// A sink that collects records in memory, for test assertions.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub mask: TraceCategory,
    pub records: Vec<TraceRecord>,
}

impl CollectingSink {
    #[must_use]
    pub fn new(mask: TraceCategory) -> Self {
        Self {
            mask,
            records: Vec::new(),
        }
    }
}

impl TraceSink for CollectingSink {
    fn enabled(&self) -> TraceCategory {
        self.mask
    }

    fn emit(&mut self, record: TraceRecord) {
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_filters_categories() {
        let mut sink = CollectingSink::new(TraceCategory::MICRO | TraceCategory::MEM);
        sink.emit_if_enabled(TraceRecord::new(TraceCategory::MICRO, 1, "step"));
        sink.emit_if_enabled(TraceRecord::new(TraceCategory::TAPE, 2, "tape motion"));
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].message, "step");
    }

    #[test]
    fn null_sink_drops_everything() {
        let mut sink = NullSink;
        sink.emit_if_enabled(TraceRecord::new(TraceCategory::ALL, 0, "anything"));
        assert_eq!(sink.enabled(), TraceCategory::NONE);
    }
}
