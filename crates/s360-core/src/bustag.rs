//! Bus/tag parallel I/O interface lines.
//!
//! Sixteen tag lines plus an 8-bit bus-out and 8-bit bus-in, each carrying
//! a parity bit. Unlike the IEC serial bus (three open-collector lines,
//! each independently pulled low by either participant), bus/tag lines are
//! driven by exactly one side each — out-tags by the channel, in-tags by
//! the selected device — so no wired-AND merge is needed. What *is*
//! essential is double-buffering: the channel's tag-out changes
//! this cycle are visible to devices this cycle, but a device's tag-in
//! changes are only visible to the channel on the *next* cycle (modeling
//! propagation delay one way and not the other, since the channel is the
//! cycle's driver). [`BusTag`] keeps two [`TagLines`] snapshots and swaps
//! them at the end of every macro-cycle.

/// The sixteen bus/tag lines, split into CPU-to-device ("out") and
/// device-to-CPU ("in") halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagLines {
    // Out-from-CPU tags.
    pub opr_out: bool,
    pub adr_out: bool,
    pub cmd_out: bool,
    pub srv_out: bool,
    pub sup_out: bool,
    pub hld_out: bool,
    pub sel_out: bool,

    // In-from-device tags.
    pub opr_in: bool,
    pub adr_in: bool,
    pub sta_in: bool,
    pub srv_in: bool,
    pub req_in: bool,
}

impl TagLines {
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            opr_out: false,
            adr_out: false,
            cmd_out: false,
            srv_out: false,
            sup_out: false,
            hld_out: false,
            sel_out: false,
            opr_in: false,
            adr_in: false,
            sta_in: false,
            srv_in: false,
            req_in: false,
        }
    }

    /// Clear every in-from-device tag. Used on reset (`OPR_OUT` drops).
    pub fn drop_in_tags(&mut self) {
        self.opr_in = false;
        self.adr_in = false;
        self.sta_in = false;
        self.srv_in = false;
        self.req_in = false;
    }

    /// Clear every out-from-CPU tag.
    pub fn drop_out_tags(&mut self) {
        self.opr_out = false;
        self.adr_out = false;
        self.cmd_out = false;
        self.srv_out = false;
        self.sup_out = false;
        self.hld_out = false;
        self.sel_out = false;
    }
}

/// Odd parity over a byte (the bus/tag convention: total set bits including
/// the parity bit itself is always odd).
#[must_use]
pub fn odd_parity(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}

/// Double-buffered bus/tag state for one channel.
///
/// `cpu_tags`/`cpu_bus_out` are written by the channel each cycle and read
/// by devices; `dev_tags`/`dev_bus_in` are written by the (one, selected)
/// device each cycle and read by the channel. Both sides read the
/// *previous* cycle's values from the other side — [`BusTag::latch`] is
/// called once per macro-cycle, after both the channel and the devices
/// have run, to make this cycle's writes visible next cycle.
#[derive(Debug, Clone, Default)]
pub struct BusTag {
    /// Tags/bus driven by the channel, visible to devices this cycle.
    cpu_tags: TagLines,
    cpu_bus_out: u8,
    cpu_bus_out_parity: bool,

    /// Tags/bus driven by the selected device, visible to the channel
    /// starting next cycle.
    dev_tags: TagLines,
    dev_bus_in: u8,
    dev_bus_in_parity: bool,

    /// Staged writes for the next latch point.
    next_cpu_tags: TagLines,
    next_cpu_bus_out: u8,
    next_dev_tags: TagLines,
    next_dev_bus_in: u8,

    /// Set when a device's parity does not match its asserted byte.
    pub bus_check: bool,
}

impl BusTag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What a device currently observes as the CPU's tag-out state.
    #[must_use]
    pub const fn cpu_tags(&self) -> TagLines {
        self.cpu_tags
    }

    #[must_use]
    pub const fn cpu_bus_out(&self) -> u8 {
        self.cpu_bus_out
    }

    /// What the channel currently observes as the selected device's
    /// tag-in state (one cycle old, per the propagation-delay model).
    #[must_use]
    pub const fn dev_tags(&self) -> TagLines {
        self.dev_tags
    }

    #[must_use]
    pub const fn dev_bus_in(&self) -> u8 {
        self.dev_bus_in
    }

    /// The channel drives its tag-out state and bus-out byte for this
    /// cycle. Visible to devices immediately (no buffering on this side:
    /// the channel is the clock's driver).
    pub fn drive_cpu(&mut self, tags: TagLines, bus_out: u8) {
        self.cpu_tags = tags;
        self.cpu_bus_out = bus_out;
        self.cpu_bus_out_parity = odd_parity(bus_out);
        self.next_cpu_tags = tags;
        self.next_cpu_bus_out = bus_out;
    }

    /// A device drives its tag-in state and bus-in byte for this cycle.
    /// Not visible to the channel until [`BusTag::latch`] runs.
    pub fn drive_device(&mut self, tags: TagLines, bus_in: u8, parity_bit: bool) {
        self.next_dev_tags = tags;
        self.next_dev_bus_in = bus_in;
        self.dev_bus_in_parity = parity_bit;
        if parity_bit != odd_parity(bus_in) {
            self.bus_check = true;
        }
    }

    /// End-of-cycle latch: the device's staged tag-in/bus-in state becomes
    /// what the channel reads next cycle.
    pub fn latch(&mut self) {
        self.dev_tags = self.next_dev_tags;
        self.dev_bus_in = self.next_dev_bus_in;
    }

    /// Invariant check: at most one device may assert `OPR_IN` or
    /// `ADR_IN` at a time. Devices are responsible for only asserting
    /// in-tags when selected; this helper lets callers assert that in
    /// tests by tracking how many devices tried to drive simultaneously.
    #[must_use]
    pub const fn check(&self) -> bool {
        !self.bus_check
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_parity_examples() {
        // Parity bit value needed so total set bits (byte + parity) is odd.
        assert!(odd_parity(0x00)); // 0 data bits set -> parity bit = 1
        assert!(!odd_parity(0x01)); // 1 data bit set -> parity bit = 0
        assert!(odd_parity(0x03)); // 2 data bits set -> parity bit = 1
        assert!(odd_parity(0xFF)); // 8 data bits set -> parity bit = 1
    }

    #[test]
    fn device_write_not_visible_until_latch() {
        let mut bus = BusTag::new();
        let mut dev_tags = TagLines::idle();
        dev_tags.opr_in = true;
        bus.drive_device(dev_tags, 0x42, odd_parity(0x42));
        assert!(!bus.dev_tags().opr_in, "not visible before latch");
        bus.latch();
        assert!(bus.dev_tags().opr_in, "visible after latch");
        assert_eq!(bus.dev_bus_in(), 0x42);
    }

    #[test]
    fn cpu_write_visible_immediately() {
        let mut bus = BusTag::new();
        let mut tags = TagLines::idle();
        tags.sel_out = true;
        bus.drive_cpu(tags, 0x0B);
        assert!(bus.cpu_tags().sel_out);
        assert_eq!(bus.cpu_bus_out(), 0x0B);
    }

    #[test]
    fn parity_mismatch_sets_bus_check() {
        let mut bus = BusTag::new();
        bus.drive_device(TagLines::idle(), 0x00, false); // wrong: 0x00 wants parity bit = true
        assert!(bus.bus_check);
    }

    #[test]
    fn drop_in_tags_clears_only_in_side() {
        let mut tags = TagLines::idle();
        tags.opr_out = true;
        tags.opr_in = true;
        tags.req_in = true;
        tags.drop_in_tags();
        assert!(tags.opr_out);
        assert!(!tags.opr_in);
        assert!(!tags.req_in);
    }
}
