//! IBM 1442 card reader/punch: feed cycle, two-stage read/punch buffer,
//! hopper-empty (EOF) switch.
//!
//! Grounded on the per-device template the printer worked example sets
//! (its closing paragraph calls out "feed cycle events, two-stage
//! read/punch buffer, EOF switch" as the reader/punch's distinguishing
//! timing) and on the `Device` seam in `s360-channel`.

use s360_channel::{Device, InitialStatus, StackedStatus};
use s360_core::Ticks;
use std::collections::VecDeque;

/// One card-feed cycle, in ticks.
const FEED_CYCLE: Ticks = Ticks::new(4);

/// Sense bits for the card reader/punch family (distinct from the printer's).
pub mod sense_bit {
    pub const CMDREJ: u8 = 0b1000_0000;
    pub const INTERV: u8 = 0b0100_0000;
    pub const BUSCHK: u8 = 0b0010_0000;
    pub const EQUCHK: u8 = 0b0001_0000;
    pub const DATACHK: u8 = 0b0000_1000;
    pub const OVERRUN: u8 = 0b0000_0100;
    pub const NULL_CARD: u8 = 0b0000_0010;
    pub const TRANSPORT: u8 = 0b0000_0001;
}

mod command {
    pub const TEST_IO: u8 = 0x00;
    pub const READ: u8 = 0x02;
    pub const PUNCH: u8 = 0x01;
    pub const SENSE: u8 = 0x04;
}

const COLUMNS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Reading,
    Punching,
}

pub struct CardReaderPunch {
    address: u16,
    hopper: VecDeque<[u8; COLUMNS]>,
    stacker: Vec<[u8; COLUMNS]>,
    current: [u8; COLUMNS],
    pos: usize,
    mode: Mode,
    sense: u8,
    stacked: StackedStatus,
}

impl CardReaderPunch {
    #[must_use]
    pub fn new(address: u16, deck: Vec<[u8; COLUMNS]>) -> Self {
        Self {
            address,
            hopper: deck.into(),
            stacker: Vec::new(),
            current: [0x40; COLUMNS],
            pos: 0,
            mode: Mode::Idle,
            sense: 0,
            stacked: StackedStatus::new(),
        }
    }

    /// Punched-card output accumulated in the stacker so far.
    #[must_use]
    pub fn stacker(&self) -> &[[u8; COLUMNS]] {
        &self.stacker
    }

    #[must_use]
    pub fn cards_remaining(&self) -> usize {
        self.hopper.len()
    }
}

impl Device for CardReaderPunch {
    fn address(&self) -> u16 {
        self.address
    }

    fn start(&mut self, command: u8) -> InitialStatus {
        if let Some(sense) = self.stacked.pending() {
            if command != command::SENSE && command != command::TEST_IO {
                self.sense = sense;
                return InitialStatus {
                    unit_check: true,
                    ..InitialStatus::default()
                };
            }
        }
        match command {
            command::TEST_IO => InitialStatus::default(),
            command::SENSE => {
                self.mode = Mode::Idle;
                self.stacked.take();
                InitialStatus::default()
            }
            command::READ => {
                self.sense = 0;
                match self.hopper.pop_front() {
                    Some(card) => {
                        self.current = card;
                        self.pos = 0;
                        self.mode = Mode::Reading;
                        InitialStatus {
                            completion_delay: FEED_CYCLE,
                            ..InitialStatus::default()
                        }
                    }
                    None => {
                        self.sense = sense_bit::INTERV;
                        self.stacked.push(self.sense);
                        InitialStatus {
                            unit_check: true,
                            ..InitialStatus::default()
                        }
                    }
                }
            }
            command::PUNCH => {
                self.sense = 0;
                self.current = [0x40; COLUMNS];
                self.pos = 0;
                self.mode = Mode::Punching;
                InitialStatus {
                    completion_delay: FEED_CYCLE,
                    ..InitialStatus::default()
                }
            }
            _ => {
                self.sense = sense_bit::CMDREJ;
                self.stacked.push(self.sense);
                InitialStatus {
                    unit_check: true,
                    ..InitialStatus::default()
                }
            }
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.mode != Mode::Reading || self.pos >= COLUMNS {
            return None;
        }
        let b = self.current[self.pos];
        self.pos += 1;
        Some(b)
    }

    fn write_byte(&mut self, byte: u8) {
        if self.mode == Mode::Punching && self.pos < COLUMNS {
            self.current[self.pos] = byte;
            self.pos += 1;
            if self.pos == COLUMNS {
                self.stacker.push(self.current);
            }
        }
    }

    fn sense(&self) -> u8 {
        self.sense
    }

    fn poll(&mut self, _now: u64) -> Option<u8> {
        None
    }

    fn reset(&mut self) {
        self.mode = Mode::Idle;
        self.pos = 0;
        self.sense = 0;
        self.stacked.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(text: &str) -> [u8; COLUMNS] {
        let mut c = [0x40; COLUMNS];
        for (i, b) in text.bytes().enumerate().take(COLUMNS) {
            c[i] = b;
        }
        c
    }

    #[test]
    fn reads_one_card_byte_at_a_time() {
        let mut dev = CardReaderPunch::new(0x00B, vec![card("HELLO")]);
        let status = dev.start(command::READ);
        assert!(!status.unit_check);
        let mut out = Vec::new();
        while let Some(b) = dev.read_byte() {
            out.push(b);
        }
        assert_eq!(out.len(), COLUMNS);
        assert_eq!(&out[..5], b"HELLO");
    }

    #[test]
    fn empty_hopper_is_intervention_required() {
        let mut dev = CardReaderPunch::new(0x00C, vec![]);
        let status = dev.start(command::READ);
        assert!(status.unit_check);
        assert_eq!(dev.sense(), sense_bit::INTERV);
    }

    #[test]
    fn punch_accumulates_full_card_into_stacker() {
        let mut dev = CardReaderPunch::new(0x00D, vec![]);
        dev.start(command::PUNCH);
        for b in card("PUNCHED") {
            dev.write_byte(b);
        }
        assert_eq!(dev.stacker().len(), 1);
        assert_eq!(&dev.stacker()[0][..7], b"PUNCHED");
    }

    #[test]
    fn empty_hopper_status_re_presents_until_sensed() {
        let mut dev = CardReaderPunch::new(0x00C, vec![]);
        dev.start(command::READ);
        let status = dev.start(command::PUNCH);
        assert!(status.unit_check, "stacked INTERV re-presented over PUNCH");
        assert_eq!(dev.sense(), sense_bit::INTERV);
        dev.start(command::SENSE);
        let status = dev.start(command::PUNCH);
        assert!(!status.unit_check);
    }
}
