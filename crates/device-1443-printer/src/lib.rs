//! IBM 1443 line printer: the worked device-state-machine example.
//!
//! States `IDLE, SEL, CMD, INIT_STAT, OPR, REQ, DATA_O, DATA_I, DATA_END,
//! END, STACK{,SEL,CMD,STA,HLD}, WAIT` collapse here to the operation-level
//! [`s360_channel::Device`] seam: `start`/`write_byte` play the role of
//! `SEL`/`CMD`/`DATA_O`, and [`Printer1443::advance_carriage`] plays
//! `DATA_END`/printing. The forms-control buffer and channel-9/12 reporting
//! follow the 1443's carriage-control semantics directly.

pub mod fcb;

use fcb::Fcb;
use s360_channel::{Device, InitialStatus, StackedStatus};
use s360_core::Ticks;

pub mod sense_bit {
    pub const CMDREJ: u8 = 0b1000_0000;
    pub const INTERV: u8 = 0b0100_0000;
    pub const BUSCHK: u8 = 0b0010_0000;
    pub const EQUCHK: u8 = 0b0001_0000;
    pub const DATCHK: u8 = 0b0000_0100;
    pub const CHAN9: u8 = 0b0000_0001;
}

const MAX_COLUMNS: usize = 132;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Writing,
}

pub struct Printer1443 {
    address: u16,
    fcb: Fcb,
    line_buffer: Vec<u8>,
    mode: Mode,
    sense: u8,
    lines_printed: Vec<String>,
    unit_exception: bool,
    stacked: StackedStatus,
}

impl Printer1443 {
    #[must_use]
    pub fn new(address: u16, fcb: Fcb) -> Self {
        Self {
            address,
            fcb,
            line_buffer: Vec::new(),
            mode: Mode::Idle,
            sense: 0,
            lines_printed: Vec::new(),
            unit_exception: false,
            stacked: StackedStatus::new(),
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines_printed
    }

    /// Whether the last carriage-control operation skipped over a
    /// channel-12 (forms-end) line ("UNITEXP on channel 12").
    /// Consumed (reset) on read, matching unit-status style latching.
    pub fn take_unit_exception(&mut self) -> bool {
        std::mem::replace(&mut self.unit_exception, false)
    }

    fn finish_line(&mut self) {
        let text: String = self
            .line_buffer
            .iter()
            .map(|&b| ebcdic_to_ascii(b))
            .collect();
        self.lines_printed.push(text);
        self.line_buffer.clear();
    }

    /// Carriage control: `space_n` advances at most 3 lines; `skip_channel`
    /// advances until a line whose FCB entry has that channel bit set.
    fn advance_carriage(&mut self, command: u8) -> InitialStatus {
        let upper = command >> 3;
        let lines_moved;
        if upper & 0x01 != 0 {
            let n = (upper >> 1) & 0x03;
            if n == 0 || n > 3 {
                self.sense = sense_bit::CMDREJ;
                self.stacked.push(self.sense);
                return InitialStatus {
                    unit_check: true,
                    ..InitialStatus::default()
                };
            }
            for _ in 0..n {
                self.fcb.advance_line();
            }
            lines_moved = u64::from(n);
        } else {
            let channel = upper >> 1;
            if channel == 0 || channel > 12 {
                self.sense = sense_bit::CMDREJ;
                self.stacked.push(self.sense);
                return InitialStatus {
                    unit_check: true,
                    ..InitialStatus::default()
                };
            }
            let mut count = 0u64;
            let mut found = false;
            for _ in 0..Fcb::FORM_LENGTH {
                self.fcb.advance_line();
                count += 1;
                if self.fcb.current_mask() & (1 << (channel - 1)) != 0 {
                    found = true;
                    break;
                }
            }
            if channel == 9 && found {
                self.sense |= sense_bit::CHAN9;
            }
            if channel == 12 && found {
                self.unit_exception = true;
            }
            lines_moved = count;
        }
        // Carriage motion takes one tick per line; device-end is posted
        // once the form has actually advanced that far.
        InitialStatus {
            completion_delay: Ticks::new(lines_moved),
            ..InitialStatus::default()
        }
    }
}

fn ebcdic_to_ascii(byte: u8) -> char {
    match byte {
        0x40 => ' ',
        0xC1..=0xC9 => (b'A' + (byte - 0xC1)) as char,
        0xF0..=0xF9 => (b'0' + (byte - 0xF0)) as char,
        _ => '?',
    }
}

mod command {
    pub const TEST_IO: u8 = 0x00;
    pub const WRITE: u8 = 0x01;
    pub const CARRIAGE_CONTROL: u8 = 0x03;
    pub const SENSE: u8 = 0x04;
}

impl Device for Printer1443 {
    fn address(&self) -> u16 {
        self.address
    }

    fn start(&mut self, command: u8) -> InitialStatus {
        if let Some(sense) = self.stacked.pending() {
            if command & 0x07 != command::SENSE && command != command::TEST_IO {
                self.sense = sense;
                return InitialStatus {
                    unit_check: true,
                    ..InitialStatus::default()
                };
            }
        }
        match command & 0x07 {
            _ if command == command::TEST_IO => InitialStatus::default(),
            c if c == command::WRITE => {
                self.sense = 0;
                self.line_buffer.clear();
                self.mode = Mode::Writing;
                InitialStatus::default()
            }
            c if c == command::CARRIAGE_CONTROL => {
                if self.mode == Mode::Writing {
                    self.finish_line();
                }
                self.mode = Mode::Idle;
                self.advance_carriage(command)
            }
            c if c == command::SENSE => {
                self.stacked.take();
                InitialStatus::default()
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
        if self.sense != 0 {
            return Some(self.sense);
        }
        None
    }

    fn write_byte(&mut self, byte: u8) {
        if self.mode == Mode::Writing && self.line_buffer.len() < MAX_COLUMNS {
            self.line_buffer.push(byte);
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
        self.line_buffer.clear();
        self.sense = 0;
        self.stacked.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_space_after_produces_one_line() {
        let mut dev = Printer1443::new(0x00E, Fcb::single_spaced());
        dev.start(command::WRITE);
        for b in [0xC1, 0xC2, 0xC3] {
            dev.write_byte(b);
        }
        let space_one_line = command::CARRIAGE_CONTROL | (3 << 3);
        dev.start(space_one_line);
        assert_eq!(dev.lines(), ["ABC"]);
    }

    #[test]
    fn skip_to_channel_1_advances_to_top_of_form() {
        let mut dev = Printer1443::new(0x00E, Fcb::single_spaced());
        dev.start(command::WRITE);
        dev.write_byte(0xC1);
        let skip_to_channel_1 = (1u8 << 4) | command::CARRIAGE_CONTROL;
        dev.start(skip_to_channel_1);
        assert_eq!(dev.fcb.current_line(), 0);
        assert!(dev.sense() & sense_bit::CMDREJ == 0);
    }

    #[test]
    fn rejected_command_stacks_status_until_sensed() {
        let mut dev = Printer1443::new(0x00E, Fcb::single_spaced());
        let bad_space = command::CARRIAGE_CONTROL | (0 << 3); // n == 0, rejected
        let status = dev.start(bad_space);
        assert!(status.unit_check);
        assert_eq!(dev.sense(), sense_bit::CMDREJ);

        // A new, otherwise-valid WRITE is refused: stacked status re-presents.
        let status = dev.start(command::WRITE);
        assert!(status.unit_check, "stacked status re-presented instead of starting WRITE");
        assert_eq!(dev.sense(), sense_bit::CMDREJ);

        // SENSE drains it; the device accepts new work afterward.
        dev.start(command::SENSE);
        let status = dev.start(command::WRITE);
        assert!(!status.unit_check);
    }
}
