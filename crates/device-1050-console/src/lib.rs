//! IBM 1050 console: keyboard input events and typewriter output.
//!
//! The keyboard side is host-driven (an operator types a line) rather than
//! device-timed, so [`Console1050::key_in`] queues a line for the next read
//! command instead of being scheduled on the event queue the way printer
//! and tape motion are.

use s360_channel::{Device, InitialStatus, StackedStatus};
use std::collections::VecDeque;

mod command {
    pub const TEST_IO: u8 = 0x00;
    pub const WRITE: u8 = 0x01;
    pub const READ: u8 = 0x02;
    pub const SENSE: u8 = 0x04;
}

pub mod sense_bit {
    pub const CMDREJ: u8 = 0b1000_0000;
    pub const INTERV: u8 = 0b0100_0000;
    pub const BUSCHK: u8 = 0b0010_0000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Reading,
    Writing,
    Sensing,
}

pub struct Console1050 {
    address: u16,
    input_lines: VecDeque<Vec<u8>>,
    current_input: VecDeque<u8>,
    typed: Vec<String>,
    write_buf: Vec<u8>,
    mode: Mode,
    sense: u8,
    stacked: StackedStatus,
}

impl Console1050 {
    #[must_use]
    pub fn new(address: u16) -> Self {
        Self {
            address,
            input_lines: VecDeque::new(),
            current_input: VecDeque::new(),
            typed: Vec::new(),
            write_buf: Vec::new(),
            mode: Mode::Idle,
            sense: 0,
            stacked: StackedStatus::new(),
        }
    }

    /// Operator keys in one line (already EBCDIC-encoded by the caller).
    pub fn key_in(&mut self, line: Vec<u8>) {
        self.input_lines.push_back(line);
    }

    #[must_use]
    pub fn typed_lines(&self) -> &[String] {
        &self.typed
    }

    fn finish_write(&mut self) {
        let text: String = self
            .write_buf
            .iter()
            .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '.' })
            .collect();
        self.typed.push(text);
        self.write_buf.clear();
    }
}

impl Device for Console1050 {
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
        self.sense = 0;
        match command {
            command::TEST_IO => InitialStatus::default(),
            command::SENSE => {
                self.mode = Mode::Sensing;
                self.stacked.take();
                InitialStatus::default()
            }
            command::READ => match self.input_lines.pop_front() {
                Some(line) => {
                    self.current_input = line.into();
                    self.mode = Mode::Reading;
                    InitialStatus::default()
                }
                None => {
                    self.sense = sense_bit::INTERV;
                    self.stacked.push(self.sense);
                    InitialStatus {
                        unit_check: true,
                        ..InitialStatus::default()
                    }
                }
            },
            command::WRITE => {
                self.write_buf.clear();
                self.mode = Mode::Writing;
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
        match self.mode {
            Mode::Reading => self.current_input.pop_front(),
            Mode::Sensing => {
                self.mode = Mode::Idle;
                Some(self.sense)
            }
            _ => None,
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if self.mode == Mode::Writing {
            self.write_buf.push(byte);
            if byte == 0x25 {
                // EBCDIC LF: end of line
                self.finish_write();
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
        self.current_input.clear();
        self.write_buf.clear();
        self.sense = 0;
        self.stacked.take();
    }
}
