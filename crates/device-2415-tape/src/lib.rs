//! IBM 2415 magnetic tape drive: SIMH-container-backed records, tape marks,
//! backspace/forward-space.
//!
//! Grounded on the reel/record model implied by the SIMH tape container
//! format (length-prefixed/suffixed records, 0 = tape mark) and on the
//! per-device timing discipline the printer worked example establishes in
//! the printer worked example's closing note ("start/stop latency, inter-record gap ... tape mark detection,
//! backspace/forward-space file").

use s360_channel::{Device, InitialStatus, StackedStatus};
use s360_core::Ticks;
use std::collections::VecDeque;

/// Start/stop latency for one record's worth of tape motion.
const RECORD_MOTION: Ticks = Ticks::new(6);
/// A full rewind takes much longer than a single record's start/stop.
const REWIND_MOTION: Ticks = Ticks::new(20);

pub mod sense_byte_1 {
    pub const CMDREJ: u8 = 0b1000_0000;
    pub const INTERV: u8 = 0b0100_0000;
    pub const BUSCHK: u8 = 0b0010_0000;
    pub const EQUCHK: u8 = 0b0001_0000;
    pub const DATACHK: u8 = 0b0000_1000;
    pub const OVERRUN: u8 = 0b0000_0100;
    pub const WORD_CNT_9: u8 = 0b0000_0010;
    pub const CONV_CHK: u8 = 0b0000_0001;
}

pub mod sense_byte_2 {
    pub const NOISE: u8 = 0b1000_0000;
    pub const CRC: u8 = 0b0100_0000;
    pub const TAPE_MARK: u8 = 0b0010_0000;
}

mod command {
    pub const TEST_IO: u8 = 0x00;
    pub const WRITE: u8 = 0x01;
    pub const READ: u8 = 0x02;
    pub const SENSE: u8 = 0x04;
    pub const REWIND: u8 = 0x07;
    pub const WRITE_TAPE_MARK: u8 = 0x1F;
    pub const BACKSPACE_RECORD: u8 = 0x27;
    pub const FORWARD_SPACE_RECORD: u8 = 0x37;
}

/// One logical entry on the simulated reel.
#[derive(Debug, Clone)]
pub enum Record {
    Data(Vec<u8>),
    TapeMark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Reading,
    Writing,
    Sensing,
}

pub struct Tape2415 {
    address: u16,
    reel: Vec<Record>,
    position: usize,
    read_buf: VecDeque<u8>,
    write_buf: Vec<u8>,
    mode: Mode,
    sense1: u8,
    sense2: u8,
    stacked: StackedStatus,
}

impl Tape2415 {
    #[must_use]
    pub fn new(address: u16, reel: Vec<Record>) -> Self {
        Self {
            address,
            reel,
            position: 0,
            read_buf: VecDeque::new(),
            write_buf: Vec::new(),
            mode: Mode::Idle,
            sense1: 0,
            sense2: 0,
            stacked: StackedStatus::new(),
        }
    }

    #[must_use]
    pub fn written_records(&self) -> &[Record] {
        &self.reel
    }

    /// Commit a pending `WRITE`'s accumulated bytes as one `Record::Data` on
    /// the reel. Called automatically when a new command starts while a
    /// write is in progress; exposed so a caller can flush the final write
    /// of a channel program explicitly.
    pub fn finish_write(&mut self) {
        if self.mode == Mode::Writing {
            let bytes = std::mem::take(&mut self.write_buf);
            self.reel.push(Record::Data(bytes));
            self.position += 1;
            self.mode = Mode::Idle;
        }
    }
}

impl Device for Tape2415 {
    fn address(&self) -> u16 {
        self.address
    }

    fn start(&mut self, command: u8) -> InitialStatus {
        if let Some(sense) = self.stacked.pending() {
            if command != command::SENSE && command != command::TEST_IO {
                self.sense1 = sense;
                return InitialStatus {
                    unit_check: true,
                    ..InitialStatus::default()
                };
            }
        }
        self.finish_write();
        self.sense1 = 0;
        self.sense2 = 0;
        match command {
            command::TEST_IO => InitialStatus::default(),
            command::SENSE => {
                self.mode = Mode::Sensing;
                self.stacked.take();
                InitialStatus::default()
            }
            command::REWIND => {
                self.position = 0;
                InitialStatus {
                    completion_delay: REWIND_MOTION,
                    ..InitialStatus::default()
                }
            }
            command::BACKSPACE_RECORD => {
                self.position = self.position.saturating_sub(1);
                InitialStatus {
                    completion_delay: RECORD_MOTION,
                    ..InitialStatus::default()
                }
            }
            command::FORWARD_SPACE_RECORD => {
                self.position = (self.position + 1).min(self.reel.len());
                InitialStatus {
                    completion_delay: RECORD_MOTION,
                    ..InitialStatus::default()
                }
            }
            command::WRITE_TAPE_MARK => {
                if self.position < self.reel.len() {
                    self.reel[self.position] = Record::TapeMark;
                } else {
                    self.reel.push(Record::TapeMark);
                }
                self.position += 1;
                InitialStatus {
                    completion_delay: RECORD_MOTION,
                    ..InitialStatus::default()
                }
            }
            command::READ => {
                if self.position >= self.reel.len() {
                    self.sense1 = sense_byte_1::INTERV;
                    self.stacked.push(self.sense1);
                    return InitialStatus {
                        unit_check: true,
                        ..InitialStatus::default()
                    };
                }
                match &self.reel[self.position] {
                    Record::TapeMark => {
                        self.sense2 = sense_byte_2::TAPE_MARK;
                        self.position += 1;
                        // sense2, not sense1, carries this condition; sense()
                        // only exposes sense1, so there is nothing meaningful
                        // to stack through the channel-visible sense byte.
                        InitialStatus {
                            unit_check: true,
                            ..InitialStatus::default()
                        }
                    }
                    Record::Data(bytes) => {
                        self.read_buf = bytes.iter().copied().collect();
                        self.position += 1;
                        self.mode = Mode::Reading;
                        InitialStatus {
                            completion_delay: RECORD_MOTION,
                            ..InitialStatus::default()
                        }
                    }
                }
            }
            command::WRITE => {
                self.write_buf.clear();
                self.mode = Mode::Writing;
                InitialStatus {
                    completion_delay: RECORD_MOTION,
                    ..InitialStatus::default()
                }
            }
            _ => {
                self.sense1 = sense_byte_1::CMDREJ;
                self.stacked.push(self.sense1);
                InitialStatus {
                    unit_check: true,
                    ..InitialStatus::default()
                }
            }
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        match self.mode {
            Mode::Reading => self.read_buf.pop_front(),
            Mode::Sensing => {
                self.mode = Mode::Idle;
                Some(self.sense1)
            }
            _ => None,
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if self.mode == Mode::Writing {
            self.write_buf.push(byte);
        }
    }

    fn sense(&self) -> u8 {
        self.sense1
    }

    fn poll(&mut self, _now: u64) -> Option<u8> {
        None
    }

    fn reset(&mut self) {
        self.mode = Mode::Idle;
        self.read_buf.clear();
        self.write_buf.clear();
        self.sense1 = 0;
        self.sense2 = 0;
        self.stacked.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_data_record_then_hits_tape_mark() {
        let mut dev = Tape2415::new(0x180, vec![Record::Data(vec![1, 2, 3]), Record::TapeMark]);
        let status = dev.start(command::READ);
        assert!(!status.unit_check);
        let mut out = Vec::new();
        while let Some(b) = dev.read_byte() {
            out.push(b);
        }
        assert_eq!(out, vec![1, 2, 3]);

        let status = dev.start(command::READ);
        assert!(status.unit_check);
        assert_eq!(dev.sense2, sense_byte_2::TAPE_MARK);
    }

    #[test]
    fn backspace_then_forward_space_returns_to_same_record() {
        let mut dev = Tape2415::new(0x180, vec![Record::Data(vec![9]), Record::Data(vec![8])]);
        dev.start(command::READ);
        dev.start(command::BACKSPACE_RECORD);
        assert_eq!(dev.position, 0);
        dev.start(command::FORWARD_SPACE_RECORD);
        assert_eq!(dev.position, 1);
    }

    #[test]
    fn write_is_committed_to_the_reel_on_the_next_start() {
        let mut dev = Tape2415::new(0x180, vec![]);
        dev.start(command::WRITE);
        for b in [0xC1, 0xC2, 0xC3] {
            dev.write_byte(b);
        }
        assert!(dev.written_records().is_empty(), "not yet committed");
        dev.start(command::SENSE);
        match &dev.written_records()[0] {
            Record::Data(bytes) => assert_eq!(bytes, &[0xC1, 0xC2, 0xC3]),
            Record::TapeMark => panic!("expected a data record"),
        }
    }

    #[test]
    fn finish_write_commits_without_a_following_start() {
        let mut dev = Tape2415::new(0x180, vec![]);
        dev.start(command::WRITE);
        dev.write_byte(0xF1);
        dev.finish_write();
        assert_eq!(dev.written_records().len(), 1);
    }

    #[test]
    fn read_past_end_of_reel_is_intervention_required() {
        let mut dev = Tape2415::new(0x180, vec![]);
        let status = dev.start(command::READ);
        assert!(status.unit_check);
        assert_eq!(dev.sense(), sense_byte_1::INTERV);
    }

    #[test]
    fn intervention_required_stacks_until_sensed() {
        let mut dev = Tape2415::new(0x180, vec![]);
        dev.start(command::READ);
        let status = dev.start(command::REWIND);
        assert!(status.unit_check, "stacked INTERV re-presented over REWIND");
        assert_eq!(dev.sense(), sense_byte_1::INTERV);
        dev.start(command::SENSE);
        let status = dev.start(command::REWIND);
        assert!(!status.unit_check);
    }
}
