//! Decoded instruction formats and the opcode dispatch table.
//!
//! The real 2030 drives every instruction through a bit-vector ROS word
//! (sheet letters A..W) stepped one micro-cycle at a time. The microcode
//! listings themselves are not available to ground this engine on: what
//! *is* available (`cpu2050/cpu2065` engines, `fp30.c`, `translate.c`) is
//! a per-instruction functional breakdown. So this table is a pragmatic
//! middle ground: one [`RosWord`] per architectural instruction, carrying
//! the decoded format and a dispatch index, stepped by
//! [`crate::engine::MicroEngine`] in the same single-threaded,
//! one-result-per-call style other flat opcode-dispatch tables use.
//! See DESIGN.md for this resolved open question.

/// Instruction formats (PrincOps naming).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Rr,
    Rx,
    Rs,
    Si,
    Ss,
}

impl Format {
    #[must_use]
    pub const fn length(self) -> u8 {
        match self {
            Format::Rr => 2,
            Format::Rx | Format::Rs | Format::Si => 4,
            Format::Ss => 6,
        }
    }
}

/// One decoded instruction: the fields common across formats. Unused
/// fields for a given format are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decoded {
    pub opcode: u8,
    pub r1: u8,
    pub r2: u8,
    pub b1: u8,
    pub d1: u16,
    pub b2: u8,
    pub d2: u16,
    pub length: u8,
    /// Raw second byte of an RR-format instruction, used as the full
    /// 8-bit immediate for instructions like SVC whose "registers" are
    /// really a single 8-bit code.
    pub imm: u8,
}

/// Opcodes this engine implements. Named by mnemonic, not by a numeric
/// micro-order table, since the grounding source gives functional not
/// bit-level detail for the 2030 specifically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // RR
    Lr,
    Ar,
    Sr,
    Nr,
    Or,
    Xr,
    Cr,
    Mr,
    Dr,
    Balr,
    Bctr,
    Bcr,
    Svc,
    // RX
    La,
    L,
    St,
    Bc,
    Bal,
    Bct,
    N,
    O,
    X,
    C,
    Le,
    Ste,
    Ae,
    Se,
    Cvb,
    Cvd,
    // RS
    Sla,
    Sra,
    Sll,
    Srl,
    // SS
    Trt,
    Ed,
    Ap,
    Zap,
    Unknown(u8),
}

#[must_use]
pub fn format_of(opcode: u8) -> Format {
    match opcode {
        0x18 | 0x1A | 0x1B | 0x14 | 0x16 | 0x17 | 0x19 | 0x1C | 0x1D | 0x05 | 0x06 | 0x07
        | 0x0A => Format::Rr,
        0x41 | 0x58 | 0x50 | 0x47 | 0x45 | 0x46 | 0x54 | 0x56 | 0x57 | 0x59 | 0x78 | 0x70
        | 0x7A | 0x7B | 0x4F | 0x4E => Format::Rx,
        0x88 | 0x89 | 0x8A | 0x8B => Format::Rs,
        0xDC | 0xDE | 0xFA | 0xF8 => Format::Ss,
        _ => Format::Rx,
    }
}

#[must_use]
pub fn decode_op(opcode: u8) -> Op {
    match opcode {
        0x18 => Op::Lr,
        0x1A => Op::Ar,
        0x1B => Op::Sr,
        0x14 => Op::Nr,
        0x16 => Op::Or,
        0x17 => Op::Xr,
        0x19 => Op::Cr,
        0x1C => Op::Mr,
        0x1D => Op::Dr,
        0x05 => Op::Balr,
        0x06 => Op::Bctr,
        0x07 => Op::Bcr,
        0x0A => Op::Svc,
        0x41 => Op::La,
        0x58 => Op::L,
        0x50 => Op::St,
        0x47 => Op::Bc,
        0x45 => Op::Bal,
        0x46 => Op::Bct,
        0x54 => Op::N,
        0x56 => Op::O,
        0x57 => Op::X,
        0x59 => Op::C,
        0x78 => Op::Le,
        0x70 => Op::Ste,
        0x7A => Op::Ae,
        0x7B => Op::Se,
        0x4F => Op::Cvb,
        0x4E => Op::Cvd,
        0x88 => Op::Srl,
        0x89 => Op::Sll,
        0x8A => Op::Sra,
        0x8B => Op::Sla,
        0xDC => Op::Trt,
        0xDE => Op::Ed,
        0xFA => Op::Ap,
        0xF8 => Op::Zap,
        other => Op::Unknown(other),
    }
}

/// Decode one instruction's bytes per its format. `bytes` must contain at
/// least the format's [`Format::length`] bytes.
#[must_use]
pub fn decode(bytes: &[u8]) -> Decoded {
    let opcode = bytes[0];
    match format_of(opcode) {
        Format::Rr => Decoded {
            opcode,
            r1: bytes[1] >> 4,
            r2: bytes[1] & 0x0F,
            length: 2,
            imm: bytes[1],
            ..Decoded::default()
        },
        Format::Rx => {
            let r1 = bytes[1] >> 4;
            let x2 = bytes[1] & 0x0F;
            let b2 = bytes[2] >> 4;
            let d2 = (u16::from(bytes[2] & 0x0F) << 8) | u16::from(bytes[3]);
            Decoded {
                opcode,
                r1,
                r2: x2,
                b2,
                d2,
                length: 4,
                ..Decoded::default()
            }
        }
        Format::Rs => {
            let r1 = bytes[1] >> 4;
            let r2 = bytes[1] & 0x0F;
            let b2 = bytes[2] >> 4;
            let d2 = (u16::from(bytes[2] & 0x0F) << 8) | u16::from(bytes[3]);
            Decoded {
                opcode,
                r1,
                r2,
                b2,
                d2,
                length: 4,
                ..Decoded::default()
            }
        }
        Format::Si => {
            let b1 = bytes[2] >> 4;
            let d1 = (u16::from(bytes[2] & 0x0F) << 8) | u16::from(bytes[3]);
            Decoded {
                opcode,
                r1: bytes[1],
                b1,
                d1,
                length: 4,
                ..Decoded::default()
            }
        }
        Format::Ss => {
            let b1 = bytes[2] >> 4;
            let d1 = (u16::from(bytes[2] & 0x0F) << 8) | u16::from(bytes[3]);
            let b2 = bytes[4] >> 4;
            let d2 = (u16::from(bytes[4] & 0x0F) << 8) | u16::from(bytes[5]);
            Decoded {
                opcode,
                r1: bytes[1],
                b1,
                d1,
                b2,
                d2,
                length: 6,
                ..Decoded::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rr_format() {
        let d = decode(&[0x1A, 0x12]);
        assert_eq!(d.r1, 1);
        assert_eq!(d.r2, 2);
        assert_eq!(d.length, 2);
    }

    #[test]
    fn decodes_rx_format() {
        let d = decode(&[0x58, 0x70, 0x55, 0x00]);
        assert_eq!(d.r1, 7);
        assert_eq!(d.b2, 5);
        assert_eq!(d.d2, 0x500);
        assert_eq!(d.length, 4);
    }

    #[test]
    fn cvb_and_cvd_are_rx_not_ss() {
        assert_eq!(format_of(0x4F), Format::Rx);
        assert_eq!(format_of(0x4E), Format::Rx);
    }

    #[test]
    fn decodes_ss_format() {
        // ED D1(L,B1),D2(B2): pattern at B1/D1, source at B2/D2.
        let d = decode(&[0xDE, 0x0C, 0x51, 0x00, 0x62, 0x00]);
        assert_eq!(d.b1, 5);
        assert_eq!(d.b2, 6);
        assert_eq!(d.length, 6);
    }

    #[test]
    fn decodes_rs_format_shift() {
        // SLA 3,5(0): shift GPR 3 left by the displacement, no base/index.
        let d = decode(&[0x8B, 0x30, 0x00, 0x05]);
        assert_eq!(d.r1, 3);
        assert_eq!(d.b2, 0);
        assert_eq!(d.d2, 5);
        assert_eq!(d.length, 4);
    }
}
