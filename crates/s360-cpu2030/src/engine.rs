//! The micro-engine: fetch, decode, execute, one instruction per [`MicroEngine::step`].
//!
//! Grounded on `cpu2050.c`/`cpu2065.c`'s instruction-level execute loop
//! (the fine-grained ROS per-cycle stepping described for the 2030 has no
//! available microcode listing to decode against — see `ros.rs`'s module
//! doc comment and DESIGN.md).

use crate::decimal;
use crate::float::ShortFloat;
use crate::local_store::LocalStore;
use crate::psw::{mask_bit, Psw};
use crate::ros::{decode, decode_op, Op};
use crate::store::{ProgramCheck, Store};

/// What happened after a call to [`MicroEngine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// A program check was raised; the old PSW (pre-trap) is returned so
    /// the caller can store it at the low-memory old-PSW slot.
    Trapped { old_psw: Psw, check: ProgramCheck },
    /// SVC was executed; `code` is the SVC number.
    Supervisor { old_psw: Psw, code: u8 },
}

pub struct MicroEngine {
    pub store: Store,
    pub local: LocalStore,
    pub psw: Psw,
}

impl MicroEngine {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            store,
            local: LocalStore::new(),
            psw: Psw::new(),
        }
    }

    fn effective_addr(&self, base: u8, index: u8, disp: u16) -> u32 {
        let b = if base == 0 { 0 } else { self.local.gpr(base) };
        let x = if index == 0 { 0 } else { self.local.gpr(index) };
        (b.wrapping_add(x).wrapping_add(u32::from(disp))) & 0x00FF_FFFF
    }

    /// RS-format shift count: base register (if any) plus displacement,
    /// truncated to 6 bits the way the architecture truncates a shift
    /// amount regardless of how large the computed address-style field is.
    fn shift_count(&self, d: &crate::ros::Decoded) -> u32 {
        let base = if d.b2 == 0 { 0 } else { self.local.gpr(d.b2) };
        base.wrapping_add(u32::from(d.d2)) & 0x3F
    }

    /// Fetch, decode, and execute one instruction. On a program check the
    /// PSW's IA is left at the *next-sequential* address (the architectural
    /// old-PSW IA for the trap) and the check is returned instead of being
    /// silently applied; callers drive the interrupt-vectoring themselves.
    pub fn step(&mut self) -> Result<StepOutcome, ProgramCheck> {
        let key = self.psw.key;
        let raw = [
            self.store.read_byte(self.psw.ia, key)?,
            self.store
                .read_byte(self.psw.ia.wrapping_add(1), key)
                .unwrap_or(0),
            self.store
                .read_byte(self.psw.ia.wrapping_add(2), key)
                .unwrap_or(0),
            self.store
                .read_byte(self.psw.ia.wrapping_add(3), key)
                .unwrap_or(0),
            self.store
                .read_byte(self.psw.ia.wrapping_add(4), key)
                .unwrap_or(0),
            self.store
                .read_byte(self.psw.ia.wrapping_add(5), key)
                .unwrap_or(0),
        ];
        let d = decode(&raw);
        let op = decode_op(d.opcode);
        let next_ia = self.psw.ia.wrapping_add(u32::from(d.length));

        let old_psw_for_trap = |engine: &Self, next_ia: u32| -> Psw {
            let mut p = engine.psw;
            p.ia = next_ia;
            p
        };

        let result = self.execute(op, &d, key, next_ia);
        match result {
            Ok(branch_addr) => {
                self.psw.ia = branch_addr.unwrap_or(next_ia);
                if let Op::Svc = op {
                    let old = old_psw_for_trap(self, next_ia);
                    return Ok(StepOutcome::Supervisor {
                        old_psw: old,
                        code: d.imm,
                    });
                }
                Ok(StepOutcome::Continue)
            }
            Err(check) => {
                let old = old_psw_for_trap(self, next_ia);
                if check.maskable() && self.mask_suppresses(check) {
                    self.psw.ia = next_ia;
                    return Ok(StepOutcome::Continue);
                }
                Ok(StepOutcome::Trapped {
                    old_psw: old,
                    check,
                })
            }
        }
    }

    fn mask_suppresses(&self, check: ProgramCheck) -> bool {
        match check {
            ProgramCheck::FixedOverflow => self.psw.masks(mask_bit::FIXED_OVERFLOW),
            ProgramCheck::DecimalOverflow => self.psw.masks(mask_bit::DECIMAL_OVERFLOW),
            ProgramCheck::ExponentUnderflow => self.psw.masks(mask_bit::EXPONENT_UNDERFLOW),
            ProgramCheck::Significance => self.psw.masks(mask_bit::SIGNIFICANCE),
            _ => false,
        }
    }

    /// Execute one decoded instruction. Returns the branch target address
    /// when control transferred, or `None` for the caller to fall through
    /// to the next-sequential instruction.
    fn execute(
        &mut self,
        op: Op,
        d: &crate::ros::Decoded,
        key: u8,
        next_ia: u32,
    ) -> Result<Option<u32>, ProgramCheck> {
        match op {
            Op::Lr => {
                let v = self.local.gpr(d.r2);
                self.local.set_gpr(d.r1, v);
                Ok(None)
            }
            Op::Ar => {
                let a = self.local.gpr(d.r1) as i32;
                let b = self.local.gpr(d.r2) as i32;
                let (sum, overflow) = a.overflowing_add(b);
                self.local.set_gpr(d.r1, sum as u32);
                self.psw.cc = cc_of(sum, overflow);
                if overflow {
                    return Err(ProgramCheck::FixedOverflow);
                }
                Ok(None)
            }
            Op::Sr => {
                let a = self.local.gpr(d.r1) as i32;
                let b = self.local.gpr(d.r2) as i32;
                let (diff, overflow) = a.overflowing_sub(b);
                self.local.set_gpr(d.r1, diff as u32);
                self.psw.cc = cc_of(diff, overflow);
                if overflow {
                    return Err(ProgramCheck::FixedOverflow);
                }
                Ok(None)
            }
            Op::Nr => {
                let v = self.local.gpr(d.r1) & self.local.gpr(d.r2);
                self.local.set_gpr(d.r1, v);
                self.psw.cc = u32::from(v != 0);
                Ok(None)
            }
            Op::Or => {
                let v = self.local.gpr(d.r1) | self.local.gpr(d.r2);
                self.local.set_gpr(d.r1, v);
                self.psw.cc = u32::from(v != 0);
                Ok(None)
            }
            Op::Xr => {
                let v = self.local.gpr(d.r1) ^ self.local.gpr(d.r2);
                self.local.set_gpr(d.r1, v);
                self.psw.cc = u32::from(v != 0);
                Ok(None)
            }
            Op::Cr => {
                let a = self.local.gpr(d.r1) as i32;
                let b = self.local.gpr(d.r2) as i32;
                self.psw.cc = compare_cc(a, b);
                Ok(None)
            }
            Op::Mr => {
                let r1 = d.r1 & 0xE;
                let multiplicand = i64::from(self.local.gpr(r1 + 1) as i32);
                let multiplier = i64::from(self.local.gpr(d.r2) as i32);
                let product = multiplicand * multiplier;
                self.local.set_gpr(r1, (product >> 32) as u32);
                self.local.set_gpr(r1 + 1, product as u32);
                Ok(None)
            }
            Op::Dr => {
                let r1 = d.r1 & 0xE;
                let dividend =
                    (i64::from(self.local.gpr(r1) as i32) << 32) | i64::from(self.local.gpr(r1 + 1));
                let divisor = i64::from(self.local.gpr(d.r2) as i32);
                if divisor == 0 {
                    return Err(ProgramCheck::FixedDivide);
                }
                let quotient = dividend / divisor;
                let remainder = dividend % divisor;
                if quotient > i64::from(i32::MAX) || quotient < i64::from(i32::MIN) {
                    return Err(ProgramCheck::FixedDivide);
                }
                self.local.set_gpr(r1, remainder as u32);
                self.local.set_gpr(r1 + 1, quotient as u32);
                Ok(None)
            }
            Op::Balr => {
                let target = if d.r2 == 0 {
                    None
                } else {
                    Some(self.local.gpr(d.r2))
                };
                self.local.set_gpr(d.r1, next_ia);
                Ok(target)
            }
            Op::Bctr => {
                let v = (self.local.gpr(d.r1) as i32).wrapping_sub(1);
                self.local.set_gpr(d.r1, v as u32);
                if v != 0 && d.r2 != 0 {
                    Ok(Some(self.local.gpr(d.r2)))
                } else {
                    Ok(None)
                }
            }
            Op::Bcr => {
                if d.r2 != 0 && (d.r1 & (0b1000 >> self.psw.cc)) != 0 {
                    Ok(Some(self.local.gpr(d.r2)))
                } else {
                    Ok(None)
                }
            }
            Op::La => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                self.local.set_gpr(d.r1, addr);
                Ok(None)
            }
            Op::L => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let v = self.store.read_word(addr, key)?;
                self.local.set_gpr(d.r1, v);
                Ok(None)
            }
            Op::St => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let v = self.local.gpr(d.r1);
                self.store.write_word(addr, v, key)?;
                Ok(None)
            }
            Op::N => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let v = self.local.gpr(d.r1) & self.store.read_word(addr, key)?;
                self.local.set_gpr(d.r1, v);
                self.psw.cc = u32::from(v != 0);
                Ok(None)
            }
            Op::O => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let v = self.local.gpr(d.r1) | self.store.read_word(addr, key)?;
                self.local.set_gpr(d.r1, v);
                self.psw.cc = u32::from(v != 0);
                Ok(None)
            }
            Op::X => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let v = self.local.gpr(d.r1) ^ self.store.read_word(addr, key)?;
                self.local.set_gpr(d.r1, v);
                self.psw.cc = u32::from(v != 0);
                Ok(None)
            }
            Op::C => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let a = self.local.gpr(d.r1) as i32;
                let b = self.store.read_word(addr, key)? as i32;
                self.psw.cc = compare_cc(a, b);
                Ok(None)
            }
            Op::Bc => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                if (d.r1 & (0b1000 >> self.psw.cc)) != 0 {
                    Ok(Some(addr))
                } else {
                    Ok(None)
                }
            }
            Op::Bal => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                self.local.set_gpr(d.r1, next_ia);
                Ok(Some(addr))
            }
            Op::Bct => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let v = (self.local.gpr(d.r1) as i32).wrapping_sub(1);
                self.local.set_gpr(d.r1, v as u32);
                if v != 0 {
                    Ok(Some(addr))
                } else {
                    Ok(None)
                }
            }
            Op::Le => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let v = self.store.read_word(addr, key)?;
                self.local.set_fpr(d.r1, v);
                Ok(None)
            }
            Op::Ste => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let v = self.local.fpr(d.r1);
                self.store.write_word(addr, v, key)?;
                Ok(None)
            }
            Op::Ae | Op::Se => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let operand = ShortFloat::from_bits(self.store.read_word(addr, key)?);
                let current = ShortFloat::from_bits(self.local.fpr(d.r1));
                let (result, underflow) = current.add(operand, op == Op::Se);
                self.local.set_fpr(d.r1, result.to_bits());
                self.psw.cc = if result.is_true_zero() {
                    0
                } else if result.negative {
                    1
                } else {
                    2
                };
                if underflow {
                    return Err(ProgramCheck::ExponentUnderflow);
                }
                Ok(None)
            }
            Op::Cvb => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let bytes: [u8; 8] = self
                    .store
                    .read_raw(addr, 8)?
                    .try_into()
                    .map_err(|_| ProgramCheck::Specification)?;
                let value = decimal::cvb(&bytes)?;
                self.local.set_gpr(d.r1, value as u32);
                Ok(None)
            }
            Op::Cvd => {
                let addr = self.effective_addr(d.b2, d.r2, d.d2);
                let value = self.local.gpr(d.r1) as i32;
                let (digits, negative) = decimal::cvd(value);
                let packed = decimal::pack(&digits, negative, 8);
                self.store.write_raw(addr, &packed)?;
                Ok(None)
            }
            Op::Sll => {
                let count = self.shift_count(d);
                let v = if count >= 32 {
                    0
                } else {
                    self.local.gpr(d.r1) << count
                };
                self.local.set_gpr(d.r1, v);
                Ok(None)
            }
            Op::Srl => {
                let count = self.shift_count(d);
                let v = if count >= 32 {
                    0
                } else {
                    self.local.gpr(d.r1) >> count
                };
                self.local.set_gpr(d.r1, v);
                Ok(None)
            }
            Op::Sla => {
                let count = self.shift_count(d).min(31);
                let sign = (self.local.gpr(d.r1) as i32) < 0;
                let mut result = self.local.gpr(d.r1) as i32;
                let mut overflow = false;
                for _ in 0..count {
                    let next = result << 1;
                    if (next < 0) != sign {
                        overflow = true;
                    }
                    result = next;
                }
                self.local.set_gpr(d.r1, result as u32);
                self.psw.cc = cc_of(result, overflow);
                if overflow {
                    return Err(ProgramCheck::FixedOverflow);
                }
                Ok(None)
            }
            Op::Sra => {
                let count = self.shift_count(d).min(31);
                let result = (self.local.gpr(d.r1) as i32) >> count;
                self.local.set_gpr(d.r1, result as u32);
                self.psw.cc = cc_of(result, false);
                Ok(None)
            }
            Op::Trt => {
                let source_addr = self.effective_addr(d.b1, 0, d.d1);
                let table_addr = self.effective_addr(d.b2, 0, d.d2);
                let len = u32::from(d.r1) + 1;
                self.psw.cc = 0;
                for i in 0..len {
                    let byte = self.store.read_byte(source_addr + i, key)?;
                    let func = self.store.read_byte(table_addr + u32::from(byte), key)?;
                    if func != 0 {
                        self.local.set_gpr(1, source_addr + i);
                        let r2 = self.local.gpr(2) & 0xFFFF_FF00;
                        self.local.set_gpr(2, r2 | u32::from(func));
                        self.psw.cc = if i + 1 == len { 2 } else { 1 };
                        return Ok(None);
                    }
                }
                Ok(None)
            }
            Op::Ed => {
                let pattern_addr = self.effective_addr(d.b1, 0, d.d1);
                let source_addr = self.effective_addr(d.b2, 0, d.d2);
                let len = u32::from(d.r1) + 1;
                let pattern = self.store.read_raw(pattern_addr, len)?.to_vec();
                let source = self.store.read_raw(source_addr, 8.min(len))?.to_vec();
                let (out, cc) = decimal::edit(&pattern, &source, 0x40);
                self.store.write_raw(pattern_addr, &out)?;
                self.psw.cc = cc;
                Ok(None)
            }
            Op::Ap | Op::Zap => {
                let len1 = (u32::from(d.r1 >> 4)) + 1;
                let len2 = (u32::from(d.r1 & 0x0F)) + 1;
                let addr1 = self.effective_addr(d.b1, 0, d.d1);
                let addr2 = self.effective_addr(d.b2, 0, d.d2);
                let bytes1 = self.store.read_raw(addr1, len1)?.to_vec();
                let (result, negative, cc) = if op == Op::Zap {
                    let (digits, negative) = decimal::unpack(&bytes1)?;
                    let zero = digits.iter().all(|&x| x == 0);
                    (digits, negative, if zero { 0 } else if negative { 1 } else { 2 })
                } else {
                    let bytes2 = self.store.read_raw(addr2, len2)?.to_vec();
                    let (d1, n1) = decimal::unpack(&bytes1)?;
                    let (d2, n2) = decimal::unpack(&bytes2)?;
                    let r = decimal::decimal_add(&d1, n1, &d2, n2);
                    (r.digits, r.negative, r.cc)
                };
                let packed = decimal::pack(&result, negative, len1 as usize);
                self.store.write_raw(addr1, &packed)?;
                self.psw.cc = cc;
                Ok(None)
            }
            Op::Svc => Ok(None),
            Op::Unknown(_) => Err(ProgramCheck::OperationException),
        }
    }
}

/// Condition code for a fixed-point arithmetic result: 3 on overflow
/// regardless of sign, else 0/1/2 for zero/negative/positive.
const fn cc_of(result: i32, overflow: bool) -> u32 {
    if overflow {
        3
    } else if result > 0 {
        2
    } else if result < 0 {
        1
    } else {
        0
    }
}

/// Condition code for a signed compare: 0 equal, 1 first operand low, 2 first operand high.
const fn compare_cc(a: i32, b: i32) -> u32 {
    if a == b {
        0
    } else if a < b {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(size: u32) -> MicroEngine {
        MicroEngine::new(Store::new(size))
    }

    #[test]
    fn ar_overflow_scenario() {
        let mut e = engine_with(4096);
        e.local.set_gpr(1, 0x7FFF_FFFF);
        e.local.set_gpr(2, 0x0000_0001);
        e.psw.program_mask = mask_bit::FIXED_OVERFLOW;
        e.store.write_byte(0, 0x1A, 0).unwrap(); // AR
        e.store.write_byte(1, 0x12, 0).unwrap();
        let outcome = e.step().unwrap();
        assert_eq!(e.local.gpr(1), 0x8000_0000);
        assert_eq!(e.psw.cc, 3);
        match outcome {
            StepOutcome::Trapped { old_psw, check } => {
                assert_eq!(check, ProgramCheck::FixedOverflow);
                assert_eq!(old_psw.ia, 2, "old PSW IA is next-sequential");
            }
            other => panic!("expected trap, got {other:?}"),
        }
    }

    #[test]
    fn ar_overflow_suppressed_without_mask() {
        let mut e = engine_with(4096);
        e.local.set_gpr(1, 0x7FFF_FFFF);
        e.local.set_gpr(2, 1);
        e.store.write_byte(0, 0x1A, 0).unwrap();
        e.store.write_byte(1, 0x12, 0).unwrap();
        let outcome = e.step().unwrap();
        assert_eq!(outcome, StepOutcome::Continue);
        assert_eq!(e.psw.ia, 2);
    }

    #[test]
    fn cvb_scenario_2() {
        let mut e = engine_with(4096);
        e.store.write_raw(0x500, &[0x00, 0x00, 0x00, 0x00]).unwrap();
        e.store.write_raw(0x504, &[0x00, 0x25, 0x59, 0x4F]).unwrap();
        e.local.set_gpr(5, 0);
        // CVB 7,0x500(0,5)
        e.store.write_byte(0, 0x4F, 0).unwrap();
        e.store.write_byte(1, 0x70, 0).unwrap();
        e.store.write_byte(2, 0x55, 0).unwrap();
        e.store.write_byte(3, 0x00, 0).unwrap();
        let outcome = e.step().unwrap();
        assert_eq!(outcome, StepOutcome::Continue);
        assert_eq!(e.local.gpr(7), 25594);
    }

    #[test]
    fn lr_preserves_state_modulo_ia() {
        let mut e = engine_with(4096);
        e.local.set_gpr(3, 0x4242_4242);
        e.store.write_byte(0, 0x18, 0).unwrap();
        e.store.write_byte(1, 0x33, 0).unwrap();
        let before = e.local.gpr(3);
        e.step().unwrap();
        assert_eq!(e.local.gpr(3), before);
        assert_eq!(e.psw.ia, 2);
    }

    #[test]
    fn balr_saves_return_address_and_branches() {
        let mut e = engine_with(4096);
        e.local.set_gpr(9, 0x200);
        e.store.write_byte(0, 0x05, 0).unwrap(); // BALR 8,9
        e.store.write_byte(1, 0x89, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.local.gpr(8), 2, "R1 holds the next-sequential address");
        assert_eq!(e.psw.ia, 0x200);
    }

    #[test]
    fn balr_with_r2_zero_does_not_branch() {
        let mut e = engine_with(4096);
        e.store.write_byte(0, 0x05, 0).unwrap(); // BALR 8,0
        e.store.write_byte(1, 0x80, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.psw.ia, 2);
    }

    #[test]
    fn bc_branches_only_when_mask_matches_cc() {
        let mut e = engine_with(4096);
        e.psw.cc = 2;
        e.local.set_gpr(5, 0x300);
        // BC 2,0(5): mask bit for CC=2 is 0b0010
        e.store.write_byte(0, 0x47, 0).unwrap();
        e.store.write_byte(1, 0x20, 0).unwrap();
        e.store.write_byte(2, 0x50, 0).unwrap();
        e.store.write_byte(3, 0x00, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.psw.ia, 0x300);
    }

    #[test]
    fn bc_falls_through_when_mask_does_not_match_cc() {
        let mut e = engine_with(4096);
        e.psw.cc = 0;
        e.local.set_gpr(5, 0x300);
        e.store.write_byte(0, 0x47, 0).unwrap();
        e.store.write_byte(1, 0x20, 0).unwrap();
        e.store.write_byte(2, 0x50, 0).unwrap();
        e.store.write_byte(3, 0x00, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.psw.ia, 4);
    }

    #[test]
    fn bctr_loops_until_count_exhausted() {
        let mut e = engine_with(4096);
        e.local.set_gpr(3, 2);
        e.local.set_gpr(9, 0);
        e.store.write_byte(0, 0x06, 0).unwrap(); // BCTR 3,9
        e.store.write_byte(1, 0x39, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.local.gpr(3), 1);
        assert_eq!(e.psw.ia, 0, "branched back since count != 0");
    }

    #[test]
    fn nr_or_xr_set_cc_from_result() {
        let mut e = engine_with(4096);
        e.local.set_gpr(1, 0b1100);
        e.local.set_gpr(2, 0b1010);
        e.store.write_byte(0, 0x14, 0).unwrap(); // NR 1,2
        e.store.write_byte(1, 0x12, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.local.gpr(1), 0b1000);
        assert_eq!(e.psw.cc, 1);
    }

    #[test]
    fn cr_sets_cc_for_equal_low_high() {
        let mut e = engine_with(4096);
        e.local.set_gpr(1, 5);
        e.local.set_gpr(2, 9);
        e.store.write_byte(0, 0x19, 0).unwrap(); // CR 1,2
        e.store.write_byte(1, 0x12, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.psw.cc, 1, "5 < 9");
    }

    #[test]
    fn mr_computes_a_64_bit_product_in_the_register_pair() {
        let mut e = engine_with(4096);
        e.local.set_gpr(5, 100_000);
        e.local.set_gpr(6, 100_000);
        e.store.write_byte(0, 0x1C, 0).unwrap(); // MR 4,6
        e.store.write_byte(1, 0x46, 0).unwrap();
        e.step().unwrap();
        let product = (i64::from(e.local.gpr(4) as i32) << 32) | i64::from(e.local.gpr(5));
        assert_eq!(product, 10_000_000_000);
    }

    #[test]
    fn dr_divides_a_register_pair_dividend() {
        let mut e = engine_with(4096);
        e.local.set_gpr(4, 0); // high word of dividend
        e.local.set_gpr(5, 17); // low word of dividend
        e.local.set_gpr(6, 5);
        e.store.write_byte(0, 0x1D, 0).unwrap(); // DR 4,6
        e.store.write_byte(1, 0x46, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.local.gpr(4), 2, "remainder");
        assert_eq!(e.local.gpr(5), 3, "quotient");
    }

    #[test]
    fn dr_by_zero_is_fixed_divide_check() {
        let mut e = engine_with(4096);
        e.local.set_gpr(4, 0);
        e.local.set_gpr(5, 17);
        e.local.set_gpr(6, 0);
        e.store.write_byte(0, 0x1D, 0).unwrap();
        e.store.write_byte(1, 0x46, 0).unwrap();
        match e.step().unwrap() {
            StepOutcome::Trapped { check, .. } => assert_eq!(check, ProgramCheck::FixedDivide),
            other => panic!("expected trap, got {other:?}"),
        }
    }

    #[test]
    fn sll_shifts_left_by_displacement() {
        let mut e = engine_with(4096);
        e.local.set_gpr(3, 0b1);
        e.store.write_byte(0, 0x89, 0).unwrap(); // SLL 3,4(0)
        e.store.write_byte(1, 0x30, 0).unwrap();
        e.store.write_byte(2, 0x00, 0).unwrap();
        e.store.write_byte(3, 0x04, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.local.gpr(3), 0b1_0000);
    }

    #[test]
    fn srl_shifts_right_by_displacement() {
        let mut e = engine_with(4096);
        e.local.set_gpr(3, 0b1_0000);
        e.store.write_byte(0, 0x88, 0).unwrap(); // SRL 3,4(0)
        e.store.write_byte(1, 0x30, 0).unwrap();
        e.store.write_byte(2, 0x00, 0).unwrap();
        e.store.write_byte(3, 0x04, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.local.gpr(3), 0b1);
    }

    #[test]
    fn le_and_ste_round_trip_through_storage() {
        let mut e = engine_with(4096);
        e.store.write_word(0x400, 0x4123_4500, 0).unwrap();
        e.local.set_gpr(5, 0x400);
        e.store.write_byte(0, 0x78, 0).unwrap(); // LE 2,0(0,5)
        e.store.write_byte(1, 0x20, 0).unwrap();
        e.store.write_byte(2, 0x50, 0).unwrap();
        e.store.write_byte(3, 0x00, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.local.fpr(2), 0x4123_4500);

        e.local.set_gpr(6, 0x600);
        e.store.write_byte(4, 0x70, 0).unwrap(); // STE 2,0(0,6)
        e.store.write_byte(5, 0x20, 0).unwrap();
        e.store.write_byte(6, 0x60, 0).unwrap();
        e.store.write_byte(7, 0x00, 0).unwrap();
        e.step().unwrap();
        assert_eq!(e.store.read_word(0x600, 0).unwrap(), 0x4123_4500);
    }

    #[test]
    fn ae_adds_short_floats_in_place() {
        let mut e = engine_with(4096);
        e.local.set_fpr(
            2,
            ShortFloat {
                negative: false,
                characteristic: 0x41,
                fraction: 0x100000,
            }
            .to_bits(),
        );
        e.store.write_word(
            0x400,
            ShortFloat {
                negative: false,
                characteristic: 0x41,
                fraction: 0x100000,
            }
            .to_bits(),
            0,
        ).unwrap();
        e.local.set_gpr(5, 0x400);
        e.store.write_byte(0, 0x7A, 0).unwrap(); // AE 2,0(0,5)
        e.store.write_byte(1, 0x20, 0).unwrap();
        e.store.write_byte(2, 0x50, 0).unwrap();
        e.store.write_byte(3, 0x00, 0).unwrap();
        e.step().unwrap();
        let result = ShortFloat::from_bits(e.local.fpr(2));
        assert_eq!(result.fraction, 0x200000);
        assert_eq!(e.psw.cc, 2, "positive result");
    }
}
