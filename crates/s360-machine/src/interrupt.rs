//! Interrupt vectoring: old/new PSW save-and-load at the low-memory
//! architectural entries.

use s360_cpu2030::{ProgramCheck, Psw, Store};

/// Old-PSW low-memory addresses. New PSW for each class lives 0x40 bytes
/// higher, the standard System/360 convention.
pub mod vector {
    pub const EXTERNAL_OLD: u32 = 0x18;
    pub const SVC_OLD: u32 = 0x20;
    pub const PROGRAM_OLD: u32 = 0x28;
    pub const MACHINE_CHECK_OLD: u32 = 0x30;
    pub const IO_OLD: u32 = 0x38;
}

const NEW_PSW_OFFSET: u32 = 0x40;

/// Store `old` at `old_addr` and return the PSW loaded from the
/// corresponding new-PSW slot.
///
/// If the loaded PSW fails [`Psw::validate`] (an out-of-range instruction
/// address), this is itself a specification exception: the attempted new
/// PSW never becomes current, and a second old/new exchange runs through
/// [`vector::PROGRAM_OLD`] instead. If that vector's own new PSW is also
/// invalid there is nothing left to do but load it as-is.
pub fn vector_through(
    store: &mut Store,
    old_addr: u32,
    mut old: Psw,
    interrupt_code: u16,
    mem_max: u32,
) -> Psw {
    old.interrupt_code = interrupt_code;
    let _ = store.write_raw(old_addr, &old.to_bytes());
    let new_psw = load_new_psw(store, old_addr);
    if new_psw.validate(mem_max) || old_addr == vector::PROGRAM_OLD {
        return new_psw;
    }
    old.interrupt_code = ProgramCheck::Specification.code();
    let _ = store.write_raw(vector::PROGRAM_OLD, &old.to_bytes());
    load_new_psw(store, vector::PROGRAM_OLD)
}

fn load_new_psw(store: &Store, old_addr: u32) -> Psw {
    let bytes: [u8; 8] = store
        .read_raw(old_addr + NEW_PSW_OFFSET, 8)
        .map(|b| b.try_into().unwrap_or([0; 8]))
        .unwrap_or([0; 8]);
    Psw::from_bytes(bytes)
}
