//! Channel-program execution: Start I/O, CCW fetch/chaining, CSW posting.
//!
//! Both multiplexor and selector channels share this sequencing; the
//! two flavors differ only in how many channel programs may be in flight at
//! once, which this single-CPU, single-threaded simulator does not need to
//! distinguish — each `start_io` call runs the channel program's CCW
//! fetch/chain/data-transfer sequence to completion synchronously. Device
//! physical motion is not synchronous, though: when a `start()` reports a
//! nonzero [`InitialStatus::completion_delay`], channel-end is posted right
//! away but device-end is deferred, scheduled on the caller's
//! [`EventQueue`] and posted later by [`ChannelSet::service_event`] once
//! [`Device::poll`] reports the device has actually finished.

use crate::ccw::{unit_status, Ccw, Csw, CAW_ADDRESS, CSW_ADDRESS};
use crate::device::Device;
use s360_core::{EventQueue, Ticks};
use s360_cpu2030::{ProgramCheck, Store};
use std::collections::HashMap;

/// Event-queue operation code for a deferred device-end completion.
const OP_DEVICE_END: u32 = 1;

struct PendingCompletion {
    csw_key: u8,
    next_ccw_addr: u32,
    unit_status: u8,
    residual: u16,
}

pub struct ChannelSet {
    devices: Vec<Box<dyn Device>>,
    pending: HashMap<u16, PendingCompletion>,
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            pending: HashMap::new(),
        }
    }

    pub fn attach(&mut self, device: Box<dyn Device>) {
        self.devices.push(device);
    }

    fn find_mut(&mut self, addr: u16) -> Option<&mut Box<dyn Device>> {
        self.devices.iter_mut().find(|d| d.address() == addr)
    }

    /// Execute Start I/O addressed to `device_addr`. Returns the condition
    /// code the CPU sees (0 started, 1 busy/status stored, 2 or 3
    /// not-operational). On CC=0 the channel program runs to completion;
    /// the CSW is posted at [`CSW_ADDRESS`] immediately if the device has no
    /// completion delay, or with channel-end only if it does (see module
    /// docs).
    pub fn start_io(
        &mut self,
        store: &mut Store,
        events: &mut EventQueue,
        key: u8,
        device_addr: u16,
    ) -> Result<u8, ProgramCheck> {
        if self.pending.contains_key(&device_addr) {
            return Ok(1);
        }

        let caw = store.read_word(CAW_ADDRESS, 0)?;
        let caw_key = ((caw >> 24) & 0xF0) as u8 >> 4;
        let mut ccw_addr = caw & 0x00FF_FFFF;

        let Some(device) = self.find_mut(device_addr) else {
            return Ok(3);
        };

        let first = read_ccw(store, ccw_addr, caw_key)?;
        if first.command == 0 {
            return Err(ProgramCheck::Specification);
        }
        let initial = device.start(first.command);
        if initial.not_operational {
            return Ok(3);
        }
        if initial.busy {
            return Ok(1);
        }
        let mut delay = initial.completion_delay;

        let mut ccw = first;
        let mut residual = ccw.count;
        let mut unit_status_bits = unit_status::CHANNEL_END;
        let mut prev_was_tic = false;

        loop {
            if ccw.is_tic() {
                if prev_was_tic {
                    return Err(ProgramCheck::Specification);
                }
                ccw_addr = ccw.address;
                ccw = read_ccw(store, ccw_addr, caw_key)?;
                prev_was_tic = true;
                residual = ccw.count;
                continue;
            }
            prev_was_tic = false;

            let mut addr = ccw.address;
            let mut remaining = ccw.count;
            while remaining > 0 {
                if ccw.is_write() {
                    // "Write" commands move data from storage to the device.
                    let byte = if ccw.skip() { 0 } else { store.read_byte(addr, caw_key)? };
                    device.write_byte(byte);
                } else if ccw.is_read() {
                    // "Read" commands move data from the device into storage.
                    match device.read_byte() {
                        Some(byte) => {
                            if !ccw.skip() {
                                store.write_byte(addr, byte, caw_key)?;
                            }
                        }
                        None => break,
                    }
                }
                addr = addr.wrapping_add(1);
                remaining -= 1;
            }
            residual = remaining;

            if remaining == 0 && ccw.chain_data() {
                ccw_addr = ccw_addr.wrapping_add(8);
                ccw = read_ccw(store, ccw_addr, caw_key)?;
                residual = ccw.count;
                continue;
            }

            if ccw.chain_command() {
                let next_addr = ccw_addr.wrapping_add(8);
                let next = read_ccw(store, next_addr, caw_key)?;
                let st = device.start(next.command);
                if st.unit_check {
                    unit_status_bits |= unit_status::UNIT_CHECK;
                }
                delay = st.completion_delay;
                ccw_addr = next_addr;
                ccw = next;
                residual = ccw.count;
                continue;
            }

            break;
        }

        let next_ccw_addr = ccw_addr.wrapping_add(8);
        if delay == Ticks::ZERO {
            let csw = Csw {
                key: caw_key,
                address: next_ccw_addr,
                unit_status: unit_status_bits | unit_status::DEVICE_END,
                channel_status: 0,
                count: residual,
            };
            store.write_raw(CSW_ADDRESS, &csw.to_bytes())?;
        } else {
            let csw = Csw {
                key: caw_key,
                address: next_ccw_addr,
                unit_status: unit_status_bits,
                channel_status: 0,
                count: residual,
            };
            store.write_raw(CSW_ADDRESS, &csw.to_bytes())?;
            self.pending.insert(
                device_addr,
                PendingCompletion {
                    csw_key: caw_key,
                    next_ccw_addr,
                    unit_status: unit_status_bits,
                    residual,
                },
            );
            events.insert(delay, u32::from(device_addr), OP_DEVICE_END, 0);
        }
        Ok(0)
    }

    /// Service a fired event targeting `device_addr`. Calls
    /// [`Device::poll`] and posts the deferred device-end CSW, ORing in
    /// `UNIT_CHECK` if the device reports its motion ended in error. A
    /// no-op if there is no pending completion for `device_addr` (the
    /// event queue can legitimately fire for other targets).
    pub fn service_event(&mut self, store: &mut Store, now: u64, device_addr: u16) -> Result<(), ProgramCheck> {
        let Some(pending) = self.pending.remove(&device_addr) else {
            return Ok(());
        };
        let Some(device) = self.find_mut(device_addr) else {
            return Ok(());
        };
        let mut unit_status_bits = pending.unit_status | unit_status::DEVICE_END;
        if device.poll(now).is_some() {
            unit_status_bits |= unit_status::UNIT_CHECK;
        }
        let csw = Csw {
            key: pending.csw_key,
            address: pending.next_ccw_addr,
            unit_status: unit_status_bits,
            channel_status: 0,
            count: pending.residual,
        };
        store.write_raw(CSW_ADDRESS, &csw.to_bytes())?;
        Ok(())
    }
}

fn read_ccw(store: &Store, addr: u32, key: u8) -> Result<Ccw, ProgramCheck> {
    let bytes: [u8; 8] = store
        .read_raw(addr, 8)?
        .try_into()
        .map_err(|_| ProgramCheck::Addressing)?;
    let ccw = Ccw::from_bytes(bytes);
    let _ = key;
    if ccw.flags & 0b0000_0011 != 0 {
        return Err(ProgramCheck::Specification);
    }
    Ok(ccw)
}
