//! `System360`: ties the micro-engine, channel set, and devices together
//! and owns the macro-cycle loop: micro-engine step, device tick,
//! event-queue advance, once per iteration, single-threaded, no preemption.

use crate::interrupt::{vector, vector_through};
use s360_channel::ChannelSet;
use s360_core::EventQueue;
use s360_cpu2030::{MicroEngine, ProgramCheck, Store, StepOutcome};

pub struct System360 {
    pub engine: MicroEngine,
    pub channels: ChannelSet,
    pub events: EventQueue,
    pub halted: bool,
}

impl System360 {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            engine: MicroEngine::new(store),
            channels: ChannelSet::new(),
            events: EventQueue::new(),
            halted: false,
        }
    }

    /// Run exactly one macro-cycle: step the micro-engine, then advance the
    /// event queue and service whatever fires. A channel program's CCW
    /// fetch/chain/data-transfer sequence runs synchronously inside
    /// `start_io` itself; only a device's deferred device-end completion
    /// (see `s360-channel`'s module doc comment) is driven from here.
    pub fn macro_cycle(&mut self) {
        if self.halted {
            return;
        }
        match self.engine.step() {
            Ok(StepOutcome::Continue) => {}
            Ok(StepOutcome::Trapped { old_psw, check }) => {
                self.take_program_check(old_psw, check);
            }
            Ok(StepOutcome::Supervisor { old_psw, code }) => {
                let mem_max = self.engine.store.len();
                self.engine.psw = vector_through(
                    &mut self.engine.store,
                    vector::SVC_OLD,
                    old_psw,
                    u16::from(code),
                    mem_max,
                );
            }
            Err(check) => {
                // Fetch itself failed (addressing/protection on the
                // instruction stream); the old PSW IA is unchanged.
                let old = self.engine.psw;
                self.take_program_check(old, check);
            }
        }
        let fired = self.events.advance();
        let now = self.events.now().get();
        for event in fired {
            let device_addr = event.target as u16;
            let _ = self
                .channels
                .service_event(&mut self.engine.store, now, device_addr);
        }
        if self.engine.psw.wait_state() {
            self.halted = true;
        }
    }

    fn take_program_check(&mut self, old_psw: s360_cpu2030::Psw, check: ProgramCheck) {
        let mem_max = self.engine.store.len();
        self.engine.psw = vector_through(
            &mut self.engine.store,
            vector::PROGRAM_OLD,
            old_psw,
            check.code(),
            mem_max,
        );
    }

    /// Issue Start I/O to `device_addr`, using the CPU's current storage key.
    pub fn start_io(&mut self, device_addr: u16) -> Result<u8, ProgramCheck> {
        let key = self.engine.psw.key;
        self.channels
            .start_io(&mut self.engine.store, &mut self.events, key, device_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_1442_reader_punch::CardReaderPunch;
    use s360_channel::ccw::{Ccw, CAW_ADDRESS};

    #[test]
    fn program_check_vectors_through_old_new_psw() {
        let mut system = System360::new(Store::new(4096));
        // AR 1,2 with overflow, mask on: R1=0x7FFFFFFF, R2=1.
        system.engine.local.set_gpr(1, 0x7FFF_FFFF);
        system.engine.local.set_gpr(2, 1);
        system.engine.psw.program_mask = s360_cpu2030::psw::mask_bit::FIXED_OVERFLOW;
        system.engine.store.write_byte(0, 0x1A, 0).unwrap();
        system.engine.store.write_byte(1, 0x12, 0).unwrap();

        let new_psw = s360_cpu2030::Psw {
            ia: 0x800,
            ..s360_cpu2030::Psw::new()
        };
        system
            .engine
            .store
            .write_raw(vector::PROGRAM_OLD + 0x40, &new_psw.to_bytes())
            .unwrap();

        system.macro_cycle();
        assert_eq!(system.engine.psw.ia, 0x800, "new PSW was loaded");

        let old = s360_cpu2030::Psw::from_bytes(
            system
                .engine
                .store
                .read_raw(vector::PROGRAM_OLD, 8)
                .unwrap()
                .try_into()
                .unwrap(),
        );
        assert_eq!(old.ia, 2);
        assert_eq!(old.interrupt_code, ProgramCheck::FixedOverflow.code());
    }

    #[test]
    fn sio_through_the_system_reaches_the_attached_device() {
        let mut system = System360::new(Store::new(4096));
        system.channels.attach(Box::new(CardReaderPunch::new(
            0x00B,
            vec![[0xC1; 80]],
        )));
        system
            .engine
            .store
            .write_word(CAW_ADDRESS, 0x0000_0200, 0)
            .unwrap();
        let ccw = Ccw {
            command: 0x02,
            address: 0x300,
            flags: 0,
            count: 3,
        };
        system.engine.store.write_raw(0x200, &ccw.to_bytes()).unwrap();
        let cc = system.start_io(0x00B).unwrap();
        assert_eq!(cc, 0);
    }
}
