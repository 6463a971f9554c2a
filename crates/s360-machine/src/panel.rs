//! Panel facade: a read/write view over machine state for an external
//! front-end. No GUI lives here (that is the excluded SDL panel); this is
//! only the [`s360_core::Observable`] seam it would read from.

use crate::system::System360;
use s360_core::{Observable, Value};
use s360_cpu2030::local_store::GPR_BASE;

pub struct Panel<'a> {
    system: &'a System360,
}

impl<'a> Panel<'a> {
    #[must_use]
    pub fn new(system: &'a System360) -> Self {
        Self { system }
    }
}

impl Observable for Panel<'_> {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "cpu.roar" => Some(Value::U32(self.system.engine.psw.ia)),
            "cpu.cc" => Some(Value::U8(self.system.engine.psw.cc)),
            "cpu.wait" => Some(Value::Bool(self.system.engine.psw.wait_state())),
            "cpu.gpr0" => Some(Value::U32(self.system.engine.local.gpr(0))),
            "cpu.parity_check" => Some(Value::Bool(
                self.system.engine.local.check_parity(GPR_BASE).is_err(),
            )),
            "storage.key_parity_check" => Some(Value::Bool(
                self.system.engine.store.check_key_parity(0).is_err(),
            )),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.roar",
            "cpu.cc",
            "cpu.wait",
            "cpu.gpr0",
            "cpu.parity_check",
            "storage.key_parity_check",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s360_cpu2030::Store;

    #[test]
    fn reads_current_roar() {
        let system = System360::new(Store::new(4096));
        let panel = Panel::new(&system);
        assert_eq!(panel.query("cpu.roar"), Some(Value::U32(0)));
        assert_eq!(panel.query("bogus.path"), None);
    }

    #[test]
    fn reports_an_injected_gpr_parity_fault() {
        let mut system = System360::new(Store::new(4096));
        assert_eq!(
            Panel::new(&system).query("cpu.parity_check"),
            Some(Value::Bool(false))
        );
        system.engine.local.inject_parity_fault(GPR_BASE);
        assert_eq!(
            Panel::new(&system).query("cpu.parity_check"),
            Some(Value::Bool(true))
        );
    }
}
