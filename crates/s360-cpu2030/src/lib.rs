//! The Model 2030 CPU core: store, local store, PSW, decimal/float data-path
//! helpers, instruction decode, and the micro-engine that drives them.

pub mod decimal;
pub mod engine;
pub mod float;
pub mod local_store;
pub mod psw;
pub mod ros;
pub mod store;

pub use engine::{MicroEngine, StepOutcome};
pub use local_store::LocalStore;
pub use psw::Psw;
pub use store::{MachineCheck, ProgramCheck, Store};
