//! Multiplexor/selector channel subsystem: CCW fetch/chaining, data
//! transfer, and CSW posting over the [`Device`] seam.

pub mod ccw;
pub mod channel;
pub mod device;

pub use ccw::{Ccw, Csw};
pub use channel::ChannelSet;
pub use device::{Device, InitialStatus, StackedStatus};
