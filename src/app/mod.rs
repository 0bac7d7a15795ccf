//! Application core: event dispatch and the exclusive-function rules.
//!
//! Everything here is hardware-free.  Peripherals and the protocol stack
//! are reached through the **port traits** in [`ports`], so the whole
//! controller runs unchanged against the board adapters or test mocks.

pub mod ports;
pub mod task;
pub mod work;
