//! Exclusive application function state machine.
//!
//! ```text
//!                 ┌──────────────┐
//!        ┌───────▶│ FactoryReset │───── countdown cancelled ─────┐
//!        │        └──────────────┘                               │
//!        │        ┌──────────────┐                               ▼
//!  NoneSelected ─▶│   Contact    │───── transition finished ──▶ NoneSelected
//!        │        └──────────────┘                               ▲
//!        │        ┌──────────────┐                               │
//!        └───────▶│   Identify   │───── identify stopped ────────┘
//!                 └──────────────┘
//! ```
//!
//! A fired factory-reset countdown never returns to `NoneSelected`: the
//! device erases itself and reboots.  `Invalid` is reserved and is never
//! entered.
//!
//! The slot is owned by the dispatch task, which is the only writer, so
//! claiming needs no lock.  A claim that finds the slot occupied is declined;
//! the caller logs and drops its request.

use log::debug;

use crate::error::{Error, Result};

/// The exclusive behaviour currently owning the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Function {
    #[default]
    NoneSelected = 0,
    FactoryReset = 1,
    Contact = 2,
    Identify = 3,
    Invalid = 4,
}

/// Holder for the single active [`Function`].
#[derive(Debug, Default)]
pub struct FunctionSlot {
    current: Function,
}

impl FunctionSlot {
    pub const fn new() -> Self {
        Self {
            current: Function::NoneSelected,
        }
    }

    pub fn current(&self) -> Function {
        self.current
    }

    pub fn is_idle(&self) -> bool {
        self.current == Function::NoneSelected
    }

    pub fn is(&self, function: Function) -> bool {
        self.current == function
    }

    /// Take the slot for `function`.  Only succeeds from `NoneSelected`.
    pub fn claim(&mut self, function: Function) -> Result<()> {
        debug_assert!(
            !matches!(function, Function::NoneSelected | Function::Invalid),
            "not a claimable function: {function:?}"
        );
        if !self.is_idle() {
            return Err(Error::FunctionBusy(self.current));
        }
        debug!("function: NoneSelected -> {:?}", function);
        self.current = function;
        Ok(())
    }

    /// Return the slot to `NoneSelected` if `function` holds it.
    /// Returns whether anything was released.
    pub fn release(&mut self, function: Function) -> bool {
        if self.current != function {
            return false;
        }
        debug!("function: {:?} -> NoneSelected", function);
        self.current = Function::NoneSelected;
        true
    }
}
