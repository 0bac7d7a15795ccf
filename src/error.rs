//! Unified error types for the contact sensor firmware.
//!
//! A single `Error` enum that every subsystem can convert into.  All
//! variants are `Copy` so they can be handed back from ISR-safe paths and
//! logged by the dispatch task without allocation.
//!
//! None of these errors cross the event queue: every handler logs and
//! absorbs its own failures, so `Error` only surfaces at the producer side
//! (a rejected post) and at port boundaries.

use core::fmt;

use crate::fsm::Function;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The app event queue was full; the event was dropped.
    QueueFull,
    /// Another exclusive function already owns the device.
    FunctionBusy(Function),
    /// The countdown timer could not be started or stopped.
    Timer(TimerError),
    /// The protocol stack rejected a request.
    Stack(StackError),
    /// The attribute store reported a non-success status.
    Attribute(AttributeStatus),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "app event queue full"),
            Self::FunctionBusy(current) => write!(f, "function {current:?} already active"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Stack(e) => write!(f, "stack: {e}"),
            Self::Attribute(status) => write!(f, "attribute: {status}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The timer command could not be delivered (e.g. timer service busy).
    CommandFailed,
    /// The requested period is not representable by the timer.
    InvalidPeriod,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandFailed => write!(f, "timer command failed"),
            Self::InvalidPeriod => write!(f, "invalid timer period"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol stack errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The stack's work queue could not accept another item.
    WorkQueueFull,
    /// The commissioning window could not be opened.
    CommissioningWindow,
    /// The stack is not running.
    NotRunning,
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkQueueFull => write!(f, "work queue full"),
            Self::CommissioningWindow => write!(f, "commissioning window open failed"),
            Self::NotRunning => write!(f, "stack not running"),
        }
    }
}

impl From<StackError> for Error {
    fn from(e: StackError) -> Self {
        Self::Stack(e)
    }
}

// ---------------------------------------------------------------------------
// Attribute store status
// ---------------------------------------------------------------------------

/// Raw status code returned by the attribute store (0 is success and never
/// wrapped in this type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeStatus(pub u8);

impl AttributeStatus {
    pub const FAILURE: Self = Self(0x01);
    pub const UNSUPPORTED_ENDPOINT: Self = Self(0x7f);
    pub const UNSUPPORTED_ATTRIBUTE: Self = Self(0x86);
}

impl fmt::Display for AttributeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status 0x{:02x}", self.0)
    }
}

impl From<AttributeStatus> for Error {
    fn from(e: AttributeStatus) -> Self {
        Self::Attribute(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
