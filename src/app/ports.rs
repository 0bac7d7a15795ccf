//! Port traits: the boundary between the controller and its collaborators.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppTask (domain)
//! ```
//!
//! The sensor abstraction, LEDs, the countdown timer and the protocol stack
//! all live outside this crate's core.  [`AppTask`](super::task::AppTask)
//! consumes them through these traits, injected at call sites, so the
//! controller is fully testable with recording mocks.
//!
//! ## Execution contexts
//!
//! Everything here is called from the dispatch task except
//! [`AttributeStore`], which is only ever handed to
//! [`StackWork::run`](super::work::StackWork::run) on the protocol stack's
//! own context.

use crate::error::{AttributeStatus, StackError, TimerError};
use crate::events::TimerContext;

use super::work::StackWork;

// ───────────────────────────────────────────────────────────────
// Contact sensor port (sensor abstraction ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Logical contact state, owned by the sensor abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactState {
    Closed,
    Opened,
}

impl ContactState {
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}

/// Requested change of the logical contact state.  Travels through the
/// event queue as its `u8` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContactAction {
    /// Contact made; state becomes `Closed`.
    SignalDetected = 0,
    /// Contact broken; state becomes `Opened`.
    SignalLost = 1,
    Invalid = 2,
}

impl ContactAction {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::SignalDetected,
            1 => Self::SignalLost,
            _ => Self::Invalid,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// The action that brings the sensor into `state`.
    pub fn for_state(state: ContactState) -> Self {
        match state {
            ContactState::Closed => Self::SignalDetected,
            ContactState::Opened => Self::SignalLost,
        }
    }

    /// The action that flips the given state.
    pub fn toggle(current: ContactState) -> Self {
        match current {
            ContactState::Closed => Self::SignalLost,
            ContactState::Opened => Self::SignalDetected,
        }
    }
}

pub trait ContactSensorPort {
    /// Current logical state.
    fn contact_state(&self) -> ContactState;

    fn is_contact_closed(&self) -> bool {
        self.contact_state().is_closed()
    }

    /// Apply `action`.  Returns the new state if a transition happened,
    /// `None` if the sensor was already in the requested state or the
    /// action was rejected.
    fn initiate_action(&mut self, action: ContactAction) -> Option<ContactState>;
}

// ───────────────────────────────────────────────────────────────
// LED port (domain → LED driver)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedId {
    /// Green LED: mirrors the contact state, blinks while identifying.
    Status,
    /// Red LED: blinks while a factory reset is pending.
    Alert,
}

pub trait LedPort {
    fn led_on(&mut self, led: LedId);
    fn led_off(&mut self, led: LedId);
    /// Blink forever with the given half-period until the next command.
    fn led_blink(&mut self, led: LedId, period_ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Countdown timer port (domain → one-shot software timer)
// ───────────────────────────────────────────────────────────────

/// The single one-shot timer used for delayed confirmations.
///
/// On expiry the implementation posts `AppEvent::Timer(ctx)` with the
/// context it was started with, from normal (non-ISR) context; see
/// [`timer_event_handler`](crate::drivers::countdown::timer_event_handler).
/// It never runs application logic itself.
pub trait CountdownTimer {
    fn is_active(&self) -> bool;

    /// Arm for `period_ms`.  Only called while the timer is stopped.
    fn start(&mut self, period_ms: u32, ctx: TimerContext) -> Result<(), TimerError>;

    fn stop(&mut self) -> Result<(), TimerError>;
}

/// Everything on the device side of the controller.
pub trait Peripherals: ContactSensorPort + LedPort + CountdownTimer {}

impl<T: ContactSensorPort + LedPort + CountdownTimer> Peripherals for T {}

// ───────────────────────────────────────────────────────────────
// Protocol stack port (domain → stack)
// ───────────────────────────────────────────────────────────────

pub trait StackPort {
    /// Erase fabric state and reboot.  Irrevocable.
    fn schedule_factory_reset(&mut self);

    fn is_advertising_enabled(&self) -> bool;

    fn set_advertising_enabled(&mut self, enabled: bool);

    /// Open the basic commissioning window (starts advertising).
    fn open_commissioning_window(&mut self) -> Result<(), StackError>;

    /// Hand `work` to the stack's execution context.  Fire-and-forget:
    /// `Ok` means queued, not executed.
    fn schedule_work(&mut self, work: StackWork) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// Attribute store (stack context only)
// ───────────────────────────────────────────────────────────────

/// Endpoint number in the data model.
pub type EndpointId = u16;

/// The protocol stack's attribute storage, as seen by scheduled work.
pub trait AttributeStore {
    fn boolean_state(&self, endpoint: EndpointId) -> Result<bool, AttributeStatus>;

    fn set_boolean_state(&mut self, endpoint: EndpointId, value: bool) -> Result<(), AttributeStatus>;

    /// Record a state-change event in the endpoint's event log.
    fn log_state_change_event(&mut self, endpoint: EndpointId, value: bool);
}

// ───────────────────────────────────────────────────────────────
// Identify cluster
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyEffect {
    Blink,
    Breathe,
    Okay,
    ChannelChange,
    FinishEffect,
    StopEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyPhase {
    Start,
    Stop,
}
