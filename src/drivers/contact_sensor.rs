//! Logical contact sensor.
//!
//! Holds the open/closed state the rest of the system sees.  Reed switch
//! edges do not write it directly: the GPIO ISR posts
//! [`AppEvent::SensorChanged`] and the dispatch task applies it via
//! [`ContactSensorPort::initiate_action`].  Unlike a contact action
//! request, a physical change is never gated on the active function.

use log::info;

use crate::app::ports::{ContactAction, ContactSensorPort, ContactState};
use crate::events::{AppEvent, EventQueue};

#[derive(Debug)]
pub struct ContactSensor {
    state: ContactState,
}

impl ContactSensor {
    pub const fn new(initial: ContactState) -> Self {
        Self { state: initial }
    }
}

impl ContactSensorPort for ContactSensor {
    fn contact_state(&self) -> ContactState {
        self.state
    }

    fn initiate_action(&mut self, action: ContactAction) -> Option<ContactState> {
        let next = match action {
            ContactAction::SignalDetected => ContactState::Closed,
            ContactAction::SignalLost => ContactState::Opened,
            ContactAction::Invalid => return None,
        };
        if next == self.state {
            return None;
        }
        info!("contact sensor: {:?} -> {:?}", self.state, next);
        self.state = next;
        Some(next)
    }
}

/// Reed switch edge ISR.  `closed` is the debounced switch level.
pub fn reed_switch_event_handler(queue: &EventQueue, closed: bool) {
    let state = if closed {
        ContactState::Closed
    } else {
        ContactState::Opened
    };
    let _ = queue.post_event_from_isr(AppEvent::SensorChanged(state));
}
