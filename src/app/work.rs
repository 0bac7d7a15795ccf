//! Work items handed to the protocol stack's execution context.
//!
//! The attribute store belongs to the stack and must only be touched from
//! the stack's own context.  The dispatch task therefore never calls it:
//! it builds a [`StackWork`] value and pushes it through
//! [`StackPort::schedule_work`](super::ports::StackPort::schedule_work).
//! The stack later pops it and calls [`StackWork::run`] with its store.
//!
//! ```text
//!  dispatch task                      stack context
//!  ─────────────                      ─────────────
//!  update_cluster_state()
//!     └─ schedule_work(SyncBooleanState) ──▶ queue ──▶ run(store)
//!                                                       └─ set_boolean_state()
//! ```
//!
//! Posting is fire-and-forget.  A failed write is logged with its status
//! code and not retried; the next contact transition resyncs the attribute.

use log::{debug, error, warn};

use super::ports::{AttributeStore, EndpointId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackWork {
    /// Write the sensor reading into the boolean state attribute.
    SyncBooleanState { endpoint: EndpointId, closed: bool },
    /// Read the attribute back and compare with the sensor reading.
    ReadBackBooleanState { endpoint: EndpointId, expected: bool },
}

impl StackWork {
    /// Execute on the stack context.
    pub fn run(self, store: &mut impl AttributeStore) {
        match self {
            Self::SyncBooleanState { endpoint, closed } => {
                if let Err(status) = store.set_boolean_state(endpoint, closed) {
                    error!(
                        "Err: updating boolean state value on endpoint {}: {}",
                        endpoint, status
                    );
                    return;
                }
                store.log_state_change_event(endpoint, closed);
                debug!("boolean state on endpoint {} = {}", endpoint, closed);
            }
            Self::ReadBackBooleanState { endpoint, expected } => {
                match store.boolean_state(endpoint) {
                    Ok(value) if value == expected => {
                        debug!("boolean state on endpoint {} in sync ({})", endpoint, value);
                    }
                    Ok(value) => {
                        warn!(
                            "boolean state on endpoint {} is {} but sensor reads {}",
                            endpoint, value, expected
                        );
                    }
                    Err(status) => {
                        error!(
                            "Err: reading boolean state value on endpoint {}: {}",
                            endpoint, status
                        );
                    }
                }
            }
        }
    }
}
