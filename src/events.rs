//! Interrupt-safe application event queue.
//!
//! Events are produced by:
//! - Button ISRs (click / long click on the left and right buttons)
//! - The countdown timer callback (factory-reset confirmation expired)
//! - The reed switch ISR (physical contact transitions)
//! - Software (contact action requests, identify callbacks)
//!
//! Events are consumed by the single dispatch task, which handles them
//! one at a time in strict FIFO order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Button ISR  │────▶│              │     │              │
//! │ Timer cb    │────▶│  Event Queue │────▶│ Dispatch task│
//! │ Identify cb │────▶│  (depth 10)  │     │  (consumer)  │
//! │ Software    │────▶│              │     │              │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Posting never blocks.  A full queue drops the new event: with a depth of
//! ten, saturation means the consumer is stuck, and buffering more would
//! only hide it.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::ports::{ContactState, IdentifyEffect, IdentifyPhase};
use crate::error::{Error, Result};

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 10;

/// Press classification reported by the button driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Clicked,
    LongClicked,
}

/// Opaque context handed to the countdown timer when it is armed and handed
/// back on expiry.  The controller uses it to tell the current countdown
/// from an expiry that was already queued when the countdown was cancelled
/// or re-armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerContext(pub u32);

/// One stimulus for the dispatch task.  Plain value: copied into the queue
/// and out again, never shared between contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    ButtonLeft(ButtonAction),
    ButtonRight(ButtonAction),
    /// Countdown timer expired.
    Timer(TimerContext),
    /// Contact action request; raw action code, see
    /// [`ContactAction`](crate::app::ports::ContactAction).
    Contact(u8),
    /// The reed switch settled in a new state.  Applied whatever function
    /// is active.
    SensorChanged(ContactState),
    /// Identify effect started or stopped by the identify cluster.
    Identify {
        effect: IdentifyEffect,
        phase: IdentifyPhase,
    },
    /// Carries no work; dropped by the dispatch task.
    None,
}

// ── Queue ─────────────────────────────────────────────────────
//
// Multi-producer, single-consumer.  The critical-section mutex makes
// `try_send` callable from interrupt context; the dispatch task parks on
// `receive()` and is woken by the channel's waker.

/// The bounded app event queue.  Constructible in a `static` so ISR
/// callbacks can reach it.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, AppEvent, EVENT_QUEUE_CAP>,
    /// Events dropped on the ISR path since the consumer last looked.
    isr_dropped: AtomicU32,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            isr_dropped: AtomicU32::new(0),
        }
    }

    /// Post from task context.  Zero-wait: a full queue drops `event`.
    pub fn post_event(&self, event: AppEvent) -> Result<()> {
        if self.channel.try_send(event).is_err() {
            warn!("failed to post event to app task event queue: {:?}", event);
            return Err(Error::QueueFull);
        }
        Ok(())
    }

    /// Post from interrupt context.
    ///
    /// Lock-free apart from the critical section guarding the channel, and
    /// does not log: a drop is counted here and reported by the dispatch
    /// task through [`take_isr_dropped`](Self::take_isr_dropped).  Waking
    /// the dispatch task is handled by the channel waker.
    pub fn post_event_from_isr(&self, event: AppEvent) -> Result<()> {
        if self.channel.try_send(event).is_err() {
            self.isr_dropped.fetch_add(1, Ordering::Relaxed);
            return Err(Error::QueueFull);
        }
        Ok(())
    }

    /// Post through whichever path matches the caller's execution
    /// context.  Exactly one enqueue attempt is made.
    pub fn post(&self, event: AppEvent) -> Result<()> {
        if in_interrupt_context() {
            self.post_event_from_isr(event)
        } else {
            self.post_event(event)
        }
    }

    /// Wait for the next event.  Only the dispatch task calls this.
    pub async fn receive(&self) -> AppEvent {
        self.channel.receive().await
    }

    /// Take the next event if one is pending.
    pub fn try_receive(&self) -> Option<AppEvent> {
        self.channel.try_receive().ok()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    /// Read and reset the ISR drop counter.
    pub fn take_isr_dropped(&self) -> u32 {
        self.isr_dropped.swap(0, Ordering::Relaxed)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
fn in_interrupt_context() -> bool {
    // SAFETY: reads the current core's interrupt nesting state only.
    unsafe { esp_idf_svc::sys::xPortInIsrContext() != 0 }
}

#[cfg(not(target_os = "espidf"))]
fn in_interrupt_context() -> bool {
    false
}
