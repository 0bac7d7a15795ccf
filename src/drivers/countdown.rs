//! One-shot countdown timer used for the factory-reset confirmation.
//!
//! Two implementations of [`CountdownTimer`]:
//!
//! - [`EspCountdown`] (ESP-IDF): a one-shot `esp_timer` dispatched on the
//!   esp_timer task, so its callback runs in normal (non-ISR) context.
//! - [`SoftCountdown`] (host / simulation): a virtual-clock timer advanced
//!   by [`SoftCountdown::poll`].
//!
//! Neither runs application logic on expiry.  Both call
//! [`timer_event_handler`], which posts `AppEvent::Timer` carrying the
//! context the countdown was armed with; the dispatch task does the rest.

use crate::app::ports::CountdownTimer;
use crate::error::TimerError;
use crate::events::{AppEvent, EventQueue, TimerContext};

/// Countdown expiry callback: hand the expiry to the dispatch task.
pub fn timer_event_handler(queue: &EventQueue, ctx: TimerContext) {
    let _ = queue.post_event(AppEvent::Timer(ctx));
}

// ═══════════════════════════════════════════════════════════════
//  Virtual-clock countdown
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct Armed {
    deadline_ms: u64,
    ctx: TimerContext,
}

/// Host-side one-shot timer.  Time only moves when `poll` is called.
#[derive(Debug, Default)]
pub struct SoftCountdown {
    now_ms: u64,
    armed: Option<Armed>,
}

impl SoftCountdown {
    pub const fn new() -> Self {
        Self {
            now_ms: 0,
            armed: None,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Absolute expiry time of the armed countdown.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.armed.map(|a| a.deadline_ms)
    }

    /// Advance the clock to `now_ms`.  If the countdown expires, it
    /// disarms and its expiry is posted to `queue`.  Returns whether it
    /// fired.
    pub fn poll(&mut self, now_ms: u64, queue: &EventQueue) -> bool {
        self.now_ms = self.now_ms.max(now_ms);
        match self.armed {
            Some(armed) if armed.deadline_ms <= self.now_ms => {
                self.armed = None;
                timer_event_handler(queue, armed.ctx);
                true
            }
            _ => false,
        }
    }
}

impl CountdownTimer for SoftCountdown {
    fn is_active(&self) -> bool {
        self.armed.is_some()
    }

    fn start(&mut self, period_ms: u32, ctx: TimerContext) -> Result<(), TimerError> {
        if period_ms == 0 {
            return Err(TimerError::InvalidPeriod);
        }
        self.armed = Some(Armed {
            deadline_ms: self.now_ms + u64::from(period_ms),
            ctx,
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TimerError> {
        self.armed = None;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  ESP-IDF countdown
// ═══════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
pub use esp::EspCountdown;

#[cfg(target_os = "espidf")]
mod esp {
    use core::sync::atomic::{AtomicU32, Ordering};

    use esp_idf_svc::sys::*;
    use log::info;

    use super::timer_event_handler;
    use crate::app::ports::CountdownTimer;
    use crate::error::TimerError;
    use crate::events::{EventQueue, TimerContext};

    /// Context of the current arm, read by the expiry callback.
    static COUNTDOWN_CTX: AtomicU32 = AtomicU32::new(0);

    unsafe extern "C" fn countdown_expired_cb(arg: *mut core::ffi::c_void) {
        // SAFETY: `arg` is the `&'static EventQueue` given to
        // `esp_timer_create` in `EspCountdown::new`.
        let queue = unsafe { &*(arg as *const EventQueue) };
        timer_event_handler(queue, TimerContext(COUNTDOWN_CTX.load(Ordering::Acquire)));
    }

    pub struct EspCountdown {
        handle: esp_timer_handle_t,
    }

    // SAFETY: the esp_timer API is thread-safe; the handle is only an id.
    unsafe impl Send for EspCountdown {}

    impl EspCountdown {
        pub fn new(queue: &'static EventQueue) -> Result<Self, TimerError> {
            let mut handle: esp_timer_handle_t = core::ptr::null_mut();
            let args = esp_timer_create_args_t {
                callback: Some(countdown_expired_cb),
                arg: queue as *const EventQueue as *mut core::ffi::c_void,
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: c"app_countdown".as_ptr(),
                skip_unhandled_events: false,
            };
            // SAFETY: `args` outlives the call; `handle` is written on success.
            let ret = unsafe { esp_timer_create(&args, &mut handle) };
            if ret != ESP_OK {
                log::error!("countdown: esp_timer_create failed (rc={})", ret);
                return Err(TimerError::CommandFailed);
            }
            info!("countdown: one-shot timer created");
            Ok(Self { handle })
        }
    }

    impl CountdownTimer for EspCountdown {
        fn is_active(&self) -> bool {
            // SAFETY: handle is valid for the lifetime of `self`.
            unsafe { esp_timer_is_active(self.handle) }
        }

        fn start(&mut self, period_ms: u32, ctx: TimerContext) -> Result<(), TimerError> {
            if period_ms == 0 {
                return Err(TimerError::InvalidPeriod);
            }
            COUNTDOWN_CTX.store(ctx.0, Ordering::Release);
            // SAFETY: handle is valid; the timer is stopped (trait contract).
            let ret = unsafe { esp_timer_start_once(self.handle, u64::from(period_ms) * 1000) };
            if ret != ESP_OK {
                return Err(TimerError::CommandFailed);
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), TimerError> {
            // SAFETY: handle is valid for the lifetime of `self`.
            let ret = unsafe { esp_timer_stop(self.handle) };
            // ESP_ERR_INVALID_STATE: already stopped (expired), which is fine.
            if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
                return Err(TimerError::CommandFailed);
            }
            Ok(())
        }
    }

    impl Drop for EspCountdown {
        fn drop(&mut self) {
            // SAFETY: handle is valid and not used after this point.
            unsafe {
                esp_timer_stop(self.handle);
                esp_timer_delete(self.handle);
            }
        }
    }
}
