//! Button interrupt handlers.
//!
//! ## Event masks
//!
//! The button driver reports gestures as a bitmask:
//!
//! | Bit           | Meaning                                  |
//! |---------------|------------------------------------------|
//! | `PRESSED`     | Falling edge seen                        |
//! | `RELEASED`    | Rising edge seen                         |
//! | `CLICKED`     | Released before the long-press threshold |
//! | `LONG_CLICKED`| Released after the long-press threshold  |
//!
//! [`button_left_event_handler`] / [`button_right_event_handler`] run in
//! interrupt context: they classify the mask and post through the ISR-safe
//! queue entry, nothing else.  [`PressClassifier`] builds masks from raw
//! edges for boards whose GPIO layer only reports levels.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::events::{AppEvent, ButtonAction, EventQueue};

const DEBOUNCE_MS: u32 = 50;

/// Gesture bits reported for one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonEventMask(pub u8);

impl ButtonEventMask {
    pub const NONE: Self = Self(0);
    pub const PRESSED: Self = Self(0x01);
    pub const RELEASED: Self = Self(0x02);
    pub const CLICKED: Self = Self(0x04);
    pub const LONG_CLICKED: Self = Self(0x08);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl core::ops::BitOr for ButtonEventMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Map a gesture mask to the action the app task understands.  Masks
/// without a click (bare press / release edges) carry no action.
pub fn classify(events: ButtonEventMask) -> Option<ButtonAction> {
    if events.contains(ButtonEventMask::CLICKED) {
        Some(ButtonAction::Clicked)
    } else if events.contains(ButtonEventMask::LONG_CLICKED) {
        Some(ButtonAction::LongClicked)
    } else {
        None
    }
}

/// Left button callback.  Interrupt context.
pub fn button_left_event_handler(queue: &EventQueue, events: ButtonEventMask) {
    if let Some(action) = classify(events) {
        let _ = queue.post_event_from_isr(AppEvent::ButtonLeft(action));
    }
}

/// Right button callback.  Interrupt context.
pub fn button_right_event_handler(queue: &EventQueue, events: ButtonEventMask) {
    if let Some(action) = classify(events) {
        let _ = queue.post_event_from_isr(AppEvent::ButtonRight(action));
    }
}

// ── Edge classifier ───────────────────────────────────────────

/// Turns press/release edges into click / long-click masks.
///
/// All state is atomic so one instance can sit in a `static` and be fed
/// straight from the GPIO ISR.
pub struct PressClassifier {
    long_press_ms: AtomicU32,
    /// Press timestamp; 0 while released.
    pressed_at_ms: AtomicU32,
}

impl PressClassifier {
    pub const fn new(long_press_ms: u32) -> Self {
        Self {
            long_press_ms: AtomicU32::new(long_press_ms),
            pressed_at_ms: AtomicU32::new(0),
        }
    }

    pub fn set_long_press_ms(&self, ms: u32) {
        self.long_press_ms.store(ms, Ordering::Relaxed);
    }

    /// Feed one edge.  `now_ms` is monotonic time in milliseconds.
    pub fn on_edge(&self, pressed: bool, now_ms: u32) -> ButtonEventMask {
        if pressed {
            self.pressed_at_ms.store(now_ms.max(1), Ordering::Release);
            return ButtonEventMask::PRESSED;
        }

        let at = self.pressed_at_ms.swap(0, Ordering::AcqRel);
        if at == 0 {
            return ButtonEventMask::NONE;
        }
        let held_ms = now_ms.wrapping_sub(at);
        if held_ms < DEBOUNCE_MS {
            return ButtonEventMask::NONE;
        }
        if held_ms >= self.long_press_ms.load(Ordering::Relaxed) {
            ButtonEventMask::RELEASED | ButtonEventMask::LONG_CLICKED
        } else {
            ButtonEventMask::RELEASED | ButtonEventMask::CLICKED
        }
    }
}
