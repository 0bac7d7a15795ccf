//! Discrete indicator LEDs.
//!
//! Each LED is a single GPIO behind [`embedded_hal::digital::OutputPin`]
//! (active high).  A [`StatusLed`] holds one of three modes and is
//! advanced by [`StatusLed::tick`] from the LED thread.
//!
//! The dispatch task never touches pins.  It talks to the LEDs through a
//! [`LedLink`], which implements [`LedPort`] by signalling the requested
//! mode into one [`LedSignals`] slot per LED.  A newer mode overwrites one
//! the LED thread has not picked up yet, so a burst of commands always
//! settles on the last one.  The LED thread takes pending modes into a
//! [`LedBank`] before every tick.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::{LedId, LedPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedMode {
    #[default]
    Off,
    On,
    /// Toggle every `period_ms`.
    Blink { period_ms: u32 },
}

pub struct StatusLed<P: OutputPin> {
    pin: P,
    mode: LedMode,
    lit: bool,
    last_toggle_ms: u64,
}

impl<P: OutputPin> StatusLed<P> {
    /// Wraps `pin` and drives it low.
    pub fn new(pin: P) -> Self {
        let mut led = Self {
            pin,
            mode: LedMode::Off,
            lit: true,
            last_toggle_ms: 0,
        };
        led.drive(false);
        led
    }

    pub fn set_mode(&mut self, mode: LedMode, now_ms: u64) {
        self.mode = mode;
        self.last_toggle_ms = now_ms;
        match mode {
            LedMode::Off => self.drive(false),
            // A blink starts in the lit half so the change is visible at once.
            LedMode::On | LedMode::Blink { .. } => self.drive(true),
        }
    }

    pub fn tick(&mut self, now_ms: u64) {
        let LedMode::Blink { period_ms } = self.mode else {
            return;
        };
        if now_ms.saturating_sub(self.last_toggle_ms) >= u64::from(period_ms) {
            self.last_toggle_ms = now_ms;
            self.drive(!self.lit);
        }
    }

    pub fn mode(&self) -> LedMode {
        self.mode
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn drive(&mut self, lit: bool) {
        if lit == self.lit {
            return;
        }
        let res = if lit {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match res {
            Ok(()) => self.lit = lit,
            Err(e) => warn!("LED pin write failed: {:?}", e),
        }
    }
}

// ── Command link ──────────────────────────────────────────────

/// Latest requested mode per LED.
pub struct LedSignals {
    status: Signal<CriticalSectionRawMutex, LedMode>,
    alert: Signal<CriticalSectionRawMutex, LedMode>,
}

impl Default for LedSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl LedSignals {
    pub const fn new() -> Self {
        Self {
            status: Signal::new(),
            alert: Signal::new(),
        }
    }

    fn slot(&self, led: LedId) -> &Signal<CriticalSectionRawMutex, LedMode> {
        match led {
            LedId::Status => &self.status,
            LedId::Alert => &self.alert,
        }
    }

    /// Request `mode`, replacing any mode not yet taken.
    pub fn set(&self, led: LedId, mode: LedMode) {
        self.slot(led).signal(mode);
    }

    /// Take the pending mode for `led`, if any.
    pub fn take(&self, led: LedId) -> Option<LedMode> {
        self.slot(led).try_take()
    }
}

/// Sending half used by the dispatch task.
#[derive(Clone, Copy)]
pub struct LedLink<'a> {
    signals: &'a LedSignals,
}

impl<'a> LedLink<'a> {
    pub fn new(signals: &'a LedSignals) -> Self {
        Self { signals }
    }
}

impl LedPort for LedLink<'_> {
    fn led_on(&mut self, led: LedId) {
        self.signals.set(led, LedMode::On);
    }

    fn led_off(&mut self, led: LedId) {
        self.signals.set(led, LedMode::Off);
    }

    fn led_blink(&mut self, led: LedId, period_ms: u32) {
        self.signals.set(led, LedMode::Blink { period_ms });
    }
}

/// Both indicator LEDs, owned by the LED thread.
pub struct LedBank<S: OutputPin, A: OutputPin> {
    pub status: StatusLed<S>,
    pub alert: StatusLed<A>,
}

impl<S: OutputPin, A: OutputPin> LedBank<S, A> {
    pub fn new(status: S, alert: A) -> Self {
        Self {
            status: StatusLed::new(status),
            alert: StatusLed::new(alert),
        }
    }

    pub fn apply(&mut self, led: LedId, mode: LedMode, now_ms: u64) {
        debug!("LED {:?} -> {:?}", led, mode);
        match led {
            LedId::Status => self.status.set_mode(mode, now_ms),
            LedId::Alert => self.alert.set_mode(mode, now_ms),
        }
    }

    /// Apply pending modes, then advance blink phases.
    pub fn service(&mut self, signals: &LedSignals, now_ms: u64) {
        for led in [LedId::Status, LedId::Alert] {
            if let Some(mode) = signals.take(led) {
                self.apply(led, mode, now_ms);
            }
        }
        self.status.tick(now_ms);
        self.alert.tick(now_ms);
    }
}
