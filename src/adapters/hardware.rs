//! Hardware adapter: bridges the board drivers to the app task's ports.
//!
//! Owns the logical contact sensor and the countdown timer, and forwards
//! LED requests to the LED thread through a [`LedLink`].  The app task
//! sees only [`Peripherals`](crate::app::ports::Peripherals).

use crate::app::ports::{
    ContactAction, ContactSensorPort, ContactState, CountdownTimer, LedId, LedPort,
};
use crate::drivers::contact_sensor::ContactSensor;
use crate::drivers::status_led::LedLink;
use crate::error::TimerError;
use crate::events::TimerContext;

pub struct HardwareAdapter<'a, T: CountdownTimer> {
    sensor: ContactSensor,
    countdown: T,
    leds: LedLink<'a>,
}

impl<'a, T: CountdownTimer> HardwareAdapter<'a, T> {
    pub fn new(sensor: ContactSensor, countdown: T, leds: LedLink<'a>) -> Self {
        Self {
            sensor,
            countdown,
            leds,
        }
    }

    pub fn countdown(&self) -> &T {
        &self.countdown
    }

    pub fn countdown_mut(&mut self) -> &mut T {
        &mut self.countdown
    }
}

// ── ContactSensorPort ─────────────────────────────────────────

impl<T: CountdownTimer> ContactSensorPort for HardwareAdapter<'_, T> {
    fn contact_state(&self) -> ContactState {
        self.sensor.contact_state()
    }

    fn initiate_action(&mut self, action: ContactAction) -> Option<ContactState> {
        self.sensor.initiate_action(action)
    }
}

// ── LedPort ───────────────────────────────────────────────────

impl<T: CountdownTimer> LedPort for HardwareAdapter<'_, T> {
    fn led_on(&mut self, led: LedId) {
        self.leds.led_on(led);
    }

    fn led_off(&mut self, led: LedId) {
        self.leds.led_off(led);
    }

    fn led_blink(&mut self, led: LedId, period_ms: u32) {
        self.leds.led_blink(led, period_ms);
    }
}

// ── CountdownTimer ────────────────────────────────────────────

impl<T: CountdownTimer> CountdownTimer for HardwareAdapter<'_, T> {
    fn is_active(&self) -> bool {
        self.countdown.is_active()
    }

    fn start(&mut self, period_ms: u32, ctx: TimerContext) -> Result<(), TimerError> {
        self.countdown.start(period_ms, ctx)
    }

    fn stop(&mut self) -> Result<(), TimerError> {
        self.countdown.stop()
    }
}
