//! Mock adapters for integration tests.
//!
//! Records every LED command and stack request so tests can assert on the
//! full history without touching real GPIO or a real protocol stack.

use contact_sensor::app::ports::{
    ContactAction, ContactSensorPort, ContactState, CountdownTimer, LedId, LedPort, StackPort,
};
use contact_sensor::app::work::StackWork;
use contact_sensor::drivers::contact_sensor::ContactSensor;
use contact_sensor::drivers::countdown::SoftCountdown;
use contact_sensor::error::{StackError, TimerError};
use contact_sensor::events::{EventQueue, TimerContext};

// ── LED call record ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCall {
    On(LedId),
    Off(LedId),
    Blink(LedId, u32),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub sensor: ContactSensor,
    pub countdown: SoftCountdown,
    pub led_calls: Vec<LedCall>,
    pub fail_timer_start: bool,
    pub fail_timer_stop: bool,
    pub timer_starts: Vec<u32>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(initial: ContactState) -> Self {
        Self {
            sensor: ContactSensor::new(initial),
            countdown: SoftCountdown::new(),
            led_calls: Vec::new(),
            fail_timer_start: false,
            fail_timer_stop: false,
            timer_starts: Vec::new(),
        }
    }

    pub fn sensor_state(&self) -> ContactState {
        self.sensor.contact_state()
    }

    /// Most recent command sent to `led`.
    pub fn last_led(&self, led: LedId) -> Option<LedCall> {
        self.led_calls
            .iter()
            .rev()
            .find(|c| match c {
                LedCall::On(l) | LedCall::Off(l) | LedCall::Blink(l, _) => *l == led,
            })
            .copied()
    }

    /// Advance the virtual clock; a due countdown posts its expiry.
    pub fn advance_to(&mut self, now_ms: u64, queue: &EventQueue) -> bool {
        self.countdown.poll(now_ms, queue)
    }
}

impl ContactSensorPort for MockHardware {
    fn contact_state(&self) -> ContactState {
        self.sensor.contact_state()
    }

    fn initiate_action(&mut self, action: ContactAction) -> Option<ContactState> {
        self.sensor.initiate_action(action)
    }
}

impl LedPort for MockHardware {
    fn led_on(&mut self, led: LedId) {
        self.led_calls.push(LedCall::On(led));
    }

    fn led_off(&mut self, led: LedId) {
        self.led_calls.push(LedCall::Off(led));
    }

    fn led_blink(&mut self, led: LedId, period_ms: u32) {
        self.led_calls.push(LedCall::Blink(led, period_ms));
    }
}

impl CountdownTimer for MockHardware {
    fn is_active(&self) -> bool {
        self.countdown.is_active()
    }

    fn start(&mut self, period_ms: u32, ctx: TimerContext) -> Result<(), TimerError> {
        if self.fail_timer_start {
            return Err(TimerError::CommandFailed);
        }
        self.timer_starts.push(period_ms);
        self.countdown.start(period_ms, ctx)
    }

    fn stop(&mut self) -> Result<(), TimerError> {
        if self.fail_timer_stop {
            return Err(TimerError::CommandFailed);
        }
        self.countdown.stop()
    }
}

// ── MockStack ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStack {
    pub work: Vec<StackWork>,
    pub factory_resets: u32,
    pub advertising: bool,
    pub window_opens: u32,
    pub fail_window: bool,
    pub fail_schedule: bool,
}

impl StackPort for MockStack {
    fn schedule_factory_reset(&mut self) {
        self.factory_resets += 1;
    }

    fn is_advertising_enabled(&self) -> bool {
        self.advertising
    }

    fn set_advertising_enabled(&mut self, enabled: bool) {
        self.advertising = enabled;
    }

    fn open_commissioning_window(&mut self) -> Result<(), StackError> {
        self.window_opens += 1;
        if self.fail_window {
            // A failed open can leave advertising half-started.
            self.advertising = true;
            return Err(StackError::CommissioningWindow);
        }
        self.advertising = true;
        Ok(())
    }

    fn schedule_work(&mut self, work: StackWork) -> Result<(), StackError> {
        if self.fail_schedule {
            return Err(StackError::WorkQueueFull);
        }
        self.work.push(work);
        Ok(())
    }
}
