//! The application task: event dispatch and exclusive-function handling.
//!
//! [`AppTask`] is the single consumer of the [`EventQueue`].  Every
//! mutation of application state (active function, countdown flag, LED
//! commands) happens inside [`AppTask::dispatch_event`], on one task, so
//! handlers never need locks against each other.
//!
//! ```text
//!  Button ISR ──┐
//!  Timer cb  ───┼──▶ EventQueue ──▶ dispatch_event ──▶ handler
//!  Identify cb ─┤                                        │
//!  post_*() ────┘                     Peripherals ◀──────┤
//!                                     StackPort   ◀──────┘ (schedule_work)
//! ```
//!
//! Peripherals and the stack are injected at call sites, the same way for
//! the forever-running [`run`](AppTask::run) loop and for tests that drive
//! [`dispatch_pending`](AppTask::dispatch_pending).

use log::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::events::{AppEvent, ButtonAction, EventQueue, TimerContext};
use crate::fsm::{Function, FunctionSlot};

use super::ports::{
    ContactAction, ContactSensorPort, ContactState, CountdownTimer, IdentifyEffect, IdentifyPhase,
    LedId, LedPort, Peripherals, StackPort,
};
use super::work::StackWork;

pub struct AppTask<'q> {
    queue: &'q EventQueue,
    config: AppConfig,
    function: FunctionSlot,
    /// Mirrors whether the countdown timer is armed.
    timer_active: bool,
    /// Context of the current (or last) countdown arm.
    timer_generation: u32,
}

impl<'q> AppTask<'q> {
    pub fn new(queue: &'q EventQueue, config: AppConfig) -> Self {
        Self {
            queue,
            config,
            function: FunctionSlot::new(),
            timer_active: false,
            timer_generation: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring LEDs and the exposed attribute in line with the sensor before
    /// the first event is handled, then check the write landed.
    pub fn start(&mut self, hw: &mut impl Peripherals, stack: &mut impl StackPort) {
        hw.led_off(LedId::Alert);
        self.show_contact_state(hw.contact_state(), hw);
        self.update_cluster_state(&*hw, stack);
        self.update_device_state(&*hw, stack);
        info!(
            "App task started (contact {:?}, endpoint {})",
            hw.contact_state(),
            self.config.boolean_state_endpoint
        );
    }

    /// The dispatch loop.  Never returns.
    pub async fn run(&mut self, hw: &mut impl Peripherals, stack: &mut impl StackPort) {
        loop {
            self.dispatch_next(hw, stack).await;
        }
    }

    /// Wait for one event and handle it.
    pub async fn dispatch_next(&mut self, hw: &mut impl Peripherals, stack: &mut impl StackPort) {
        let event = self.queue.receive().await;
        self.dispatch_event(event, hw, stack);
    }

    /// Handle every event already queued.  Returns how many were handled.
    pub fn dispatch_pending(
        &mut self,
        hw: &mut impl Peripherals,
        stack: &mut impl StackPort,
    ) -> usize {
        let mut handled = 0;
        while let Some(event) = self.queue.try_receive() {
            self.dispatch_event(event, hw, stack);
            handled += 1;
        }
        handled
    }

    pub fn dispatch_event(
        &mut self,
        event: AppEvent,
        hw: &mut impl Peripherals,
        stack: &mut impl StackPort,
    ) {
        let dropped = self.queue.take_isr_dropped();
        if dropped > 0 {
            warn!("Failed to post {} event(s) from interrupt context: queue full", dropped);
        }

        match event {
            AppEvent::ButtonLeft(action) => self.button_left_handler(action, hw, stack),
            AppEvent::ButtonRight(action) => self.button_right_handler(action, hw, stack),
            AppEvent::Timer(ctx) => self.function_timer_handler(ctx, stack),
            AppEvent::Contact(code) => {
                self.contact_action_handler(ContactAction::from_code(code), hw, stack);
            }
            AppEvent::SensorChanged(state) => self.sensor_changed_handler(state, hw, stack),
            AppEvent::Identify { effect, phase } => match phase {
                IdentifyPhase::Start => self.on_identify_start(effect, hw),
                IdentifyPhase::Stop => self.on_identify_stop(effect),
            },
            AppEvent::None => warn!("Event received with no handler. Dropping event."),
        }
    }

    // ── Posting ───────────────────────────────────────────────

    /// Generic event injection from task context.
    pub fn post_event(&self, event: AppEvent) -> Result<()> {
        self.queue.post_event(event)
    }

    /// Queue a contact action for the dispatch task.
    pub fn post_contact_action_request(&self, action: ContactAction) -> Result<()> {
        self.queue.post_event(AppEvent::Contact(action.code()))
    }

    /// Identify cluster start callback.  Runs on the stack context, so it
    /// only posts.
    pub fn identify_start_callback(queue: &EventQueue, effect: IdentifyEffect) {
        let _ = queue.post_event(AppEvent::Identify {
            effect,
            phase: IdentifyPhase::Start,
        });
    }

    /// Identify cluster stop callback.
    pub fn identify_stop_callback(queue: &EventQueue, effect: IdentifyEffect) {
        let _ = queue.post_event(AppEvent::Identify {
            effect,
            phase: IdentifyPhase::Stop,
        });
    }

    // ── Button handlers ───────────────────────────────────────

    fn button_left_handler(
        &mut self,
        action: ButtonAction,
        hw: &mut impl Peripherals,
        stack: &mut impl StackPort,
    ) {
        match action {
            ButtonAction::LongClicked => self.arm_factory_reset(hw),
            ButtonAction::Clicked => self.button_clicked(hw, stack),
        }
    }

    fn button_right_handler(
        &mut self,
        action: ButtonAction,
        hw: &mut impl Peripherals,
        stack: &mut impl StackPort,
    ) {
        match action {
            ButtonAction::LongClicked => self.toggle_commissioning_window(stack),
            ButtonAction::Clicked => self.button_clicked(hw, stack),
        }
    }

    /// A short click cancels a pending factory reset; otherwise it toggles
    /// the contact state.
    fn button_clicked(&mut self, hw: &mut impl Peripherals, stack: &mut impl StackPort) {
        if self.function.is(Function::FactoryReset) {
            self.cancel_factory_reset(hw);
            return;
        }
        let action = ContactAction::toggle(hw.contact_state());
        self.contact_action_handler(action, hw, stack);
    }

    fn arm_factory_reset(&mut self, hw: &mut impl Peripherals) {
        if self.function.is(Function::FactoryReset) {
            info!("Factory reset countdown restarted");
        } else if let Err(e) = self.function.claim(Function::FactoryReset) {
            warn!("Could not initiate factory reset: {}", e);
            return;
        } else {
            info!(
                "Factory reset triggered. Device resets in {} ms, click any button to cancel",
                self.config.factory_reset_countdown_ms
            );
        }

        match self.start_timer(self.config.factory_reset_countdown_ms, hw) {
            Ok(()) => hw.led_blink(LedId::Alert, self.config.countdown_blink_ms),
            Err(_) => {
                // Nothing else would release the claim.
                self.function.release(Function::FactoryReset);
                hw.led_off(LedId::Alert);
            }
        }
    }

    fn cancel_factory_reset(&mut self, hw: &mut impl Peripherals) {
        self.cancel_timer(hw);
        self.function.release(Function::FactoryReset);
        hw.led_off(LedId::Alert);
        info!("Factory reset has been canceled");
    }

    fn toggle_commissioning_window(&mut self, stack: &mut impl StackPort) {
        if stack.is_advertising_enabled() {
            info!("BLE advertisements already enabled");
            return;
        }
        match stack.open_commissioning_window() {
            Ok(()) => info!("Enabled BLE advertisements"),
            Err(e) => {
                warn!("Commissioning window: {}", e);
                stack.set_advertising_enabled(false);
                info!("Disabled BLE advertisements");
            }
        }
    }

    // ── Countdown ─────────────────────────────────────────────

    fn function_timer_handler(&mut self, ctx: TimerContext, stack: &mut impl StackPort) {
        if !self.timer_active || ctx != TimerContext(self.timer_generation) {
            debug!("Stale countdown expiry {:?} ignored", ctx);
            return;
        }
        self.timer_active = false;

        if !self.function.is(Function::FactoryReset) {
            warn!(
                "Countdown expired while {:?} is active, nothing to do",
                self.function.current()
            );
            return;
        }

        info!("Device will factory reset...");
        // Function stays FactoryReset: the device does not come back from this.
        stack.schedule_factory_reset();
    }

    /// Arm the countdown, restarting it from the full period if it is
    /// already running.
    pub fn start_timer(&mut self, timeout_ms: u32, hw: &mut impl CountdownTimer) -> Result<()> {
        if self.timer_active || hw.is_active() {
            warn!("app timer already started!");
            self.cancel_timer(hw);
        }

        self.timer_generation = self.timer_generation.wrapping_add(1);
        if let Err(e) = hw.start(timeout_ms, TimerContext(self.timer_generation)) {
            error!("app timer start() failed: {}", e);
            return Err(Error::from(e));
        }
        self.timer_active = true;
        Ok(())
    }

    /// Stop the countdown.
    ///
    /// The active flag is cleared even when the stop command fails.  The
    /// context is bumped as well, so a late expiry from that arm is stale
    /// and ignored.
    pub fn cancel_timer(&mut self, hw: &mut impl CountdownTimer) {
        if let Err(e) = hw.stop() {
            error!("app timer stop() failed: {}", e);
        }
        self.timer_active = false;
        self.timer_generation = self.timer_generation.wrapping_add(1);
    }

    // ── Contact ───────────────────────────────────────────────

    fn contact_action_handler(
        &mut self,
        action: ContactAction,
        hw: &mut impl Peripherals,
        stack: &mut impl StackPort,
    ) {
        if action == ContactAction::Invalid {
            warn!("Invalid contact action dropped");
            return;
        }
        if let Err(e) = self.function.claim(Function::Contact) {
            warn!("Another function is scheduled. Could not change contact state: {}", e);
            return;
        }

        match hw.initiate_action(action) {
            Some(state) => self.on_state_changed(state, hw, stack),
            None => {
                debug!("Contact action {:?} caused no transition", action);
                self.function.release(Function::Contact);
            }
        }
    }

    /// A physical transition.  No claim: the sensor, LED and attribute
    /// follow the switch even while another function is active.
    fn sensor_changed_handler(
        &mut self,
        state: ContactState,
        hw: &mut impl Peripherals,
        stack: &mut impl StackPort,
    ) {
        match hw.initiate_action(ContactAction::for_state(state)) {
            Some(state) => self.on_state_changed(state, hw, stack),
            None => debug!("Sensor already {:?}", state),
        }
    }

    /// Sensor state-change callback.  Must run on the dispatch task.
    pub fn on_state_changed(
        &mut self,
        state: ContactState,
        hw: &mut impl Peripherals,
        stack: &mut impl StackPort,
    ) {
        match state {
            ContactState::Closed => info!("Contact state changed to closed."),
            ContactState::Opened => info!("Contact state changed to open."),
        }
        self.show_contact_state(state, hw);
        self.function.release(Function::Contact);
        self.update_cluster_state(&*hw, stack);
    }

    fn show_contact_state(&self, state: ContactState, hw: &mut impl LedPort) {
        match state {
            ContactState::Closed => hw.led_on(LedId::Status),
            ContactState::Opened => hw.led_off(LedId::Status),
        }
    }

    // ── Attribute sync (cross-context) ────────────────────────

    /// Ask the stack to write the sensor's current reading into the
    /// boolean state attribute.
    pub fn update_cluster_state(&self, hw: &impl ContactSensorPort, stack: &mut impl StackPort) {
        let work = StackWork::SyncBooleanState {
            endpoint: self.config.boolean_state_endpoint,
            closed: hw.is_contact_closed(),
        };
        if let Err(e) = stack.schedule_work(work) {
            error!("Failed to schedule boolean state update: {}", e);
        }
    }

    /// Ask the stack to read the attribute back and report drift.
    pub fn update_device_state(&self, hw: &impl ContactSensorPort, stack: &mut impl StackPort) {
        let work = StackWork::ReadBackBooleanState {
            endpoint: self.config.boolean_state_endpoint,
            expected: hw.is_contact_closed(),
        };
        if let Err(e) = stack.schedule_work(work) {
            error!("Failed to schedule boolean state read-back: {}", e);
        }
    }

    // ── Identify ──────────────────────────────────────────────

    pub fn on_identify_start(&mut self, effect: IdentifyEffect, hw: &mut impl LedPort) {
        if effect != IdentifyEffect::Blink {
            debug!("Identify effect {:?} not supported", effect);
            return;
        }
        if let Err(e) = self.function.claim(Function::Identify) {
            warn!("Another function is scheduled. Could not initiate Identify process: {}", e);
            return;
        }
        info!(
            "Identify process has started. Status LED should blink every {} ms.",
            self.config.identify_blink_ms
        );
        hw.led_off(LedId::Status);
        hw.led_blink(LedId::Status, self.config.identify_blink_ms);
    }

    pub fn on_identify_stop(&mut self, effect: IdentifyEffect) {
        if effect != IdentifyEffect::Blink {
            return;
        }
        if self.function.release(Function::Identify) {
            info!("Identify process has stopped.");
        } else {
            debug!("Identify stop without a running identify process");
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn function(&self) -> Function {
        self.function.current()
    }

    pub fn is_timer_active(&self) -> bool {
        self.timer_active
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn queue(&self) -> &'q EventQueue {
        self.queue
    }
}
