//! App task integration tests: full event flows from producer callbacks
//! through dispatch into the mock peripherals and stack.

use contact_sensor::app::ports::{
    ContactAction, ContactState, IdentifyEffect, LedId,
};
use contact_sensor::app::task::AppTask;
use contact_sensor::app::work::StackWork;
use contact_sensor::config::AppConfig;
use contact_sensor::drivers::contact_sensor::{reed_switch_event_handler, ContactSensor};
use contact_sensor::drivers::button::{
    button_left_event_handler, button_right_event_handler, ButtonEventMask,
};
use contact_sensor::error::Error;
use contact_sensor::events::{AppEvent, ButtonAction, EventQueue, EVENT_QUEUE_CAP};
use contact_sensor::fsm::Function;
use log::Level;

use crate::log_capture::{at, capture};
use crate::mock_hw::{LedCall, MockHardware, MockStack};

const LEFT_LONG: AppEvent = AppEvent::ButtonLeft(ButtonAction::LongClicked);
const RIGHT_LONG: AppEvent = AppEvent::ButtonRight(ButtonAction::LongClicked);
const LEFT_CLICK: AppEvent = AppEvent::ButtonLeft(ButtonAction::Clicked);

fn setup(queue: &EventQueue) -> (AppTask<'_>, MockHardware, MockStack) {
    (
        AppTask::new(queue, AppConfig::default()),
        MockHardware::new(ContactState::Opened),
        MockStack::default(),
    )
}

// ── Queue capacity ────────────────────────────────────────────

#[test]
fn eleventh_post_is_rejected_without_blocking() {
    let q = EventQueue::new();
    let (task, _, _) = setup(&q);

    for _ in 0..EVENT_QUEUE_CAP {
        task.post_event(LEFT_CLICK).unwrap();
    }
    assert_eq!(task.post_event(LEFT_CLICK), Err(Error::QueueFull));
    assert_eq!(q.len(), EVENT_QUEUE_CAP);
}

#[test]
fn isr_drops_are_counted_then_cleared_by_dispatch() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    for _ in 0..EVENT_QUEUE_CAP + 2 {
        let _ = q.post_event_from_isr(AppEvent::None);
    }
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(q.take_isr_dropped(), 0);
}

// ── Factory reset countdown ───────────────────────────────────

#[test]
fn countdown_expiry_requests_factory_reset() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    button_left_event_handler(&q, ButtonEventMask::LONG_CLICKED);
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(task.function(), Function::FactoryReset);
    assert_eq!(hw.last_led(LedId::Alert), Some(LedCall::Blink(LedId::Alert, 100)));

    assert!(hw.advance_to(6000, &q));
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(stack.factory_resets, 1);
    assert!(!task.is_timer_active());
    // Irrevocable: nothing releases the function afterwards.
    assert_eq!(task.function(), Function::FactoryReset);
}

#[test]
fn double_arm_fires_once_at_later_duration() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    q.post_event(LEFT_LONG).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    hw.advance_to(3000, &q);
    q.post_event(LEFT_LONG).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(task.function(), Function::FactoryReset);
    assert_eq!(hw.timer_starts, vec![6000, 6000]);

    // The first arm's deadline passes without a fire.
    assert!(!hw.advance_to(6000, &q));
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(stack.factory_resets, 0);

    assert!(hw.advance_to(9000, &q));
    assert!(!hw.advance_to(20_000, &q));
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(stack.factory_resets, 1);
}

#[test]
fn click_during_countdown_cancels_it() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    q.post_event(LEFT_LONG).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);
    button_right_event_handler(&q, ButtonEventMask::CLICKED);
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(task.function(), Function::NoneSelected);
    assert_eq!(hw.last_led(LedId::Alert), Some(LedCall::Off(LedId::Alert)));
    assert!(!hw.advance_to(10_000, &q));
    assert_eq!(stack.factory_resets, 0);
    assert_eq!(hw.sensor_state(), ContactState::Opened);
}

#[test]
fn failed_stop_still_clears_flag_and_ignores_late_expiry() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    q.post_event(LEFT_LONG).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    hw.fail_timer_stop = true;
    q.post_event(LEFT_CLICK).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);
    assert!(!task.is_timer_active());
    assert_eq!(task.function(), Function::NoneSelected);

    // The timer kept running and fires anyway.
    assert!(hw.advance_to(6000, &q));
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(stack.factory_resets, 0);
}

#[test]
fn timer_start_failure_leaves_function_free() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);
    hw.fail_timer_start = true;

    q.post_event(LEFT_LONG).unwrap();
    q.post_event(LEFT_CLICK).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    assert!(!task.is_timer_active());
    // The click was a normal toggle, not a cancel.
    assert_eq!(hw.sensor_state(), ContactState::Closed);
    assert_eq!(task.function(), Function::NoneSelected);
}

// ── Commissioning ─────────────────────────────────────────────

#[test]
fn right_long_click_opens_commissioning_window_once() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    q.post_event(RIGHT_LONG).unwrap();
    q.post_event(RIGHT_LONG).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(stack.window_opens, 1);
    assert!(stack.advertising);
}

#[test]
fn commissioning_failure_disables_advertising() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);
    stack.fail_window = true;

    q.post_event(RIGHT_LONG).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(stack.window_opens, 1);
    assert!(!stack.advertising);
    assert_eq!(task.function(), Function::NoneSelected);
}

// ── Contact ───────────────────────────────────────────────────

#[test]
fn click_toggles_contact_and_syncs_attribute() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    q.post_event(LEFT_CLICK).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(hw.last_led(LedId::Status), Some(LedCall::On(LedId::Status)));

    q.post_event(AppEvent::ButtonRight(ButtonAction::Clicked)).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(hw.last_led(LedId::Status), Some(LedCall::Off(LedId::Status)));

    assert_eq!(
        stack.work,
        vec![
            StackWork::SyncBooleanState { endpoint: 1, closed: true },
            StackWork::SyncBooleanState { endpoint: 1, closed: false },
        ]
    );
    assert_eq!(task.function(), Function::NoneSelected);
}

#[test]
fn state_changed_drives_status_led_immediately() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    task.on_state_changed(ContactState::Closed, &mut hw, &mut stack);
    assert_eq!(hw.last_led(LedId::Status), Some(LedCall::On(LedId::Status)));

    task.on_state_changed(ContactState::Opened, &mut hw, &mut stack);
    assert_eq!(hw.last_led(LedId::Status), Some(LedCall::Off(LedId::Status)));
}

#[test]
fn redundant_contact_action_releases_function() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    task.post_contact_action_request(ContactAction::SignalLost).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(task.function(), Function::NoneSelected);
    assert!(stack.work.is_empty());
}

#[test]
fn invalid_contact_code_is_dropped() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    q.post_event(AppEvent::Contact(0x7f)).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(hw.sensor_state(), ContactState::Opened);
    assert_eq!(task.function(), Function::NoneSelected);
}

#[test]
fn contact_declined_during_countdown() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    q.post_event(LEFT_LONG).unwrap();
    task.post_contact_action_request(ContactAction::SignalDetected).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(hw.sensor_state(), ContactState::Opened);
    assert_eq!(task.function(), Function::FactoryReset);
}

#[test]
fn schedule_failure_is_absorbed() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);
    stack.fail_schedule = true;

    q.post_event(LEFT_CLICK).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(hw.sensor_state(), ContactState::Closed);
    assert_eq!(task.function(), Function::NoneSelected);
}

// ── Attribute handoff ─────────────────────────────────────────

#[test]
fn two_updates_give_two_ordered_work_items() {
    let q = EventQueue::new();
    let (task, mut hw, mut stack) = setup(&q);

    task.update_cluster_state(&hw, &mut stack);
    hw.sensor = ContactSensor::new(ContactState::Closed);
    task.update_cluster_state(&hw, &mut stack);

    assert_eq!(
        stack.work,
        vec![
            StackWork::SyncBooleanState { endpoint: 1, closed: false },
            StackWork::SyncBooleanState { endpoint: 1, closed: true },
        ]
    );
}

#[test]
fn device_state_read_back_is_scheduled() {
    let q = EventQueue::new();
    let (task, hw, mut stack) = setup(&q);

    task.update_device_state(&hw, &mut stack);

    assert_eq!(
        stack.work,
        vec![StackWork::ReadBackBooleanState { endpoint: 1, expected: false }]
    );
}

// ── Identify ──────────────────────────────────────────────────

#[test]
fn identify_blocks_contact_until_stopped() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    AppTask::identify_start_callback(&q, IdentifyEffect::Blink);
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(task.function(), Function::Identify);
    assert_eq!(hw.last_led(LedId::Status), Some(LedCall::Blink(LedId::Status, 500)));

    task.post_contact_action_request(ContactAction::SignalDetected).unwrap();
    let (_, records) = capture(|| task.dispatch_pending(&mut hw, &mut stack));
    assert_eq!(hw.sensor_state(), ContactState::Opened);
    assert_eq!(task.function(), Function::Identify);
    let warnings = at(&records, Level::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Could not change contact state"));

    AppTask::identify_stop_callback(&q, IdentifyEffect::Blink);
    task.post_contact_action_request(ContactAction::SignalDetected).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(hw.sensor_state(), ContactState::Closed);
    assert_eq!(task.function(), Function::NoneSelected);
    assert_eq!(hw.last_led(LedId::Status), Some(LedCall::On(LedId::Status)));
}

#[test]
fn reed_edge_during_identify_updates_sensor_and_attribute() {
    let q = EventQueue::new();
    let (mut task, _, mut stack) = setup(&q);
    let mut hw = MockHardware::new(ContactState::Closed);

    AppTask::identify_start_callback(&q, IdentifyEffect::Blink);
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(task.function(), Function::Identify);

    reed_switch_event_handler(&q, false);
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(hw.sensor_state(), ContactState::Opened);
    assert_eq!(task.function(), Function::Identify);
    assert_eq!(hw.last_led(LedId::Status), Some(LedCall::Off(LedId::Status)));
    assert_eq!(
        stack.work.last(),
        Some(&StackWork::SyncBooleanState { endpoint: 1, closed: false })
    );

    AppTask::identify_stop_callback(&q, IdentifyEffect::Blink);
    reed_switch_event_handler(&q, true);
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(task.function(), Function::NoneSelected);
    assert_eq!(hw.sensor_state(), ContactState::Closed);
    assert_eq!(
        stack.work.last(),
        Some(&StackWork::SyncBooleanState { endpoint: 1, closed: true })
    );
}

#[test]
fn reed_edge_during_countdown_keeps_countdown() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    q.post_event(LEFT_LONG).unwrap();
    task.dispatch_pending(&mut hw, &mut stack);

    reed_switch_event_handler(&q, true);
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(hw.sensor_state(), ContactState::Closed);
    assert_eq!(hw.last_led(LedId::Status), Some(LedCall::On(LedId::Status)));
    assert_eq!(
        stack.work,
        vec![StackWork::SyncBooleanState { endpoint: 1, closed: true }]
    );
    assert_eq!(task.function(), Function::FactoryReset);
    assert!(task.is_timer_active());

    assert!(hw.advance_to(6000, &q));
    task.dispatch_pending(&mut hw, &mut stack);
    assert_eq!(stack.factory_resets, 1);
}

#[test]
fn identify_declined_during_countdown() {
    let q = EventQueue::new();
    let (mut task, mut hw, mut stack) = setup(&q);

    q.post_event(LEFT_LONG).unwrap();
    AppTask::identify_start_callback(&q, IdentifyEffect::Blink);
    task.dispatch_pending(&mut hw, &mut stack);

    assert_eq!(task.function(), Function::FactoryReset);
    assert_eq!(hw.last_led(LedId::Status), None);

    // A stray stop must not release the countdown's claim.
    task.on_identify_stop(IdentifyEffect::Blink);
    assert_eq!(task.function(), Function::FactoryReset);
}

#[test]
fn non_blink_effects_are_ignored() {
    let q = EventQueue::new();
    let (mut task, mut hw, _) = setup(&q);

    task.on_identify_start(IdentifyEffect::Breathe, &mut hw);
    assert_eq!(task.function(), Function::NoneSelected);
    assert!(hw.led_calls.is_empty());
}
