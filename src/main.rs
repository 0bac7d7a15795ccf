//! Contact sensor firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  GPIO ISRs        esp_timer task       stack thread          │
//! │  (buttons, reed)  (countdown expiry)   (StackContext)        │
//! │      │                  │                  ▲                 │
//! │      ▼                  ▼                  │ StackWork       │
//! │  ┌──────────────────────────────┐   ┌─────────────┐          │
//! │  │        EVENT_QUEUE (10)      │──▶│   AppTask   │──▶ LED   │
//! │  └──────────────────────────────┘   │ (main task) │   thread │
//! │                                      └─────────────┘          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::thread;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use log::{error, info, warn};

use contact_sensor::adapters::hardware::HardwareAdapter;
use contact_sensor::adapters::local_stack::{
    AttributeTable, IdentifyCallbacks, LocalStack, StackContext, WorkChannel,
};
use contact_sensor::adapters::nvs::NvsConfigStore;
use contact_sensor::adapters::time::MonotonicClock;
use contact_sensor::app::ports::ContactState;
use contact_sensor::app::task::AppTask;
use contact_sensor::drivers::contact_sensor::ContactSensor;
use contact_sensor::drivers::countdown::EspCountdown;
use contact_sensor::drivers::hw_init;
use contact_sensor::drivers::status_led::{LedBank, LedLink, LedSignals};
use contact_sensor::events::EventQueue;
use contact_sensor::pins;

static EVENT_QUEUE: EventQueue = EventQueue::new();
static LED_SIGNALS: LedSignals = LedSignals::new();
static WORK_CHANNEL: WorkChannel = WorkChannel::new();

// `PinDriver` needs the typed pin, so the LED pins are named below.
const _: () = assert!(pins::STATUS_LED_GPIO == 6);
const _: () = assert!(pins::ALERT_LED_GPIO == 7);

/// Fatal init failure: log and park.  The task watchdog resets the chip.
fn halt(what: &str, e: &dyn core::fmt::Display) -> ! {
    error!("{} failed: {} - halting", what, e);
    loop {
        thread::sleep(Duration::from_secs(1));
    }
}

fn factory_reset() {
    match NvsConfigStore::new().and_then(|nvs| nvs.erase_all()) {
        Ok(()) => info!("Factory reset: storage erased, restarting"),
        Err(e) => error!("Factory reset: erase failed ({}), restarting anyway", e),
    }
    // SAFETY: esp_restart does not return.
    unsafe { esp_idf_svc::sys::esp_restart() };
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Contact sensor v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config ─────────────────────────────────────────────
    let config = match NvsConfigStore::new() {
        Ok(nvs) => nvs.load(),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            Default::default()
        }
    };

    // ── 3. Board ──────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let status_pin = PinDriver::output(peripherals.pins.gpio6)?; // STATUS_LED_GPIO
    let alert_pin = PinDriver::output(peripherals.pins.gpio7)?; // ALERT_LED_GPIO

    if let Err(e) = hw_init::init_inputs(&EVENT_QUEUE, config.long_press_ms) {
        halt("input init", &e);
    }
    let countdown = match EspCountdown::new(&EVENT_QUEUE) {
        Ok(t) => t,
        Err(e) => halt("countdown timer init", &e),
    };

    let initial = if hw_init::reed_switch_closed() {
        ContactState::Closed
    } else {
        ContactState::Opened
    };
    let mut hw = HardwareAdapter::new(
        ContactSensor::new(initial),
        countdown,
        LedLink::new(&LED_SIGNALS),
    );

    // ── 4. LED thread ─────────────────────────────────────────
    let led_tick = Duration::from_millis(u64::from(config.led_tick_ms));
    thread::Builder::new()
        .name("leds".into())
        .stack_size(3 * 1024)
        .spawn(move || {
            let clock = MonotonicClock::new();
            let mut bank = LedBank::new(status_pin, alert_pin);
            loop {
                bank.service(&LED_SIGNALS, clock.uptime_ms());
                thread::sleep(led_tick);
            }
        })?;

    // ── 5. Stack context ──────────────────────────────────────
    let mut table = AttributeTable::new();
    if let Err(status) = table.add_endpoint(config.boolean_state_endpoint, initial.is_closed()) {
        halt("attribute table", &status);
    }
    thread::Builder::new()
        .name("stack".into())
        .stack_size(6 * 1024)
        .spawn(move || {
            StackContext::new(&WORK_CHANNEL, table)
                .with_identify_callbacks(IdentifyCallbacks {
                    start: |effect| AppTask::identify_start_callback(&EVENT_QUEUE, effect),
                    stop: |effect| AppTask::identify_stop_callback(&EVENT_QUEUE, effect),
                })
                .serve();
        })?;
    let mut stack = LocalStack::new(&WORK_CHANNEL).with_reset_hook(factory_reset);

    // ── 6. App task ───────────────────────────────────────────
    let mut task = AppTask::new(&EVENT_QUEUE, config);
    task.start(&mut hw, &mut stack);

    info!("System ready. Entering dispatch loop.");
    futures_lite::future::block_on(task.run(&mut hw, &mut stack));
    Ok(())
}
