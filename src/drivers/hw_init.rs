//! One-shot board initialisation.
//!
//! Configures the button and reed switch inputs and registers their GPIO
//! ISRs.  Called once from `main()` before the dispatch loop starts.  The
//! ISRs only classify the edge and post to the app event queue.

use core::fmt;

use crate::events::EventQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrHandlerFailed(i32),
}

impl fmt::Display for HwInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrHandlerFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
pub use esp::{init_inputs, reed_switch_closed};

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::sys::*;
    use log::info;

    use super::HwInitError;
    use crate::adapters::time::MonotonicClock;
    use crate::drivers::button::{button_left_event_handler, button_right_event_handler, PressClassifier};
    use crate::drivers::contact_sensor::reed_switch_event_handler;
    use crate::events::EventQueue;
    use crate::pins;

    static LEFT_PRESS: PressClassifier = PressClassifier::new(1000);
    static RIGHT_PRESS: PressClassifier = PressClassifier::new(1000);

    /// `esp_timer_get_time` is an RTC counter read, safe in ISR context.
    fn now_ms() -> u32 {
        MonotonicClock::new().uptime_ms_u32()
    }

    fn level_low(pin: i32) -> bool {
        // SAFETY: register read on a configured input; safe in ISR context.
        (unsafe { gpio_get_level(pin) }) == 0
    }

    /// # Safety
    /// `arg` must be the `&'static EventQueue` registered in `init_inputs`.
    unsafe fn queue_from(arg: *mut core::ffi::c_void) -> &'static EventQueue {
        unsafe { &*(arg as *const EventQueue) }
    }

    unsafe extern "C" fn button_left_isr(arg: *mut core::ffi::c_void) {
        // SAFETY: see `queue_from`.
        let queue = unsafe { queue_from(arg) };
        let mask = LEFT_PRESS.on_edge(level_low(pins::BUTTON_LEFT_GPIO), now_ms());
        button_left_event_handler(queue, mask);
    }

    unsafe extern "C" fn button_right_isr(arg: *mut core::ffi::c_void) {
        // SAFETY: see `queue_from`.
        let queue = unsafe { queue_from(arg) };
        let mask = RIGHT_PRESS.on_edge(level_low(pins::BUTTON_RIGHT_GPIO), now_ms());
        button_right_event_handler(queue, mask);
    }

    unsafe extern "C" fn reed_switch_isr(arg: *mut core::ffi::c_void) {
        // SAFETY: see `queue_from`.
        let queue = unsafe { queue_from(arg) };
        reed_switch_event_handler(queue, level_low(pins::REED_SWITCH_GPIO));
    }

    /// Current reed switch level, for seeding the logical sensor at boot.
    pub fn reed_switch_closed() -> bool {
        level_low(pins::REED_SWITCH_GPIO)
    }

    /// Configure inputs and register ISRs that post into `queue`.
    pub fn init_inputs(queue: &'static EventQueue, long_press_ms: u32) -> Result<(), HwInitError> {
        LEFT_PRESS.set_long_press_ms(long_press_ms);
        RIGHT_PRESS.set_long_press_ms(long_press_ms);

        let input_pins = [
            pins::BUTTON_LEFT_GPIO,
            pins::BUTTON_RIGHT_GPIO,
            pins::REED_SWITCH_GPIO,
        ];
        for &pin in &input_pins {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pin,
                mode: gpio_mode_t_GPIO_MODE_INPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
            };
            // SAFETY: called once from the main task before the ISRs exist.
            let ret = unsafe { gpio_config(&cfg) };
            if ret != ESP_OK {
                return Err(HwInitError::GpioConfigFailed(ret));
            }
        }

        // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed.
        let ret = unsafe { gpio_install_isr_service(0) };
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let arg = queue as *const EventQueue as *mut core::ffi::c_void;
        let handlers: [(i32, unsafe extern "C" fn(*mut core::ffi::c_void)); 3] = [
            (pins::BUTTON_LEFT_GPIO, button_left_isr),
            (pins::BUTTON_RIGHT_GPIO, button_right_isr),
            (pins::REED_SWITCH_GPIO, reed_switch_isr),
        ];
        for (pin, handler) in handlers {
            // SAFETY: `arg` points at a 'static queue; handlers only post to it.
            let ret = unsafe { gpio_isr_handler_add(pin, Some(handler), arg) };
            if ret != ESP_OK {
                return Err(HwInitError::IsrHandlerFailed(ret));
            }
        }

        info!("hw_init: buttons + reed switch ISRs installed");
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn init_inputs(_queue: &'static EventQueue, _long_press_ms: u32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): input ISRs skipped");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn reed_switch_closed() -> bool {
    false
}
