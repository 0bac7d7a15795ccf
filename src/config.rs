//! Application configuration parameters
//!
//! All tunable timings of the contact sensor application.  The event queue
//! depth is not configurable: it is part of the queue's type.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    // --- Buttons ---
    /// Hold time (ms) after which a press is reported as a long click
    pub long_press_ms: u32,

    // --- Factory reset ---
    /// Confirmation window (ms) between the long click and the actual reset
    pub factory_reset_countdown_ms: u32,
    /// Alert LED blink period (ms) while the reset countdown is armed
    pub countdown_blink_ms: u32,

    // --- Identify ---
    /// Status LED blink period (ms) while identifying
    pub identify_blink_ms: u32,

    // --- Data model ---
    /// Endpoint hosting the boolean state attribute
    pub boolean_state_endpoint: u16,

    // --- Timing ---
    /// LED driver tick period (ms)
    pub led_tick_ms: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            // Buttons
            long_press_ms: 1000,

            // Factory reset
            factory_reset_countdown_ms: 6000,
            countdown_blink_ms: 100,

            // Identify
            identify_blink_ms: 500,

            // Data model
            boolean_state_endpoint: 1,

            // Timing
            led_tick_ms: 10,
        }
    }
}

impl AppConfig {
    /// Reject values that would make the application unusable.
    pub fn validate(&self) -> Result<()> {
        if self.long_press_ms == 0 {
            return Err(Error::Config("long_press_ms must be non-zero"));
        }
        if self.factory_reset_countdown_ms == 0 {
            return Err(Error::Config("factory_reset_countdown_ms must be non-zero"));
        }
        if self.identify_blink_ms == 0 || self.countdown_blink_ms == 0 {
            return Err(Error::Config("blink periods must be non-zero"));
        }
        if self.led_tick_ms == 0 || self.led_tick_ms > self.countdown_blink_ms {
            return Err(Error::Config("led_tick_ms must be in 1..=countdown_blink_ms"));
        }
        if self.boolean_state_endpoint == 0 {
            return Err(Error::Config("endpoint 0 is the root node"));
        }
        Ok(())
    }
}
