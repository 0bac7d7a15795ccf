//! GPIO assignments for the contact sensor board.
//!
//! Every driver references this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Buttons (active LOW, internal pull-up)
// ---------------------------------------------------------------------------

/// BTN0: long click arms factory reset, click toggles contact.
pub const BUTTON_LEFT_GPIO: i32 = 9;
/// BTN1: long click opens the commissioning window, click toggles contact.
pub const BUTTON_RIGHT_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// Reed switch (LOW = magnet present = contact closed)
// ---------------------------------------------------------------------------

pub const REED_SWITCH_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Indicator LEDs (active HIGH)
// ---------------------------------------------------------------------------

/// Mirrors the contact state; blinks while identifying.
pub const STATUS_LED_GPIO: i32 = 6;
/// Blinks during the factory-reset countdown.
pub const ALERT_LED_GPIO: i32 = 7;
