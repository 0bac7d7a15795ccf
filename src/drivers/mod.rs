//! Board-level drivers: buttons, reed switch, countdown timer and LEDs.

pub mod button;
pub mod contact_sensor;
pub mod countdown;
pub mod hw_init;
pub mod status_led;
