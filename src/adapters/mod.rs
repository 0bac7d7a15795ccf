//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter       | Implements                      | Connects to              |
//! |---------------|---------------------------------|--------------------------|
//! | `hardware`    | ContactSensorPort, LedPort,     | Contact sensor, LED link,|
//! |               | CountdownTimer                  | esp_timer / soft timer   |
//! | `local_stack` | StackPort, AttributeStore       | In-process attribute table |
//! | `nvs`         |                                 | NVS / in-memory store    |
//! | `time`        |                                 | ESP32 system timer       |

pub mod hardware;
pub mod local_stack;
pub mod nvs;
pub mod time;
