//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                 | Connects to           |
//! |------------|----------------------------|-----------------------|
//! | `hardware` | InputPin / OutputPin       | ESP32 GPIO            |
//! |            | PwmOutput                  | ESP32 LEDC            |
//! | `log_sink` | EventSink                  | Serial log output     |
//! | `time`     | TimePort, DelayNs          | ESP32 timer, RTC, TZ  |

pub mod hardware;
pub mod log_sink;
pub mod time;
