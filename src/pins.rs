//! GPIO / peripheral pin assignments for the Doorbot main board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Intercom status LED, tapped through an optocoupler.  Active-low with
/// internal pull-up: a falling edge means the LED turned on.
pub const INDICATOR_INPUT_GPIO: i32 = 6;
/// Visitor push-button.  Active-high with internal pull-down.
pub const BUTTON_INPUT_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Relay outputs (active HIGH)
// ---------------------------------------------------------------------------

/// Relay across the intercom panel's "open" key.
pub const KEY_RELAY_GPIO: i32 = 21;
/// Relay across the doorbell push-button.
pub const DOORBELL_RELAY_GPIO: i32 = 20;
/// High-side switch for the door-handle servo supply.
pub const SERVO_POWER_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Watchdog
// ---------------------------------------------------------------------------

/// Liveness pulse to the external hardware watchdog.
pub const HEARTBEAT_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// PWM (LEDC)
// ---------------------------------------------------------------------------

/// Servo control line.  The level-shifting buffer inverts the signal.
pub const SERVO_PWM_GPIO: i32 = 5;
/// Piezo buzzer.
pub const BUZZER_PWM_GPIO: i32 = 16;

/// LEDC resolution for the servo timer.  14 bits at 50 Hz gives ~1.2 µs steps.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;
/// LEDC resolution for the buzzer timer.
pub const BUZZER_PWM_RESOLUTION_BITS: u32 = 10;
/// Initial buzzer timer frequency; retuned per chirp step.
pub const BUZZER_BASE_FREQ_HZ: u32 = 2_000;
