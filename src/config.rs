//! System configuration parameters
//!
//! All tunable parameters for the Doorbot controller.  On the device the
//! JSON document in `config/doorbot.json` is embedded at build time and
//! parsed with [`DoorbotConfig::from_json`]; missing fields take the
//! defaults below.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::access::{AccessWindow, DayClass, Zone, ZoneTable};
use crate::error::ConfigError;
use crate::press::SecretCode;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorbotConfig {
    // --- Blink decoder ---
    /// A gap at least this long between confirmed blinks starts a new run
    pub min_blink_pause_ms: u32,
    /// Blink count that triggers the `immediate_blink` zone
    pub immediate_blink_count: u32,
    /// Blink count that triggers the `delayed_blink` zone
    pub delayed_blink_count: u32,
    /// Re-sample delay for indicator edges
    pub indicator_debounce_ms: u32,

    // --- Press decoder ---
    /// Presses held at most this long are `short`
    pub short_press_max_ms: u32,
    /// Presses held at least this long are `long`
    pub long_press_min_ms: u32,
    /// Quiet period before a single-press sequence is dispatched
    pub single_sequence_quiet_ms: u32,
    /// Quiet period before a multi-press sequence is dispatched
    pub multi_sequence_quiet_ms: u32,
    /// A Down without its Up is discarded after this long
    pub invalid_sequence_timeout_ms: u32,
    /// Unmatched sequences of at most this many presses ring the doorbell
    pub doorbell_max_presses: usize,
    /// Re-sample delay for button edges
    pub button_debounce_ms: u32,

    // --- Secrets ---
    pub primary_code: Option<SecretCode>,
    /// Honoured at any time of day
    pub override_code: Option<SecretCode>,

    // --- Access windows ---
    pub zones: ZoneTable,

    // --- Actuators ---
    /// How long the intercom "open" key is held
    pub key_button_press_ms: u32,
    /// Servo travel time for each handle movement
    pub door_handle_move_ms: u32,
    pub servo_pulse_frequency_hz: u32,
    pub handle_down_pulse_us: u32,
    pub handle_up_pulse_us: u32,
    pub doorbell_press_ms: u32,
    /// Buzzer PWM duty cycle (0-100%)
    pub buzzer_duty_percent: u8,
    pub heartbeat_pulse_ms: u32,
    pub heartbeat_period_ms: u32,

    // --- Timing ---
    /// Idle sleep for every polling loop
    pub poll_interval_ms: u32,
}

impl Default for DoorbotConfig {
    fn default() -> Self {
        Self {
            // Blink decoder
            min_blink_pause_ms: 3000,
            immediate_blink_count: 4,
            delayed_blink_count: 35,
            indicator_debounce_ms: 50,

            // Press decoder
            short_press_max_ms: 900,
            long_press_min_ms: 1600,
            single_sequence_quiet_ms: 1000,
            multi_sequence_quiet_ms: 2000,
            invalid_sequence_timeout_ms: 6000,
            doorbell_max_presses: 2,
            button_debounce_ms: 50,

            // Secrets are deployment-specific; none by default
            primary_code: None,
            override_code: None,

            zones: default_zones(),

            // Actuators
            key_button_press_ms: 5000,
            door_handle_move_ms: 2000,
            servo_pulse_frequency_hz: 50,
            handle_down_pulse_us: 2200,
            handle_up_pulse_us: 800,
            doorbell_press_ms: 300,
            buzzer_duty_percent: 50,
            heartbeat_pulse_ms: 5,
            heartbeat_period_ms: 1500,

            // Timing
            poll_interval_ms: 20, // 50 Hz
        }
    }
}

/// 07:00-18:59: weekday blinks open immediately, weekend blinks need the
/// long run, the primary code works on weekdays.
fn default_zones() -> ZoneTable {
    let start = NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default();
    let end = NaiveTime::from_hms_opt(18, 59, 0).unwrap_or_default();
    ZoneTable::new()
        .with(Zone::PrimaryCode, AccessWindow::new(DayClass::Weekdays, start, end))
        .with(Zone::ImmediateBlink, AccessWindow::new(DayClass::Weekdays, start, end))
        .with(Zone::DelayedBlink, AccessWindow::new(DayClass::Weekend, start, end))
}

impl DoorbotConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            log::error!("Config: {}", e);
            ConfigError::Parse
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent values.  Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.short_press_max_ms >= self.long_press_min_ms {
            return Err(ConfigError::ValidationFailed(
                "short_press_max_ms must be below long_press_min_ms",
            ));
        }
        if self.immediate_blink_count == 0 {
            return Err(ConfigError::ValidationFailed("immediate_blink_count must be > 0"));
        }
        if self.immediate_blink_count >= self.delayed_blink_count {
            return Err(ConfigError::ValidationFailed(
                "immediate_blink_count must be below delayed_blink_count",
            ));
        }
        if self.single_sequence_quiet_ms > self.multi_sequence_quiet_ms {
            return Err(ConfigError::ValidationFailed(
                "single_sequence_quiet_ms must not exceed multi_sequence_quiet_ms",
            ));
        }
        if self.servo_pulse_frequency_hz == 0 {
            return Err(ConfigError::ValidationFailed("servo_pulse_frequency_hz must be > 0"));
        }
        let period_us = 1_000_000 / self.servo_pulse_frequency_hz;
        if self.handle_down_pulse_us >= period_us || self.handle_up_pulse_us >= period_us {
            return Err(ConfigError::ValidationFailed(
                "servo pulse widths must be shorter than the PWM period",
            ));
        }
        if self.buzzer_duty_percent > 100 {
            return Err(ConfigError::ValidationFailed("buzzer_duty_percent must be <= 100"));
        }
        if self.heartbeat_pulse_ms >= self.heartbeat_period_ms {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_pulse_ms must be below heartbeat_period_ms",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be > 0"));
        }
        if !Zone::ALL.iter().all(|z| self.zones.contains_zone(*z)) {
            return Err(ConfigError::ValidationFailed(
                "zones must define primary_code, immediate_blink and delayed_blink",
            ));
        }
        Ok(())
    }
}
