//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ decoders / actuator loops (domain)
//! ```
//!
//! Digital pins use the `embedded-hal` 1.0 traits directly
//! (`InputPin`, `OutputPin`, `DelayNs`).  The ports below cover what
//! `embedded-hal` does not: tone/servo PWM, wall-clock time, and the
//! structured event stream.

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::IoError;

use super::events::DoorbotEvent;

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic uptime plus local wall-clock time.
pub trait TimePort {
    /// Milliseconds since boot.  Never goes backwards.
    fn uptime_ms(&self) -> u64;

    /// Current local date and time, used for access-window checks.
    fn local_now(&self) -> NaiveDateTime;

    /// Local time at an earlier uptime stamp, stepped back from now.  An
    /// unsynced clock (the epoch) stays at the epoch.
    fn local_at(&self, uptime_ms: u64) -> NaiveDateTime {
        let now = self.local_now();
        if now == NaiveDateTime::default() {
            return now;
        }
        let ago = i64::try_from(self.uptime_ms().saturating_sub(uptime_ms)).unwrap_or(i64::MAX);
        TimeDelta::try_milliseconds(ago)
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(now)
    }
}

// ───────────────────────────────────────────────────────────────
// PWM port (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// A single PWM channel.  Duty is a percentage in `0.0..=100.0`.
pub trait PwmOutput {
    /// Start generating at `frequency_hz` with `duty_percent`.
    fn start(&mut self, frequency_hz: u32, duty_percent: f32) -> Result<(), IoError>;

    fn set_duty_cycle(&mut self, duty_percent: f32) -> Result<(), IoError>;

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), IoError>;

    /// Stop the output and hold it idle.
    fn stop(&mut self) -> Result<(), IoError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`DoorbotEvent`]s through this port.
/// Shared by every loop, hence `&self`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DoorbotEvent);
}
