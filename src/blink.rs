//! Blink decoder: counts intercom indicator flashes.
//!
//! The intercom blinks its status LED when a resident presses the "open"
//! key on their handset.  A run of blinks is a *sequence*; a pause of at
//! least `min_pause_ms` between confirmed blinks starts a new one.
//!
//! Two exact counts act as triggers:
//!
//! | Count reached           | Zone consulted    |
//! |-------------------------|-------------------|
//! | `immediate_count` (4)   | `immediate_blink` |
//! | `delayed_count` (35)    | `delayed_blink`   |
//!
//! Only the blink that first reaches a count fires; blinking past it has no
//! further effect until the sequence resets.

use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::debug;

use crate::access::{Zone, ZoneTable};
use crate::config::DoorbotConfig;
use crate::error::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkTrigger {
    Immediate,
    Delayed,
}

impl BlinkTrigger {
    pub fn zone(self) -> Zone {
        match self {
            Self::Immediate => Zone::ImmediateBlink,
            Self::Delayed => Zone::DelayedBlink,
        }
    }
}

/// What a confirmed blink decided about the key-button intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// The count is not a trigger count.
    None,
    /// Trigger count reached inside its access window.
    Granted(BlinkTrigger),
    /// Trigger count reached outside its access window.
    Denied(BlinkTrigger),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkOutcome {
    /// Position of this blink in the current sequence (1-based).
    pub count: u32,
    pub decision: TriggerDecision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkThresholds {
    pub min_pause_ms: u64,
    pub immediate_count: u32,
    pub delayed_count: u32,
}

impl BlinkThresholds {
    pub fn from_config(config: &DoorbotConfig) -> Self {
        Self {
            min_pause_ms: config.min_blink_pause_ms.into(),
            immediate_count: config.immediate_blink_count,
            delayed_count: config.delayed_blink_count,
        }
    }
}

/// Pure counting state machine.  Fed with confirmed blinks only.
pub struct BlinkDecoder {
    thresholds: BlinkThresholds,
    last_confirmed_ms: Option<u64>,
    count: u32,
}

impl BlinkDecoder {
    pub fn new(thresholds: BlinkThresholds) -> Self {
        Self {
            thresholds,
            last_confirmed_ms: None,
            count: 0,
        }
    }

    /// Record a confirmed blink observed at `now_ms`, evaluating triggers
    /// against local time `at`.
    pub fn record(&mut self, now_ms: u64, at: NaiveDateTime, zones: &ZoneTable) -> BlinkOutcome {
        let new_sequence = match self.last_confirmed_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.thresholds.min_pause_ms,
        };
        self.count = if new_sequence { 1 } else { self.count.saturating_add(1) };
        self.last_confirmed_ms = Some(now_ms);

        let trigger = if self.count == self.thresholds.immediate_count {
            Some(BlinkTrigger::Immediate)
        } else if self.count == self.thresholds.delayed_count {
            Some(BlinkTrigger::Delayed)
        } else {
            None
        };

        let decision = match trigger {
            None => TriggerDecision::None,
            Some(t) if zones.allowed(t.zone(), at) => TriggerDecision::Granted(t),
            Some(t) => TriggerDecision::Denied(t),
        };

        BlinkOutcome {
            count: self.count,
            decision,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_confirmed_ms(&self) -> Option<u64> {
        self.last_confirmed_ms
    }
}

/// Debounces indicator edges before they reach the [`BlinkDecoder`].
///
/// The indicator line is active-low: a blink pulls it low.
pub struct IndicatorWatcher<P, D> {
    pin: P,
    delay: D,
    debounce_ms: u32,
    decoder: BlinkDecoder,
}

impl<P: InputPin, D: DelayNs> IndicatorWatcher<P, D> {
    pub fn new(pin: P, delay: D, debounce_ms: u32, decoder: BlinkDecoder) -> Self {
        Self {
            pin,
            delay,
            debounce_ms,
            decoder,
        }
    }

    /// Handle one indicator edge observed at `observed_ms`.  Returns
    /// `Ok(None)` when the re-sample shows the edge was a spike.
    pub fn on_edge(
        &mut self,
        observed_ms: u64,
        at: NaiveDateTime,
        zones: &ZoneTable,
    ) -> Result<Option<BlinkOutcome>, IoError> {
        self.delay.delay_ms(self.debounce_ms);
        let lit = self
            .pin
            .is_low()
            .map_err(|_| IoError::GpioRead("indicator"))?;
        if !lit {
            debug!("Blink: spike at {}ms discarded", observed_ms);
            return Ok(None);
        }
        Ok(Some(self.decoder.record(observed_ms, at, zones)))
    }

    pub fn decoder(&self) -> &BlinkDecoder {
        &self.decoder
    }
}
