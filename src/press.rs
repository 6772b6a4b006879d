//! Press-sequence decoder: turns button edges into secret-code verdicts.
//!
//! ```text
//!  EdgeEvent ──▶ buffer (Down,Up,Down,Up,…) ──quiet──▶ PressCode ──▶ CodeMatcher ──▶ Verdict
//!                        │
//!                        └── trailing Down, no Up for `abandon_ms` ──▶ discarded
//! ```
//!
//! ## Classification
//!
//! | Held duration                     | Symbol    |
//! |-----------------------------------|-----------|
//! | `<= short_max_ms`                 | `Short`   |
//! | `>= long_min_ms`                  | `Long`    |
//! | strictly between                  | `Invalid` |
//!
//! An `Invalid` symbol never matches a [`SecretCode`], so a sequence
//! containing one can only end up as a doorbell ring or be ignored.

use core::fmt;
use core::str::FromStr;

use chrono::NaiveDateTime;
use heapless::Vec;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::access::{Zone, ZoneTable};
use crate::config::DoorbotConfig;
use crate::error::ConfigError;

/// Longest sequence (in presses) the decoder will hold.
pub const MAX_PRESSES: usize = 16;

const BUFFER_CAPACITY: usize = MAX_PRESSES * 2;

// ───────────────────────────────────────────────────────────────
// Edge events
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// Button pressed.
    Down,
    /// Button released.
    Up,
}

/// A debounced button transition, stamped with the time the edge was
/// observed (milliseconds of uptime).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub direction: EdgeDirection,
    pub at_ms: u64,
}

impl EdgeEvent {
    pub fn down(at_ms: u64) -> Self {
        Self { direction: EdgeDirection::Down, at_ms }
    }

    pub fn up(at_ms: u64) -> Self {
        Self { direction: EdgeDirection::Up, at_ms }
    }
}

// ───────────────────────────────────────────────────────────────
// Symbols and codes
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Short,
    Long,
    Invalid,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short => write!(f, "short"),
            Self::Long => write!(f, "long"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

fn write_symbols(f: &mut fmt::Formatter<'_>, symbols: &[Symbol]) -> fmt::Result {
    for (i, s) in symbols.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{s}")?;
    }
    Ok(())
}

/// A configured secret: a non-empty pattern of `Short`/`Long` symbols.
///
/// Parsed from strings such as `"short,short,long"` or `"s l l"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretCode(Vec<Symbol, MAX_PRESSES>);

impl SecretCode {
    pub fn new(symbols: &[Symbol]) -> Result<Self, ConfigError> {
        if symbols.is_empty() {
            return Err(ConfigError::ValidationFailed("secret code must not be empty"));
        }
        if symbols.contains(&Symbol::Invalid) {
            return Err(ConfigError::ValidationFailed(
                "secret code may only contain short and long presses",
            ));
        }
        Vec::from_slice(symbols)
            .map(Self)
            .map_err(|()| ConfigError::ValidationFailed("secret code is too long"))
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    pub fn matches(&self, code: &PressCode) -> bool {
        self.0.as_slice() == code.symbols()
    }
}

impl FromStr for SecretCode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut symbols: Vec<Symbol, MAX_PRESSES> = Vec::new();
        for token in s.split([',', ' ', '\t']).filter(|t| !t.is_empty()) {
            let symbol = match token.to_ascii_lowercase().as_str() {
                "short" | "s" => Symbol::Short,
                "long" | "l" => Symbol::Long,
                _ => return Err(ConfigError::ValidationFailed("unknown symbol in secret code")),
            };
            symbols
                .push(symbol)
                .map_err(|_| ConfigError::ValidationFailed("secret code is too long"))?;
        }
        Self::new(&symbols)
    }
}

impl TryFrom<String> for SecretCode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SecretCode> for String {
    fn from(code: SecretCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for SecretCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_symbols(f, &self.0)
    }
}

/// The classified form of a completed press sequence.  May contain
/// `Invalid` symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressCode(Vec<Symbol, MAX_PRESSES>);

impl PressCode {
    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    /// Number of Down/Up pairs in the sequence.
    pub fn press_count(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for PressCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_symbols(f, &self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Timing
// ───────────────────────────────────────────────────────────────

/// Thresholds that drive classification, dispatch, and abandonment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressTiming {
    pub short_max_ms: u64,
    pub long_min_ms: u64,
    /// Quiet period after a lone press.
    pub single_quiet_ms: u64,
    /// Quiet period after a multi-press sequence.
    pub multi_quiet_ms: u64,
    /// How long a dangling Down may wait for its Up.
    pub abandon_ms: u64,
}

impl PressTiming {
    pub fn from_config(config: &DoorbotConfig) -> Self {
        Self {
            short_max_ms: config.short_press_max_ms.into(),
            long_min_ms: config.long_press_min_ms.into(),
            single_quiet_ms: config.single_sequence_quiet_ms.into(),
            multi_quiet_ms: config.multi_sequence_quiet_ms.into(),
            abandon_ms: config.invalid_sequence_timeout_ms.into(),
        }
    }

    pub fn classify(&self, held_ms: u64) -> Symbol {
        if held_ms <= self.short_max_ms {
            Symbol::Short
        } else if held_ms >= self.long_min_ms {
            Symbol::Long
        } else {
            Symbol::Invalid
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Decoder
// ───────────────────────────────────────────────────────────────

/// Result of a [`PressDecoder::poll`] that changed the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// A well-formed sequence went quiet and was classified.
    Complete(PressCode),
    /// A dangling Down aged out; `events` edges were dropped.
    Abandoned { events: usize },
}

/// Accumulates edges and decides when a sequence is finished.
///
/// The buffer is always an alternating `Down, Up, Down, …` prefix; edges
/// that would break the alternation are repaired at [`push`](Self::push).
pub struct PressDecoder {
    timing: PressTiming,
    buffer: Vec<EdgeEvent, BUFFER_CAPACITY>,
}

impl PressDecoder {
    pub fn new(timing: PressTiming) -> Self {
        Self {
            timing,
            buffer: Vec::new(),
        }
    }

    /// Append an edge.  Returns `false` if it was dropped.
    ///
    /// - a Down where an Up was expected restarts the sequence at that Down
    /// - an Up where a Down was expected is dropped
    /// - an edge beyond [`MAX_PRESSES`] clears the buffer
    pub fn push(&mut self, event: EdgeEvent) -> bool {
        let expected = if self.buffer.len() % 2 == 0 {
            EdgeDirection::Down
        } else {
            EdgeDirection::Up
        };

        if event.direction != expected {
            match event.direction {
                EdgeDirection::Down => {
                    debug!("Press: Down without Up, restarting sequence");
                    self.buffer.clear();
                }
                EdgeDirection::Up => {
                    debug!("Press: stray Up at {}ms dropped", event.at_ms);
                    return false;
                }
            }
        }

        if self.buffer.push(event).is_err() {
            warn!("Press: more than {} presses, discarding sequence", MAX_PRESSES);
            self.buffer.clear();
            return false;
        }
        true
    }

    /// Run the dispatch and timeout checks against `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> Option<SequenceOutcome> {
        let last = *self.buffer.last()?;
        let idle_ms = now_ms.saturating_sub(last.at_ms);

        if self.is_complete() {
            let quiet_ms = if self.buffer.len() == 2 {
                self.timing.single_quiet_ms
            } else {
                self.timing.multi_quiet_ms
            };
            if idle_ms > quiet_ms {
                let code = self.classify_buffer();
                self.buffer.clear();
                return Some(SequenceOutcome::Complete(code));
            }
        } else if idle_ms > self.timing.abandon_ms {
            let events = self.buffer.len();
            self.buffer.clear();
            return Some(SequenceOutcome::Abandoned { events });
        }

        None
    }

    /// Edges accumulated since the last dispatch or reset.
    pub fn pending(&self) -> &[EdgeEvent] {
        &self.buffer
    }

    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }

    fn is_complete(&self) -> bool {
        self.buffer.len() % 2 == 0
            && self.buffer.chunks_exact(2).all(|pair| {
                pair[0].direction == EdgeDirection::Down && pair[1].direction == EdgeDirection::Up
            })
    }

    fn classify_buffer(&self) -> PressCode {
        PressCode(
            self.buffer
                .chunks_exact(2)
                .map(|pair| self.timing.classify(pair[1].at_ms.saturating_sub(pair[0].at_ms)))
                .collect(),
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Matching
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Primary secret, inside its access window.
    Primary,
    /// Override secret (no time restriction).
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    OpenDoor(Grant),
    RingDoorbell,
    /// Failed or ignored code attempt.
    Rejected,
}

/// Matches completed sequences against the configured secrets.
///
/// Priority: primary (window-gated) → override → doorbell heuristic.
#[derive(Debug, Clone)]
pub struct CodeMatcher {
    primary: Option<SecretCode>,
    override_code: Option<SecretCode>,
    doorbell_max_presses: usize,
}

impl CodeMatcher {
    pub fn new(
        primary: Option<SecretCode>,
        override_code: Option<SecretCode>,
        doorbell_max_presses: usize,
    ) -> Self {
        Self {
            primary,
            override_code,
            doorbell_max_presses,
        }
    }

    pub fn from_config(config: &DoorbotConfig) -> Self {
        Self::new(
            config.primary_code.clone(),
            config.override_code.clone(),
            config.doorbell_max_presses,
        )
    }

    /// Decide what a completed sequence means at local time `at`.
    pub fn evaluate(&self, code: &PressCode, zones: &ZoneTable, at: NaiveDateTime) -> Verdict {
        if let Some(primary) = &self.primary {
            if primary.matches(code) && zones.allowed(Zone::PrimaryCode, at) {
                return Verdict::OpenDoor(Grant::Primary);
            }
        }
        if let Some(override_code) = &self.override_code {
            if override_code.matches(code) {
                return Verdict::OpenDoor(Grant::Override);
            }
        }
        // A short attempt is more likely a visitor ringing than a mistyped code.
        if code.press_count() <= self.doorbell_max_presses {
            return Verdict::RingDoorbell;
        }
        Verdict::Rejected
    }
}
