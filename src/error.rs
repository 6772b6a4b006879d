//! Unified error types for the Doorbot firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! loop-level error handling uniform.  All variants are `Copy` so they can
//! be returned across thread joins without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The digital I/O provider failed a read or write.  Fatal: the owning
    /// loop stops and the controller drains.
    Io(IoError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
    /// Peripheral or task initialisation failed.
    Init(&'static str),
    /// A loop thread panicked.  Carries the loop name.
    TaskPanicked(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::TaskPanicked(name) => write!(f, "task '{name}' panicked"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// I/O errors
// ---------------------------------------------------------------------------

/// Pin-level failures.  The payload names the signal, not the GPIO number,
/// so log lines stay meaningful when the pin map changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    GpioRead(&'static str),
    GpioWrite(&'static str),
    Pwm(&'static str),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioRead(signal) => write!(f, "GPIO read failed ({signal})"),
            Self::GpioWrite(signal) => write!(f, "GPIO write failed ({signal})"),
            Self::Pwm(signal) => write!(f, "PWM update failed ({signal})"),
        }
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid JSON or does not match the schema.
    Parse,
    /// A field failed range validation.  Values are rejected, never clamped.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "malformed config document"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
