//! Doorbot firmware library.
//!
//! Exposes the decoders, actuator loops and controller for integration
//! testing. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod access;
pub mod app;
pub mod blink;
pub mod config;
pub mod events;
pub mod press;
pub mod scheduler;

pub mod error;
pub mod pins;

// The ESP-IDF-only parts of these are cfg-gated inside; host builds get
// simulation stubs.
pub mod adapters;
pub mod drivers;

#[cfg(target_os = "espidf")]
mod esp_link_shims;

pub use error::{ConfigError, Error, IoError, Result};
