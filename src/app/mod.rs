//! Application core: decoders, shared intents and loop orchestration.
//!
//! All interaction with hardware happens through the `embedded-hal`
//! traits and the **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
pub mod shared;
