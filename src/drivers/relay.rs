//! Momentary relay driver.
//!
//! Both relays short a push-button on the intercom panel: one the "open"
//! key, one the doorbell.  A pending intent closes the relay for a fixed
//! hold time.  Active HIGH.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::info;

use crate::app::events::ActuatorKind;
use crate::app::shared::{Intent, Intents, SharedState};
use crate::error::{IoError, Result};
use crate::scheduler::Actuator;

fn key_button_intent(intents: &Intents) -> &Intent {
    &intents.press_key_button
}

fn doorbell_intent(intents: &Intents) -> &Intent {
    &intents.ring_doorbell
}

pub struct RelayPulse<P, D> {
    pin: P,
    delay: D,
    hold_ms: u32,
    kind: ActuatorKind,
    signal: &'static str,
    intent: fn(&Intents) -> &Intent,
}

impl<P: OutputPin, D: DelayNs> RelayPulse<P, D> {
    /// Relay across the intercom "open" key, driven by `press_key_button`.
    pub fn key_button(pin: P, delay: D, hold_ms: u32) -> Self {
        Self {
            pin,
            delay,
            hold_ms,
            kind: ActuatorKind::KeyButton,
            signal: "key relay",
            intent: key_button_intent,
        }
    }

    /// Relay across the doorbell button, driven by `ring_doorbell`.
    pub fn doorbell(pin: P, delay: D, hold_ms: u32) -> Self {
        Self {
            pin,
            delay,
            hold_ms,
            kind: ActuatorKind::Doorbell,
            signal: "doorbell relay",
            intent: doorbell_intent,
        }
    }

    fn set(&mut self, closed: bool) -> core::result::Result<(), IoError> {
        let r = if closed {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        r.map_err(|_| IoError::GpioWrite(self.signal))
    }
}

impl<P, D> Actuator for RelayPulse<P, D>
where
    P: OutputPin + Send,
    D: DelayNs + Send,
{
    fn name(&self) -> &'static str {
        self.signal
    }

    fn kind(&self) -> Option<ActuatorKind> {
        Some(self.kind)
    }

    fn poll(&mut self, shared: &SharedState) -> Result<bool> {
        if !(self.intent)(&shared.intents).take() {
            return Ok(false);
        }
        info!("Relay: {} closed for {}ms", self.signal, self.hold_ms);
        self.set(true)?;
        self.delay.delay_ms(self.hold_ms);
        self.set(false)?;
        Ok(true)
    }

    fn release(&mut self) -> Result<()> {
        self.set(false)?;
        Ok(())
    }
}
