//! External watchdog heartbeat.
//!
//! Pulses a GPIO at a fixed period.  The supervisor resets the board if
//! the pulses stop, which is what happens when the controller drains
//! after a fatal error.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::app::events::ActuatorKind;
use crate::app::shared::SharedState;
use crate::error::{IoError, Result};
use crate::scheduler::Actuator;

pub struct Heartbeat<P, D> {
    pin: P,
    delay: D,
    pulse_ms: u32,
    period_ms: u32,
}

impl<P: OutputPin, D: DelayNs> Heartbeat<P, D> {
    pub fn new(pin: P, delay: D, pulse_ms: u32, period_ms: u32) -> Self {
        Self {
            pin,
            delay,
            pulse_ms,
            period_ms,
        }
    }

    fn set(&mut self, high: bool) -> core::result::Result<(), IoError> {
        let r = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        r.map_err(|_| IoError::GpioWrite("heartbeat"))
    }
}

impl<P, D> Actuator for Heartbeat<P, D>
where
    P: OutputPin + Send,
    D: DelayNs + Send,
{
    fn name(&self) -> &'static str {
        "heartbeat"
    }

    fn kind(&self) -> Option<ActuatorKind> {
        None
    }

    /// One full period.  Always reports work so the scheduler adds no
    /// idle sleep on top of the period.
    fn poll(&mut self, _shared: &SharedState) -> Result<bool> {
        self.set(true)?;
        self.delay.delay_ms(self.pulse_ms);
        self.set(false)?;
        self.delay.delay_ms(self.period_ms.saturating_sub(self.pulse_ms));
        Ok(true)
    }

    fn release(&mut self) -> Result<()> {
        self.set(false)?;
        Ok(())
    }
}
