//! Visitor push-button edge sampler.
//!
//! ## Hardware
//!
//! Active-high momentary switch with internal pull-down.  The GPIO fires
//! on both edges; the ISR records a timestamp and the level it saw.  This
//! sampler runs in the edge-dispatch thread and turns each raw edge into
//! at most one debounced [`EdgeEvent`].
//!
//! ## Debounce
//!
//! Both samples must match the level the ISR captured:
//!
//! | ISR level | First sample | Second sample (after `debounce_ms`) | Result   |
//! |-----------|--------------|-------------------------------------|----------|
//! | high      | high         | high                                | `Down`   |
//! | low       | low          | low                                 | `Up`     |
//! | any       | differs      | -                                   | dropped  |
//! | any       | matches      | differs                             | dropped  |
//!
//! An edge processed late, after the line has moved on, no longer matches
//! its own level and is dropped; the edge that moved the line carries the
//! real timestamp.  A direction equal to the last one emitted is dropped
//! as well, so the decoder sees a clean alternation.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::debug;

use crate::error::IoError;
use crate::press::{EdgeDirection, EdgeEvent};

pub struct ButtonSampler<P, D> {
    pin: P,
    delay: D,
    debounce_ms: u32,
    last: EdgeDirection,
}

impl<P: InputPin, D: DelayNs> ButtonSampler<P, D> {
    /// The button is assumed released at boot.
    pub fn new(pin: P, delay: D, debounce_ms: u32) -> Self {
        Self {
            pin,
            delay,
            debounce_ms,
            last: EdgeDirection::Up,
        }
    }

    pub fn debounce_ms(&self) -> u32 {
        self.debounce_ms
    }

    /// Sample around an edge observed at `observed_ms` with the line at
    /// `isr_high`.
    pub fn on_edge(&mut self, observed_ms: u64, isr_high: bool) -> Result<Option<EdgeEvent>, IoError> {
        if self.pressed()? != isr_high {
            debug!("Button: stale edge at {}ms discarded", observed_ms);
            return Ok(None);
        }
        self.delay.delay_ms(self.debounce_ms);
        if self.pressed()? != isr_high {
            debug!("Button: bounce at {}ms discarded", observed_ms);
            return Ok(None);
        }

        let direction = if isr_high {
            EdgeDirection::Down
        } else {
            EdgeDirection::Up
        };
        if direction == self.last {
            return Ok(None);
        }
        self.last = direction;
        Ok(Some(EdgeEvent {
            direction,
            at_ms: observed_ms,
        }))
    }

    fn pressed(&mut self) -> Result<bool, IoError> {
        self.pin.is_high().map_err(|_| IoError::GpioRead("button"))
    }
}
