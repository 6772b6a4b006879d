//! Hardware adapter: bridges real peripherals to the domain traits.
//!
//! Digital pins implement the `embedded-hal` 1.0 traits; LEDC channels
//! implement [`PwmOutput`].  This is the only module that touches pin
//! numbers at runtime.  On non-espidf targets, the `hw_init` helpers are
//! simulation stubs.

use core::convert::Infallible;

use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

use crate::app::ports::PwmOutput;
use crate::drivers::hw_init::{self, ESP_RC_OK, LedcChannel};
use crate::error::IoError;

/// Non-zero ESP-IDF return code from a GPIO call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EspRc(pub i32);

impl digital::Error for EspRc {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// A configured GPIO input.
#[derive(Debug)]
pub struct GpioInput {
    gpio: i32,
}

impl GpioInput {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }
}

impl ErrorType for GpioInput {
    type Error = Infallible;
}

impl InputPin for GpioInput {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(hw_init::gpio_read(self.gpio))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!hw_init::gpio_read(self.gpio))
    }
}

/// A configured GPIO output.
#[derive(Debug)]
pub struct GpioOutput {
    gpio: i32,
}

impl GpioOutput {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }

    fn write(&mut self, high: bool) -> Result<(), EspRc> {
        match hw_init::gpio_write(self.gpio, high) {
            ESP_RC_OK => Ok(()),
            rc => Err(EspRc(rc)),
        }
    }
}

impl ErrorType for GpioOutput {
    type Error = EspRc;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), EspRc> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), EspRc> {
        self.write(true)
    }
}

/// One LEDC channel behind the [`PwmOutput`] port.
#[derive(Debug)]
pub struct LedcPwm {
    channel: LedcChannel,
    signal: &'static str,
}

impl LedcPwm {
    pub fn new(channel: LedcChannel, signal: &'static str) -> Self {
        Self { channel, signal }
    }

    fn check(&self, rc: i32) -> Result<(), IoError> {
        if rc == ESP_RC_OK {
            Ok(())
        } else {
            log::error!("LEDC {} failed (rc={})", self.signal, rc);
            Err(IoError::Pwm(self.signal))
        }
    }
}

impl PwmOutput for LedcPwm {
    fn start(&mut self, frequency_hz: u32, duty_percent: f32) -> Result<(), IoError> {
        self.set_frequency(frequency_hz)?;
        self.set_duty_cycle(duty_percent)
    }

    fn set_duty_cycle(&mut self, duty_percent: f32) -> Result<(), IoError> {
        self.check(hw_init::ledc_set_duty(self.channel, duty_percent))
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), IoError> {
        self.check(hw_init::ledc_set_frequency(self.channel, frequency_hz))
    }

    fn stop(&mut self) -> Result<(), IoError> {
        self.check(hw_init::ledc_stop_channel(self.channel))
    }
}
