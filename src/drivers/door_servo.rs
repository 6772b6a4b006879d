//! Door-handle servo driver (LEDC PWM + switched supply).
//!
//! The servo signal passes through an inverting buffer, so the duty
//! written to the LEDC is the complement of the pulse the servo sees:
//!
//! ```text
//! duty % = 100 × (1 − pulse_us × frequency_hz / 10⁶)
//! ```
//!
//! 100 % duty therefore means "no pulse" and the servo holds still.
//!
//! ## Sequence
//!
//! | Step | Output                         |
//! |------|--------------------------------|
//! | 1    | power rail on                  |
//! | 2    | handle-down pulse, hold        |
//! | 3    | handle-up pulse, hold          |
//! | 4    | neutral (100 %), power rail off |

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::info;

use crate::app::events::ActuatorKind;
use crate::app::ports::PwmOutput;
use crate::app::shared::SharedState;
use crate::config::DoorbotConfig;
use crate::error::{IoError, Result};
use crate::scheduler::Actuator;

/// Idle duty: the inverter turns it into a constant low servo line.
pub const NEUTRAL_DUTY: f32 = 100.0;

/// Inverted duty cycle for a servo pulse of `pulse_us` at `frequency_hz`.
pub fn duty_for_pulse(pulse_us: u32, frequency_hz: u32) -> f32 {
    100.0 * (1.0 - pulse_us as f32 * frequency_hz as f32 / 1_000_000.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoTiming {
    pub frequency_hz: u32,
    pub down_duty: f32,
    pub up_duty: f32,
    pub move_ms: u32,
}

impl ServoTiming {
    pub fn from_config(config: &DoorbotConfig) -> Self {
        let f = config.servo_pulse_frequency_hz;
        Self {
            frequency_hz: f,
            down_duty: duty_for_pulse(config.handle_down_pulse_us, f),
            up_duty: duty_for_pulse(config.handle_up_pulse_us, f),
            move_ms: config.door_handle_move_ms,
        }
    }
}

pub struct DoorServo<W, P, D> {
    pwm: W,
    power: P,
    delay: D,
    timing: ServoTiming,
    started: bool,
}

impl<W: PwmOutput, P: OutputPin, D: DelayNs> DoorServo<W, P, D> {
    pub fn new(pwm: W, power: P, delay: D, timing: ServoTiming) -> Self {
        Self {
            pwm,
            power,
            delay,
            timing,
            started: false,
        }
    }

    fn set_power(&mut self, on: bool) -> core::result::Result<(), IoError> {
        let r = if on {
            self.power.set_high()
        } else {
            self.power.set_low()
        };
        r.map_err(|_| IoError::GpioWrite("servo power"))
    }

    fn ensure_started(&mut self) -> core::result::Result<(), IoError> {
        if !self.started {
            self.pwm.start(self.timing.frequency_hz, NEUTRAL_DUTY)?;
            self.started = true;
        }
        Ok(())
    }

    fn open_door(&mut self) -> core::result::Result<(), IoError> {
        info!("Servo: opening door");
        self.set_power(true)?;
        self.pwm.set_duty_cycle(self.timing.down_duty)?;
        self.delay.delay_ms(self.timing.move_ms);
        self.pwm.set_duty_cycle(self.timing.up_duty)?;
        self.delay.delay_ms(self.timing.move_ms);
        self.pwm.set_duty_cycle(NEUTRAL_DUTY)?;
        self.set_power(false)
    }
}

impl<W, P, D> Actuator for DoorServo<W, P, D>
where
    W: PwmOutput + Send,
    P: OutputPin + Send,
    D: DelayNs + Send,
{
    fn name(&self) -> &'static str {
        "door servo"
    }

    fn kind(&self) -> Option<ActuatorKind> {
        Some(ActuatorKind::DoorServo)
    }

    fn poll(&mut self, shared: &SharedState) -> Result<bool> {
        self.ensure_started()?;
        if !shared.intents.open_door.take() {
            return Ok(false);
        }
        self.open_door()?;
        Ok(true)
    }

    fn release(&mut self) -> Result<()> {
        if self.started {
            self.pwm.set_duty_cycle(NEUTRAL_DUTY)?;
        }
        self.set_power(false)?;
        Ok(())
    }
}
