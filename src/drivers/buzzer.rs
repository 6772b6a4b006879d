//! Piezo buzzer driver (LEDC PWM, tone per step).
//!
//! Plays queued [`Chirp`]s in FIFO order.  Each chirp runs to completion
//! before the next is taken from the queue.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::debug;

use crate::app::events::ActuatorKind;
use crate::app::ports::PwmOutput;
use crate::app::shared::SharedState;
use crate::error::Result;
use crate::scheduler::Actuator;

pub const MAX_CHIRP_STEPS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChirpStep {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl ChirpStep {
    pub const fn new(frequency_hz: u32, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }
}

/// An ordered tone sequence.  Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chirp(Vec<ChirpStep, MAX_CHIRP_STEPS>);

const GRANTED: [ChirpStep; 3] = [
    ChirpStep::new(1000, 80),
    ChirpStep::new(1500, 80),
    ChirpStep::new(2000, 120),
];

const DENIED: [ChirpStep; 2] = [ChirpStep::new(800, 150), ChirpStep::new(400, 250)];

impl Chirp {
    /// `None` if `steps` is empty or longer than [`MAX_CHIRP_STEPS`].
    pub fn new(steps: &[ChirpStep]) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        Vec::from_slice(steps).ok().map(Self)
    }

    /// Rising three-tone: access granted.
    pub fn granted() -> Self {
        Self(GRANTED.iter().copied().collect())
    }

    /// Falling two-tone: code rejected.
    pub fn denied() -> Self {
        Self(DENIED.iter().copied().collect())
    }

    pub fn steps(&self) -> &[ChirpStep] {
        &self.0
    }

    pub fn duration_ms(&self) -> u32 {
        self.0.iter().map(|s| s.duration_ms).sum()
    }
}

pub struct Buzzer<W, D> {
    pwm: W,
    delay: D,
    duty_percent: f32,
}

impl<W: PwmOutput, D: DelayNs> Buzzer<W, D> {
    pub fn new(pwm: W, delay: D, duty_percent: u8) -> Self {
        Self {
            pwm,
            delay,
            duty_percent: f32::from(duty_percent.min(100)),
        }
    }

    fn play(&mut self, chirp: &Chirp) -> Result<()> {
        let Some(first) = chirp.steps().first() else {
            return Ok(());
        };
        debug!("Buzzer: chirp of {} steps", chirp.steps().len());
        self.pwm.start(first.frequency_hz, self.duty_percent)?;
        for step in chirp.steps() {
            self.pwm.set_frequency(step.frequency_hz)?;
            self.delay.delay_ms(step.duration_ms);
        }
        self.pwm.stop()?;
        Ok(())
    }
}

impl<W, D> Actuator for Buzzer<W, D>
where
    W: PwmOutput + Send,
    D: DelayNs + Send,
{
    fn name(&self) -> &'static str {
        "buzzer"
    }

    fn kind(&self) -> Option<ActuatorKind> {
        Some(ActuatorKind::Buzzer)
    }

    fn poll(&mut self, shared: &SharedState) -> Result<bool> {
        let Ok(chirp) = shared.chirps.try_receive() else {
            return Ok(false);
        };
        self.play(&chirp)?;
        Ok(true)
    }

    fn release(&mut self) -> Result<()> {
        self.pwm.stop()?;
        Ok(())
    }
}
