//! Actuator scheduler.
//!
//! Every actuator runs in its own loop, polling its intent and executing
//! a fixed timed hardware sequence when one is pending.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  loop while running:                                      │
//! │     poll()  ──▶ sequence ran?  ──yes──▶ emit Actuated     │
//! │                      │                                    │
//! │                      no ──▶ sleep poll_interval_ms        │
//! │  release()  (outputs to their safe idle level)            │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! A started sequence always runs to completion; the running flag is only
//! checked between iterations.

use embedded_hal::delay::DelayNs;
use log::{error, info};

use crate::app::events::{ActuatorKind, DoorbotEvent};
use crate::app::ports::EventSink;
use crate::app::shared::SharedState;
use crate::error::Result;

/// A timed output driven by one scheduler loop.
pub trait Actuator: Send {
    /// Name used for the loop thread and in log lines.
    fn name(&self) -> &'static str;

    /// Reported in [`DoorbotEvent::Actuated`] after each sequence.
    /// `None` for actuators that are not intent-driven.
    fn kind(&self) -> Option<ActuatorKind>;

    /// Consume any pending request and run the sequence to completion.
    /// Returns `true` if a sequence ran.
    fn poll(&mut self, shared: &SharedState) -> Result<bool>;

    /// Drive all outputs to their idle level.  Called once on loop exit.
    fn release(&mut self) -> Result<()>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn kind(&self) -> Option<ActuatorKind> {
        (**self).kind()
    }

    fn poll(&mut self, shared: &SharedState) -> Result<bool> {
        (**self).poll(shared)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}

/// Run `actuator` until shutdown is requested or an I/O error occurs.
///
/// Outputs are released on both paths; the first error wins.
pub fn run_actuator<A, D, S>(
    actuator: &mut A,
    shared: &SharedState,
    delay: &mut D,
    sink: &S,
    poll_interval_ms: u32,
) -> Result<()>
where
    A: Actuator + ?Sized,
    D: DelayNs,
    S: EventSink + ?Sized,
{
    let name = actuator.name();
    info!("Actuator '{}' started", name);

    let mut outcome = Ok(());
    while shared.is_running() {
        match actuator.poll(shared) {
            Ok(true) => {
                if let Some(kind) = actuator.kind() {
                    sink.emit(&DoorbotEvent::Actuated(kind));
                }
            }
            Ok(false) => delay.delay_ms(poll_interval_ms),
            Err(e) => {
                error!("Actuator '{}' failed: {}", name, e);
                outcome = Err(e);
                break;
            }
        }
    }

    let released = actuator.release();
    if let Err(e) = &released {
        error!("Actuator '{}' release failed: {}", name, e);
    }
    info!("Actuator '{}' stopped", name);
    outcome.and(released)
}
