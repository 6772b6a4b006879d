//! Outbound application events.
//!
//! The decoders and actuator loops emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; on the device they become log lines.

use crate::blink::TriggerDecision;
use crate::press::{PressCode, Verdict};

/// Which actuator completed a timed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorKind {
    KeyButton,
    DoorServo,
    Doorbell,
    Buzzer,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoorbotEvent {
    /// All loops are running.
    Started,

    /// A debounced indicator blink was confirmed.
    Blink { count: u32, decision: TriggerDecision },

    /// A press sequence was dispatched and evaluated.
    CodeEntered { code: PressCode, verdict: Verdict },

    /// An incomplete press sequence aged out.
    SequenceDiscarded { events: usize },

    /// An actuator finished a timed sequence.
    Actuated(ActuatorKind),

    /// All loops have been joined.
    Stopped,
}
