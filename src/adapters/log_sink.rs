//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::DoorbotEvent;
use crate::app::ports::EventSink;
use crate::blink::TriggerDecision;
use crate::press::Verdict;

/// Adapter that logs every [`DoorbotEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &DoorbotEvent) {
        match event {
            DoorbotEvent::Started => info!("START | doorbot v{}", env!("CARGO_PKG_VERSION")),
            DoorbotEvent::Blink { count, decision } => match decision {
                TriggerDecision::None => info!("BLINK | count={}", count),
                TriggerDecision::Granted(t) => {
                    info!("BLINK | count={} | {:?} trigger granted", count, t);
                }
                TriggerDecision::Denied(t) => {
                    warn!("BLINK | count={} | {:?} trigger outside window", count, t);
                }
            },
            DoorbotEvent::CodeEntered { code, verdict } => match verdict {
                Verdict::OpenDoor(grant) => info!("CODE  | [{}] -> open ({:?})", code, grant),
                Verdict::RingDoorbell => info!("CODE  | [{}] -> doorbell", code),
                Verdict::Rejected => warn!("CODE  | [{}] -> rejected", code),
            },
            DoorbotEvent::SequenceDiscarded { events } => {
                info!("CODE  | incomplete sequence discarded ({} edges)", events);
            }
            DoorbotEvent::Actuated(kind) => info!("ACT   | {:?} done", kind),
            DoorbotEvent::Stopped => info!("STOP  | all loops joined"),
        }
    }
}
