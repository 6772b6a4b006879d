//! State shared between the decoders and the actuator loops.
//!
//! ```text
//!  Blink decoder ──▶ press_key_button ──▶ key relay loop
//!  Press decoder ──▶ open_door        ──▶ servo loop
//!                ──▶ ring_doorbell    ──▶ doorbell loop
//!                ──▶ chirps (FIFO)    ──▶ buzzer loop
//!  Button sampler ─▶ button_edges     ──▶ press decoder loop
//!  GPIO ISRs     ──▶ raw_edges        ──▶ edge dispatch
//! ```
//!
//! Owned by the controller and handed to every loop behind an `Arc`.
//! Each field has one writer role and one reader role.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::drivers::buzzer::Chirp;
use crate::events::{EdgeQueue, RawEdge};
use crate::press::EdgeEvent;

/// Chirps waiting for the buzzer.  A full queue drops the new chirp.
///
/// At most one chirp is queued per dispatched sequence, and dispatches are
/// at least the single-press quiet period apart (1 s by default) while the
/// longest chirp plays for 400 ms, so the buzzer drains faster than the
/// queue fills.
pub const CHIRP_QUEUE_DEPTH: usize = 8;
/// Debounced button edges waiting for the press decoder.
pub const BUTTON_EDGE_QUEUE_DEPTH: usize = 32;

/// Single-slot, last-write-wins request flag.
#[derive(Debug, Default)]
pub struct Intent(AtomicBool);

impl Intent {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Request the action.  Asserting an already pending intent is a no-op.
    pub fn assert(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the request.  Returns `true` at most once per assertion.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The three boolean intents.
#[derive(Debug, Default)]
pub struct Intents {
    pub press_key_button: Intent,
    pub open_door: Intent,
    pub ring_doorbell: Intent,
}

pub struct SharedState {
    pub intents: Intents,
    pub chirps: Channel<CriticalSectionRawMutex, Chirp, CHIRP_QUEUE_DEPTH>,
    pub button_edges: Channel<CriticalSectionRawMutex, EdgeEvent, BUTTON_EDGE_QUEUE_DEPTH>,
    pub raw_edges: EdgeQueue,
    running: AtomicBool,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            intents: Intents::default(),
            chirps: Channel::new(),
            button_edges: Channel::new(),
            raw_edges: EdgeQueue::new(),
            running: AtomicBool::new(true),
        }
    }

    /// Checked by every loop once per iteration.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask every loop to finish its current sequence and exit.
    pub fn request_shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("Shutdown requested");
        }
    }

    /// Queue a chirp for the buzzer.  Returns `false` if it was dropped.
    pub fn enqueue_chirp(&self, chirp: Chirp) -> bool {
        match self.chirps.try_send(chirp) {
            Ok(()) => true,
            Err(_) => {
                warn!("Chirp queue full, chirp dropped");
                false
            }
        }
    }

    /// Hand a debounced button edge to the press decoder.
    pub fn enqueue_button_edge(&self, edge: EdgeEvent) -> bool {
        match self.button_edges.try_send(edge) {
            Ok(()) => true,
            Err(_) => {
                warn!("Button edge queue full, {:?} dropped", edge.direction);
                false
            }
        }
    }

    /// Edge notification entry point.  Lock-free and non-blocking, so it
    /// may be called from interrupt context.  No logging here.
    pub fn notify_edge(&self, edge: RawEdge) -> bool {
        self.raw_edges.push(edge)
    }
}
