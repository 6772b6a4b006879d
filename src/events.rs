//! Interrupt-side edge records.
//!
//! Edges are produced by the GPIO ISRs on the indicator and button lines
//! and consumed by the single edge-dispatch thread, which debounces them
//! and feeds the blink and press decoders.
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌────────────────┐
//! │ Indicator ISR│────▶│               │     │                │
//! │              │     │ RawEdge queue │────▶│ Edge dispatch  │
//! │ Button ISR   │────▶│  (bounded)    │     │ (debounce)     │
//! └──────────────┘     └───────────────┘     └────────────────┘
//! ```
//!
//! The record is immutable and `Copy`; the ISR never touches decoder state.

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Depth of the raw edge queue.  A full queue drops the newest edge.
pub const RAW_EDGE_QUEUE_CAP: usize = 32;

/// Which monitored input produced the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLine {
    /// Intercom status LED (active-low).
    Indicator,
    /// Visitor push-button (active-high).
    Button,
}

/// A timestamped edge notification, as captured in interrupt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEdge {
    pub line: InputLine,
    /// Microseconds of uptime at the interrupt.
    pub at_us: u64,
    /// Pin level read inside the interrupt, after the transition.
    pub high: bool,
}

impl RawEdge {
    pub fn new(line: InputLine, at_us: u64, high: bool) -> Self {
        Self { line, at_us, high }
    }

    /// Observation time in milliseconds of uptime.
    pub fn at_ms(&self) -> u64 {
        self.at_us / 1000
    }
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// ISRs write (produce), the edge-dispatch thread reads (consume).
// Each slot is two 32-bit words because the Xtensa cores have no 64-bit
// atomics.  The top two bits of `hi` carry the line and the level; 62 bits
// of microseconds outlast any uptime.  The slot is written before `head` is published with Release
// and read after `head` is observed with Acquire.

const LINE_BIT: u32 = 1 << 31;
const LEVEL_BIT: u32 = 1 << 30;
const FLAG_BITS: u32 = LINE_BIT | LEVEL_BIT;

/// Bounded queue of [`RawEdge`]s, safe to push from interrupt context.
///
/// Single producer: all GPIO handlers run from the one ISR service task.
/// Single consumer: the edge-dispatch thread.
pub struct EdgeQueue {
    head: AtomicUsize,
    tail: AtomicUsize,
    hi: [AtomicU32; RAW_EDGE_QUEUE_CAP],
    lo: [AtomicU32; RAW_EDGE_QUEUE_CAP],
}

impl Default for EdgeQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeQueue {
    pub const fn new() -> Self {
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            hi: [const { AtomicU32::new(0) }; RAW_EDGE_QUEUE_CAP],
            lo: [const { AtomicU32::new(0) }; RAW_EDGE_QUEUE_CAP],
        }
    }

    /// Push an edge.  Lock-free; returns `false` if the queue is full.
    pub fn push(&self, edge: RawEdge) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let next_head = (head + 1) % RAW_EDGE_QUEUE_CAP;

        if next_head == tail {
            return false; // Queue full, drop edge.
        }

        let line = match edge.line {
            InputLine::Indicator => 0,
            InputLine::Button => LINE_BIT,
        };
        let level = if edge.high { LEVEL_BIT } else { 0 };
        self.hi[head].store(line | level | ((edge.at_us >> 32) as u32 & !FLAG_BITS), Ordering::Relaxed);
        self.lo[head].store(edge.at_us as u32, Ordering::Relaxed);

        self.head.store(next_head, Ordering::Release);
        true
    }

    /// Pop the oldest edge, or `None` if empty.
    pub fn pop(&self) -> Option<RawEdge> {
        let tail = self.tail.load(Ordering::Relaxed);
        let edge = self.peek()?;
        self.tail.store((tail + 1) % RAW_EDGE_QUEUE_CAP, Ordering::Release);
        Some(edge)
    }

    /// The oldest edge without removing it.  Consumer side only.
    pub fn peek(&self) -> Option<RawEdge> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail == head {
            return None;
        }

        let hi = self.hi[tail].load(Ordering::Relaxed);
        let lo = self.lo[tail].load(Ordering::Relaxed);

        let line = if hi & LINE_BIT == 0 {
            InputLine::Indicator
        } else {
            InputLine::Button
        };
        let at_us = (u64::from(hi & !FLAG_BITS) << 32) | u64::from(lo);
        Some(RawEdge {
            line,
            at_us,
            high: hi & LEVEL_BIT != 0,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        (head + RAW_EDGE_QUEUE_CAP - tail) % RAW_EDGE_QUEUE_CAP
    }
}
