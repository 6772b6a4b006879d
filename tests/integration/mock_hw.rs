//! Mock hardware adapters for integration tests.
//!
//! Pins, PWM channels, the clock and the event sink all record into
//! shared handles so tests can assert on the full history while the
//! loops run on their own threads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

use doorbot::app::events::DoorbotEvent;
use doorbot::app::ports::{EventSink, PwmOutput, TimePort};
use doorbot::config::DoorbotConfig;
use doorbot::error::IoError;

// ── Time helpers ──────────────────────────────────────────────

/// Wednesday 2026-10-14 at `h:m`.
pub fn weekday_at(h: u32, m: u32) -> NaiveDateTime {
    date_at(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(), h, m)
}

/// Saturday 2026-10-17 at `h:m`.
pub fn weekend_at(h: u32, m: u32) -> NaiveDateTime {
    date_at(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(), h, m)
}

fn date_at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    date.and_hms_opt(h, m, 0).unwrap()
}

/// Defaults with both codes set and every hold time shortened.
pub fn test_config() -> DoorbotConfig {
    DoorbotConfig {
        primary_code: Some("short, long, short".parse().unwrap()),
        override_code: Some("long, long, long".parse().unwrap()),
        key_button_press_ms: 5,
        door_handle_move_ms: 5,
        doorbell_press_ms: 5,
        heartbeat_pulse_ms: 1,
        heartbeat_period_ms: 10,
        poll_interval_ms: 1,
        ..DoorbotConfig::default()
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Uptime and local time are both set by the test.
pub struct TestClock {
    uptime_ms: AtomicU64,
    local: Mutex<NaiveDateTime>,
}

#[allow(dead_code)]
impl TestClock {
    pub fn new(local: NaiveDateTime) -> Self {
        Self {
            uptime_ms: AtomicU64::new(0),
            local: Mutex::new(local),
        }
    }

    pub fn set_uptime(&self, ms: u64) {
        self.uptime_ms.store(ms, Ordering::SeqCst);
    }

    pub fn set_local(&self, at: NaiveDateTime) {
        *self.local.lock().unwrap() = at;
    }
}

impl TimePort for TestClock {
    fn uptime_ms(&self) -> u64 {
        self.uptime_ms.load(Ordering::SeqCst)
    }

    fn local_now(&self) -> NaiveDateTime {
        *self.local.lock().unwrap()
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Sleeps at most 1 ms per call so timed sequences finish quickly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastDelay;

impl DelayNs for FastDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns.min(1_000_000))));
    }
}

// ── Input pin ─────────────────────────────────────────────────

/// Input whose level is flipped by the test through a shared handle.
#[derive(Debug, Clone, Default)]
pub struct LevelPin(Arc<AtomicBool>);

#[allow(dead_code)]
impl LevelPin {
    pub fn new(high: bool) -> Self {
        Self(Arc::new(AtomicBool::new(high)))
    }

    pub fn set_high(&self, high: bool) {
        self.0.store(high, Ordering::SeqCst);
    }
}

impl ErrorType for LevelPin {
    type Error = Infallible;
}

impl InputPin for LevelPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.load(Ordering::SeqCst))
    }
}

// ── Output trace ──────────────────────────────────────────────

/// Ordered record of every output write, as `"<name> <action>"` lines.
#[derive(Debug, Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

#[allow(dead_code)]
impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: String) {
        self.0.lock().unwrap().push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Lines written by output `name`, without the name prefix.
    pub fn of(&self, name: &str) -> Vec<String> {
        let prefix = format!("{name} ");
        self.lines()
            .iter()
            .filter_map(|l| l.strip_prefix(&prefix).map(str::to_owned))
            .collect()
    }

    pub fn output(&self, name: &'static str) -> TracePin {
        TracePin {
            name,
            trace: self.clone(),
            fail: false,
        }
    }

    /// An output whose writes always fail.
    pub fn broken_output(&self, name: &'static str) -> TracePin {
        TracePin {
            name,
            trace: self.clone(),
            fail: true,
        }
    }

    pub fn pwm(&self, name: &'static str) -> TracePwm {
        TracePwm {
            name,
            trace: self.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFailed;

impl digital::Error for WriteFailed {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct TracePin {
    name: &'static str,
    trace: Trace,
    fail: bool,
}

impl TracePin {
    fn write(&mut self, level: &str) -> Result<(), WriteFailed> {
        if self.fail {
            return Err(WriteFailed);
        }
        self.trace.push(format!("{} {}", self.name, level));
        Ok(())
    }
}

impl ErrorType for TracePin {
    type Error = WriteFailed;
}

impl OutputPin for TracePin {
    fn set_low(&mut self) -> Result<(), WriteFailed> {
        self.write("low")
    }

    fn set_high(&mut self) -> Result<(), WriteFailed> {
        self.write("high")
    }
}

pub struct TracePwm {
    name: &'static str,
    trace: Trace,
}

impl PwmOutput for TracePwm {
    fn start(&mut self, frequency_hz: u32, duty_percent: f32) -> Result<(), IoError> {
        self.trace
            .push(format!("{} start {}Hz {}%", self.name, frequency_hz, duty_percent));
        Ok(())
    }

    fn set_duty_cycle(&mut self, duty_percent: f32) -> Result<(), IoError> {
        self.trace.push(format!("{} duty {}%", self.name, duty_percent));
        Ok(())
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), IoError> {
        self.trace.push(format!("{} freq {}Hz", self.name, frequency_hz));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), IoError> {
        self.trace.push(format!("{} stop", self.name));
        Ok(())
    }
}

/// Poll `cond` for up to five seconds.
pub fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DoorbotEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DoorbotEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Poll until an event matching `pred` has been emitted.
    pub fn wait_for(&self, pred: impl Fn(&DoorbotEvent) -> bool) -> bool {
        wait_until(|| self.events().iter().any(&pred))
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &DoorbotEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
