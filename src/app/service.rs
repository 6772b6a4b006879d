//! Application service: decoders and loop orchestration.
//!
//! ```text
//!  GPIO ISRs ──▶ raw_edges ──▶ ┌──────────────────┐ ──▶ press_key_button
//!                              │  EdgeDispatcher   │
//!                              │ watcher · sampler │ ──▶ button_edges ──▶ ┌───────────┐
//!                              └──────────────────┘                       │ PressLoop │
//!                                                       open_door ◀───────│ decoder · │
//!                                                   ring_doorbell ◀───────│ matcher   │
//!                                                          chirps ◀───────└───────────┘
//! ```
//!
//! [`Controller`] spawns one thread per loop and drains them all as soon
//! as any one exits.

use std::sync::Arc;
use std::thread::JoinHandle;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::{debug, error, info};

use crate::access::ZoneTable;
use crate::blink::{BlinkDecoder, BlinkThresholds, IndicatorWatcher, TriggerDecision};
use crate::config::DoorbotConfig;
use crate::drivers::button::ButtonSampler;
use crate::drivers::buzzer::Chirp;
use crate::drivers::task_pin::{spawn_on_core, Core, TaskSpec};
use crate::error::{Error, Result};
use crate::events::{InputLine, RawEdge};
use crate::press::{CodeMatcher, PressCode, PressDecoder, PressTiming, SequenceOutcome, Verdict};
use crate::scheduler::{run_actuator, Actuator};

use super::events::DoorbotEvent;
use super::ports::{EventSink, TimePort};
use super::shared::SharedState;

const EDGE_TASK: TaskSpec = TaskSpec::new(Core::Pro, 6, 16, "edges\0");
const PRESS_TASK: TaskSpec = TaskSpec::new(Core::Pro, 5, 16, "press\0");
const ACTUATOR_PRIORITY: u8 = 4;
const ACTUATOR_STACK_KB: usize = 12;

// ───────────────────────────────────────────────────────────────
// Edge dispatch
// ───────────────────────────────────────────────────────────────

/// Runs in the edge-dispatch context: debounces each raw edge and feeds
/// the blink decoder or the button queue.
pub struct EdgeDispatcher<IP, BP, D> {
    indicator: IndicatorWatcher<IP, D>,
    button: ButtonSampler<BP, D>,
    zones: ZoneTable,
}

impl<IP, BP, D> EdgeDispatcher<IP, BP, D>
where
    IP: InputPin,
    BP: InputPin,
    D: DelayNs + Clone,
{
    pub fn new(config: &DoorbotConfig, indicator_pin: IP, button_pin: BP, delay: D) -> Self {
        let decoder = BlinkDecoder::new(BlinkThresholds::from_config(config));
        Self {
            indicator: IndicatorWatcher::new(
                indicator_pin,
                delay.clone(),
                config.indicator_debounce_ms,
                decoder,
            ),
            button: ButtonSampler::new(button_pin, delay, config.button_debounce_ms),
            zones: config.zones.clone(),
        }
    }

    /// Handle one raw edge, including its debounce wait.
    ///
    /// A button edge followed in the queue by another button edge within
    /// one debounce interval is bounce and skipped without sampling, so a
    /// burst drains at queue speed.
    pub fn dispatch<T, S>(&mut self, edge: RawEdge, shared: &SharedState, clock: &T, sink: &S) -> Result<()>
    where
        T: TimePort + ?Sized,
        S: EventSink + ?Sized,
    {
        match edge.line {
            InputLine::Indicator => {
                let outcome = self
                    .indicator
                    .on_edge(edge.at_ms(), clock.local_at(edge.at_ms()), &self.zones)?;
                if let Some(outcome) = outcome {
                    if let TriggerDecision::Granted(_) = outcome.decision {
                        shared.intents.press_key_button.assert();
                    }
                    sink.emit(&DoorbotEvent::Blink {
                        count: outcome.count,
                        decision: outcome.decision,
                    });
                }
            }
            InputLine::Button => {
                if self.superseded(&edge, shared) {
                    debug!("Button: edge at {}ms superseded", edge.at_ms());
                    return Ok(());
                }
                if let Some(event) = self.button.on_edge(edge.at_ms(), edge.high)? {
                    shared.enqueue_button_edge(event);
                }
            }
        }
        Ok(())
    }

    /// Drain raw edges until shutdown.  Returns on the first I/O error.
    pub fn run<T, S, W>(
        &mut self,
        shared: &SharedState,
        clock: &T,
        sink: &S,
        idle: &mut W,
        poll_interval_ms: u32,
    ) -> Result<()>
    where
        T: TimePort + ?Sized,
        S: EventSink + ?Sized,
        W: DelayNs,
    {
        while shared.is_running() {
            match shared.raw_edges.pop() {
                Some(edge) => self.dispatch(edge, shared, clock, sink)?,
                None => idle.delay_ms(poll_interval_ms),
            }
        }
        Ok(())
    }

    fn superseded(&self, edge: &RawEdge, shared: &SharedState) -> bool {
        let window_us = u64::from(self.button.debounce_ms()) * 1000;
        shared.raw_edges.peek().is_some_and(|next| {
            next.line == InputLine::Button && next.at_us.saturating_sub(edge.at_us) < window_us
        })
    }

    pub fn blink_count(&self) -> u32 {
        self.indicator.decoder().count()
    }
}

// ───────────────────────────────────────────────────────────────
// Press decoder loop
// ───────────────────────────────────────────────────────────────

pub struct PressLoop {
    decoder: PressDecoder,
    matcher: CodeMatcher,
    zones: ZoneTable,
}

impl PressLoop {
    pub fn new(config: &DoorbotConfig) -> Self {
        Self {
            decoder: PressDecoder::new(PressTiming::from_config(config)),
            matcher: CodeMatcher::from_config(config),
            zones: config.zones.clone(),
        }
    }

    /// One iteration at uptime `now_ms`: take at most one button edge,
    /// then run the dispatch and timeout checks.  Returns `true` if an
    /// edge was consumed.
    pub fn step<T, S>(&mut self, now_ms: u64, shared: &SharedState, clock: &T, sink: &S) -> bool
    where
        T: TimePort + ?Sized,
        S: EventSink + ?Sized,
    {
        let took = match shared.button_edges.try_receive() {
            Ok(event) => {
                self.decoder.push(event);
                true
            }
            Err(_) => false,
        };

        match self.decoder.poll(now_ms) {
            Some(SequenceOutcome::Complete(code)) => {
                self.dispatch(code, shared, clock, sink);
            }
            Some(SequenceOutcome::Abandoned { events }) => {
                debug!("Press: incomplete sequence of {} edges discarded", events);
                sink.emit(&DoorbotEvent::SequenceDiscarded { events });
            }
            None => {}
        }
        took
    }

    pub fn run<T, S, W>(&mut self, shared: &SharedState, clock: &T, sink: &S, idle: &mut W, poll_interval_ms: u32)
    where
        T: TimePort + ?Sized,
        S: EventSink + ?Sized,
        W: DelayNs,
    {
        while shared.is_running() {
            if !self.step(clock.uptime_ms(), shared, clock, sink) {
                idle.delay_ms(poll_interval_ms);
            }
        }
    }

    pub fn decoder(&self) -> &PressDecoder {
        &self.decoder
    }

    fn dispatch<T, S>(&self, code: PressCode, shared: &SharedState, clock: &T, sink: &S)
    where
        T: TimePort + ?Sized,
        S: EventSink + ?Sized,
    {
        let verdict = self.matcher.evaluate(&code, &self.zones, clock.local_now());
        match verdict {
            Verdict::OpenDoor(_) => {
                shared.intents.open_door.assert();
                shared.enqueue_chirp(Chirp::granted());
            }
            // The bell is its own feedback.
            Verdict::RingDoorbell => shared.intents.ring_doorbell.assert(),
            Verdict::Rejected => {
                shared.enqueue_chirp(Chirp::denied());
            }
        }
        sink.emit(&DoorbotEvent::CodeEntered { code, verdict });
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

struct Task {
    name: &'static str,
    handle: JoinHandle<Result<()>>,
}

/// Owns every loop thread.
pub struct Controller {
    shared: Arc<SharedState>,
    sink: Arc<dyn EventSink>,
    tasks: Vec<Task>,
    poll_interval_ms: u32,
}

impl Controller {
    /// Spawn the edge-dispatch loop, the press-decoder loop, and one loop
    /// per actuator.  On spawn failure the loops already started are
    /// drained before the error is returned.
    pub fn start<IP, BP, T, D, S>(
        config: &DoorbotConfig,
        shared: Arc<SharedState>,
        edges: EdgeDispatcher<IP, BP, D>,
        actuators: Vec<Box<dyn Actuator>>,
        clock: Arc<T>,
        delay: D,
        sink: Arc<S>,
    ) -> Result<Self>
    where
        IP: InputPin + Send + 'static,
        BP: InputPin + Send + 'static,
        T: TimePort + Send + Sync + 'static,
        D: DelayNs + Clone + Send + 'static,
        S: EventSink + 'static,
    {
        let poll_interval_ms = config.poll_interval_ms;
        let mut controller = Self {
            shared,
            sink: sink.clone(),
            tasks: Vec::with_capacity(actuators.len() + 2),
            poll_interval_ms,
        };

        let spawned = controller.spawn_all(config, edges, actuators, &clock, &delay, &sink);
        if let Err(e) = spawned {
            error!("Controller: start failed: {}", e);
            // The spawn error is what the caller needs; loop results are logged.
            let _ = controller.shutdown();
            return Err(e);
        }

        info!("Controller: {} loops running", controller.tasks.len());
        sink.emit(&DoorbotEvent::Started);
        Ok(controller)
    }

    fn spawn_all<IP, BP, T, D, S>(
        &mut self,
        config: &DoorbotConfig,
        mut edges: EdgeDispatcher<IP, BP, D>,
        actuators: Vec<Box<dyn Actuator>>,
        clock: &Arc<T>,
        delay: &D,
        sink: &Arc<S>,
    ) -> Result<()>
    where
        IP: InputPin + Send + 'static,
        BP: InputPin + Send + 'static,
        T: TimePort + Send + Sync + 'static,
        D: DelayNs + Clone + Send + 'static,
        S: EventSink + 'static,
    {
        let poll = self.poll_interval_ms;

        {
            let (shared, clock, sink, mut idle) =
                (self.shared.clone(), clock.clone(), sink.clone(), delay.clone());
            self.spawn(EDGE_TASK, move || {
                edges.run(&shared, &*clock, &*sink, &mut idle, poll)
            })?;
        }

        {
            let mut press = PressLoop::new(config);
            let (shared, clock, sink, mut idle) =
                (self.shared.clone(), clock.clone(), sink.clone(), delay.clone());
            self.spawn(PRESS_TASK, move || {
                press.run(&shared, &*clock, &*sink, &mut idle, poll);
                Ok(())
            })?;
        }

        for mut actuator in actuators {
            let spec = TaskSpec::new(Core::App, ACTUATOR_PRIORITY, ACTUATOR_STACK_KB, actuator.name());
            let (shared, sink, mut idle) = (self.shared.clone(), sink.clone(), delay.clone());
            self.spawn(spec, move || {
                run_actuator(&mut actuator, &shared, &mut idle, &*sink, poll)
            })?;
        }
        Ok(())
    }

    /// Spawn one loop.  A loop that fails requests shutdown of the rest.
    fn spawn<F>(&mut self, spec: TaskSpec, body: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let shared = self.shared.clone();
        let name = spec.display_name();
        let handle = spawn_on_core(spec, move || {
            let result = body();
            if let Err(e) = &result {
                error!("Loop '{}' failed: {}", name, e);
                shared.request_shutdown();
            }
            result
        })?;
        self.tasks.push(Task { name, handle });
        Ok(())
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Block until any loop exits or shutdown is requested, then drain.
    pub fn wait(self) -> Result<()> {
        let poll = u64::from(self.poll_interval_ms);
        while self.shared.is_running() && !self.tasks.iter().any(|t| t.handle.is_finished()) {
            std::thread::sleep(std::time::Duration::from_millis(poll));
        }
        self.shutdown()
    }

    /// Request shutdown and join every loop.  Returns the first error.
    pub fn shutdown(self) -> Result<()> {
        self.shared.request_shutdown();

        let mut first: Result<()> = Ok(());
        for task in self.tasks {
            let result = match task.handle.join() {
                Ok(r) => r,
                Err(_) => {
                    error!("Loop '{}' panicked", task.name);
                    Err(Error::TaskPanicked(task.name))
                }
            };
            if first.is_ok() {
                first = result;
            }
        }

        self.sink.emit(&DoorbotEvent::Stopped);
        first
    }
}
