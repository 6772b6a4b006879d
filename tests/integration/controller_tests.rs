//! Full controller with every loop on its own thread.
//!
//! Edges are injected the way the ISRs inject them; actuator writes land
//! in a shared [`Trace`].

use std::sync::Arc;

use embedded_hal::delay::DelayNs;

use doorbot::app::events::{ActuatorKind, DoorbotEvent};
use doorbot::app::service::{Controller, EdgeDispatcher};
use doorbot::app::shared::SharedState;
use doorbot::drivers::buzzer::Buzzer;
use doorbot::drivers::door_servo::{DoorServo, ServoTiming};
use doorbot::drivers::heartbeat::Heartbeat;
use doorbot::drivers::relay::RelayPulse;
use doorbot::error::{Error, IoError};
use doorbot::events::{InputLine, RawEdge};
use doorbot::press::{EdgeEvent, Verdict};
use doorbot::scheduler::{run_actuator, Actuator};

use super::mock_hw::{test_config, weekday_at, FastDelay, LevelPin, RecordingSink, TestClock, Trace, TracePin, wait_until};

struct Rig {
    controller: Controller,
    clock: Arc<TestClock>,
    sink: Arc<RecordingSink>,
    trace: Trace,
}

fn start_with_key_relay(key_relay: impl FnOnce(&Trace) -> TracePin) -> Rig {
    let config = test_config();
    let trace = Trace::new();
    let clock = Arc::new(TestClock::new(weekday_at(10, 0)));
    let sink = Arc::new(RecordingSink::new());

    // Indicator lit, button released.
    let edges = EdgeDispatcher::new(&config, LevelPin::new(false), LevelPin::new(false), FastDelay);
    let actuators: Vec<Box<dyn Actuator>> = vec![
        Box::new(RelayPulse::key_button(key_relay(&trace), FastDelay, config.key_button_press_ms)),
        Box::new(DoorServo::new(
            trace.pwm("servo"),
            trace.output("servo-power"),
            FastDelay,
            ServoTiming::from_config(&config),
        )),
        Box::new(RelayPulse::doorbell(trace.output("bell"), FastDelay, config.doorbell_press_ms)),
        Box::new(Buzzer::new(trace.pwm("buzzer"), FastDelay, config.buzzer_duty_percent)),
        Box::new(Heartbeat::new(
            trace.output("heartbeat"),
            FastDelay,
            config.heartbeat_pulse_ms,
            config.heartbeat_period_ms,
        )),
    ];

    let controller = Controller::start(
        &config,
        Arc::new(SharedState::new()),
        edges,
        actuators,
        clock.clone(),
        FastDelay,
        sink.clone(),
    )
    .unwrap();

    Rig {
        controller,
        clock,
        sink,
        trace,
    }
}

fn start() -> Rig {
    start_with_key_relay(|t| t.output("key"))
}

fn actuated(kind: ActuatorKind) -> impl Fn(&DoorbotEvent) -> bool {
    move |e| *e == DoorbotEvent::Actuated(kind)
}

#[test]
fn start_and_shutdown_release_outputs() {
    let rig = start();
    assert!(rig.sink.wait_for(|e| *e == DoorbotEvent::Started));

    rig.controller.shutdown().unwrap();

    let events = rig.sink.events();
    assert_eq!(events.first(), Some(&DoorbotEvent::Started));
    assert_eq!(events.last(), Some(&DoorbotEvent::Stopped));
    assert_eq!(rig.trace.of("key").last().map(String::as_str), Some("low"));
    assert_eq!(rig.trace.of("bell").last().map(String::as_str), Some("low"));
    assert_eq!(rig.trace.of("servo-power").last().map(String::as_str), Some("low"));
    assert_eq!(rig.trace.of("buzzer").last().map(String::as_str), Some("stop"));
}

#[test]
fn heartbeat_pulses_while_running() {
    let rig = start();
    assert!(wait_until(|| rig.trace.of("heartbeat").len() >= 2));
    rig.controller.shutdown().unwrap();

    let pulses = rig.trace.of("heartbeat");
    assert_eq!(pulses.first().map(String::as_str), Some("high"));
    assert_eq!(pulses.last().map(String::as_str), Some("low"));
}

#[test]
fn blinks_in_window_press_the_key_button() {
    let rig = start();
    let shared = rig.controller.shared().clone();

    for i in 0..4u64 {
        assert!(shared.notify_edge(RawEdge::new(InputLine::Indicator, (1_000 + i * 400) * 1000, false)));
    }

    assert!(rig.sink.wait_for(actuated(ActuatorKind::KeyButton)));
    rig.controller.shutdown().unwrap();

    let key = rig.trace.of("key");
    assert_eq!(&key[..2], &["high".to_owned(), "low".to_owned()]);
}

#[test]
fn single_press_rings_the_doorbell() {
    let rig = start();
    let shared = rig.controller.shared().clone();

    assert!(shared.enqueue_button_edge(EdgeEvent::down(100)));
    assert!(shared.enqueue_button_edge(EdgeEvent::up(300)));
    while !shared.button_edges.is_empty() {
        std::thread::yield_now();
    }
    rig.clock.set_uptime(2_000);

    assert!(rig.sink.wait_for(actuated(ActuatorKind::Doorbell)));
    rig.controller.shutdown().unwrap();

    assert!(rig.sink.events().iter().any(|e| matches!(
        e,
        DoorbotEvent::CodeEntered { verdict: Verdict::RingDoorbell, .. }
    )));
    assert_eq!(rig.trace.of("buzzer"), ["stop"]);
}

#[test]
fn primary_code_opens_the_door_and_chirps() {
    let rig = start();
    let shared = rig.controller.shared().clone();

    // short, long, short
    for (down, up) in [(0, 200), (400, 2400), (2600, 2800)] {
        assert!(shared.enqueue_button_edge(EdgeEvent::down(down)));
        assert!(shared.enqueue_button_edge(EdgeEvent::up(up)));
    }
    while !shared.button_edges.is_empty() {
        std::thread::yield_now();
    }
    rig.clock.set_uptime(5_000);

    assert!(rig.sink.wait_for(actuated(ActuatorKind::DoorServo)));
    assert!(rig.sink.wait_for(actuated(ActuatorKind::Buzzer)));
    rig.controller.shutdown().unwrap();

    let power = rig.trace.of("servo-power");
    assert_eq!(&power[..2], &["high".to_owned(), "low".to_owned()]);
    let servo = rig.trace.of("servo");
    assert!(servo[0].starts_with("start 50Hz"));
    assert!(rig.trace.of("buzzer").iter().any(|l| l == "freq 2000Hz"));
    assert!(rig.trace.of("bell").iter().all(|l| l == "low"));
}

#[test]
fn failing_output_stops_every_loop() {
    let rig = start_with_key_relay(|t| t.broken_output("key"));
    rig.controller.shared().intents.press_key_button.assert();

    let result = rig.controller.wait();

    assert_eq!(result, Err(Error::Io(IoError::GpioWrite("key relay"))));
    assert_eq!(rig.sink.events().last(), Some(&DoorbotEvent::Stopped));
    assert!(rig.trace.of("key").is_empty());
}

/// Requests shutdown whenever a sequence waits, as if it arrived
/// mid-actuation.
struct ShutdownOnDelay(Arc<SharedState>);

impl DelayNs for ShutdownOnDelay {
    fn delay_ns(&mut self, _ns: u32) {
        self.0.request_shutdown();
    }
}

#[test]
fn shutdown_mid_sequence_lets_the_servo_finish() {
    let config = test_config();
    let shared = Arc::new(SharedState::new());
    let trace = Trace::new();
    let sink = RecordingSink::new();
    let mut servo = DoorServo::new(
        trace.pwm("servo"),
        trace.output("servo-power"),
        ShutdownOnDelay(shared.clone()),
        ServoTiming::from_config(&config),
    );

    shared.intents.open_door.assert();
    run_actuator(&mut servo, &shared, &mut FastDelay, &sink, 1).unwrap();

    assert!(!shared.is_running());
    assert_eq!(sink.events(), [DoorbotEvent::Actuated(ActuatorKind::DoorServo)]);
    // Rail on, down, up, neutral, rail off; then release.
    assert_eq!(trace.of("servo-power"), ["high", "low", "low"]);
    let servo = trace.of("servo");
    assert_eq!(servo.len(), 5);
    assert!(servo[0].starts_with("start 50Hz"));
    assert!(servo[1].starts_with("duty") && servo[2].starts_with("duty"));
    assert_ne!(servo[1], servo[2]);
    assert_eq!(&servo[3..], ["duty 100%", "duty 100%"]);
}

#[test]
fn shutdown_mid_pulse_lets_the_key_relay_finish() {
    let config = test_config();
    let shared = Arc::new(SharedState::new());
    let trace = Trace::new();
    let sink = RecordingSink::new();
    let mut relay = RelayPulse::key_button(
        trace.output("key"),
        ShutdownOnDelay(shared.clone()),
        config.key_button_press_ms,
    );

    shared.intents.press_key_button.assert();
    run_actuator(&mut relay, &shared, &mut FastDelay, &sink, 1).unwrap();

    assert!(!shared.is_running());
    assert_eq!(sink.events(), [DoorbotEvent::Actuated(ActuatorKind::KeyButton)]);
    assert_eq!(trace.of("key"), ["high", "low", "low"]);
}
