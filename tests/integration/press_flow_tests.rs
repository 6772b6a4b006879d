//! Button edges → press decoder → matcher → intents and chirps.
//!
//! Drives `PressLoop::step` by hand with explicit uptimes; no threads.

use doorbot::app::events::DoorbotEvent;
use doorbot::app::service::PressLoop;
use doorbot::app::shared::SharedState;
use doorbot::drivers::buzzer::Chirp;
use doorbot::press::{EdgeEvent, Grant, Symbol, Verdict};

use super::mock_hw::{test_config, weekday_at, weekend_at, RecordingSink, TestClock};

/// Enter one press per `(down_ms, up_ms)` pair, stepping the loop at
/// each edge's own timestamp as the press thread would.
fn enter(press_loop: &mut PressLoop, shared: &SharedState, clock: &TestClock, sink: &RecordingSink, presses: &[(u64, u64)]) {
    for &(down, up) in presses {
        assert!(shared.enqueue_button_edge(EdgeEvent::down(down)));
        assert!(press_loop.step(down, shared, clock, sink));
        assert!(shared.enqueue_button_edge(EdgeEvent::up(up)));
        assert!(press_loop.step(up, shared, clock, sink));
    }
}

fn verdicts(sink: &RecordingSink) -> Vec<Verdict> {
    sink.events()
        .into_iter()
        .filter_map(|e| match e {
            DoorbotEvent::CodeEntered { verdict, .. } => Some(verdict),
            _ => None,
        })
        .collect()
}

// Primary code is short, long, short.
const PRIMARY: [(u64, u64); 3] = [(0, 200), (400, 2400), (2600, 2800)];
// Override code is long, long, long.
const OVERRIDE: [(u64, u64); 3] = [(0, 2000), (2200, 4200), (4400, 6400)];

#[test]
fn primary_code_in_window_opens_door_with_granted_chirp() {
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(10, 0));
    let sink = RecordingSink::new();
    let mut press_loop = PressLoop::new(&test_config());

    enter(&mut press_loop, &shared, &clock, &sink, &PRIMARY);
    press_loop.step(4801, &shared, &clock, &sink);

    assert_eq!(verdicts(&sink), vec![Verdict::OpenDoor(Grant::Primary)]);
    assert!(shared.intents.open_door.is_pending());
    assert_eq!(shared.chirps.try_receive().ok(), Some(Chirp::granted()));

    let code = sink.events().into_iter().find_map(|e| match e {
        DoorbotEvent::CodeEntered { code, .. } => Some(code),
        _ => None,
    });
    assert_eq!(
        code.unwrap().symbols(),
        &[Symbol::Short, Symbol::Long, Symbol::Short]
    );
}

#[test]
fn sequence_waits_for_the_full_quiet_period() {
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(10, 0));
    let sink = RecordingSink::new();
    let mut press_loop = PressLoop::new(&test_config());

    enter(&mut press_loop, &shared, &clock, &sink, &PRIMARY);
    // Multi-press quiet period is 2000 ms and must be exceeded.
    press_loop.step(4800, &shared, &clock, &sink);
    assert!(verdicts(&sink).is_empty());
    assert!(!press_loop.decoder().is_idle());

    press_loop.step(4801, &shared, &clock, &sink);
    assert_eq!(verdicts(&sink).len(), 1);
    assert!(press_loop.decoder().is_idle());
}

#[test]
fn primary_code_outside_window_is_rejected_with_denied_chirp() {
    let shared = SharedState::new();
    let clock = TestClock::new(weekend_at(10, 0));
    let sink = RecordingSink::new();
    let mut press_loop = PressLoop::new(&test_config());

    enter(&mut press_loop, &shared, &clock, &sink, &PRIMARY);
    press_loop.step(5000, &shared, &clock, &sink);

    assert_eq!(verdicts(&sink), vec![Verdict::Rejected]);
    assert!(!shared.intents.open_door.is_pending());
    assert_eq!(shared.chirps.try_receive().ok(), Some(Chirp::denied()));
}

#[test]
fn override_code_opens_door_at_any_time() {
    let shared = SharedState::new();
    let clock = TestClock::new(weekend_at(3, 0));
    let sink = RecordingSink::new();
    let mut press_loop = PressLoop::new(&test_config());

    enter(&mut press_loop, &shared, &clock, &sink, &OVERRIDE);
    press_loop.step(8500, &shared, &clock, &sink);

    assert_eq!(verdicts(&sink), vec![Verdict::OpenDoor(Grant::Override)]);
    assert!(shared.intents.open_door.is_pending());
}

#[test]
fn single_press_rings_doorbell_without_chirp() {
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(22, 0));
    let sink = RecordingSink::new();
    let mut press_loop = PressLoop::new(&test_config());

    enter(&mut press_loop, &shared, &clock, &sink, &[(100, 300)]);
    // Single-press quiet period is 1000 ms.
    press_loop.step(1300, &shared, &clock, &sink);
    assert!(verdicts(&sink).is_empty());
    press_loop.step(1301, &shared, &clock, &sink);

    assert_eq!(verdicts(&sink), vec![Verdict::RingDoorbell]);
    assert!(shared.intents.ring_doorbell.is_pending());
    assert!(!shared.intents.open_door.is_pending());
    assert!(shared.chirps.try_receive().is_err());
}

#[test]
fn ambiguous_press_length_is_rejected() {
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(10, 0));
    let sink = RecordingSink::new();
    let mut press_loop = PressLoop::new(&test_config());

    // 1200 ms sits between short (≤900) and long (≥1600).
    enter(&mut press_loop, &shared, &clock, &sink, &[(0, 200), (400, 1600), (1800, 2000)]);
    press_loop.step(4001, &shared, &clock, &sink);

    let code = sink.events().into_iter().find_map(|e| match e {
        DoorbotEvent::CodeEntered { code, verdict } => Some((code, verdict)),
        _ => None,
    });
    let (code, verdict) = code.unwrap();
    assert_eq!(code.symbols()[1], Symbol::Invalid);
    assert_eq!(verdict, Verdict::Rejected);
}

#[test]
fn dangling_press_is_discarded_after_timeout() {
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(10, 0));
    let sink = RecordingSink::new();
    let mut press_loop = PressLoop::new(&test_config());

    assert!(shared.enqueue_button_edge(EdgeEvent::down(1000)));
    assert!(press_loop.step(1000, &shared, &clock, &sink));

    press_loop.step(7000, &shared, &clock, &sink);
    assert!(sink.events().is_empty());

    press_loop.step(7001, &shared, &clock, &sink);
    assert_eq!(sink.events(), vec![DoorbotEvent::SequenceDiscarded { events: 1 }]);
    assert!(press_loop.decoder().is_idle());
    assert!(verdicts(&sink).is_empty());
}

#[test]
fn repeated_codes_leave_one_pending_open_request() {
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(10, 0));
    let sink = RecordingSink::new();
    let mut press_loop = PressLoop::new(&test_config());

    enter(&mut press_loop, &shared, &clock, &sink, &PRIMARY);
    press_loop.step(5000, &shared, &clock, &sink);
    let again: Vec<(u64, u64)> = PRIMARY.iter().map(|&(d, u)| (d + 10_000, u + 10_000)).collect();
    enter(&mut press_loop, &shared, &clock, &sink, &again);
    press_loop.step(15_000, &shared, &clock, &sink);

    assert_eq!(verdicts(&sink).len(), 2);
    assert!(shared.intents.open_door.take());
    assert!(!shared.intents.open_door.take());
}
