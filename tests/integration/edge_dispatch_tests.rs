//! Raw edges → debounce → blink decoder / button queue.

use doorbot::app::events::DoorbotEvent;
use doorbot::app::service::EdgeDispatcher;
use doorbot::app::shared::SharedState;
use doorbot::blink::{BlinkTrigger, TriggerDecision};
use doorbot::events::{InputLine, RawEdge};
use doorbot::press::EdgeDirection;

use super::mock_hw::{test_config, weekday_at, weekend_at, FastDelay, LevelPin, RecordingSink, TestClock};

type Dispatcher = EdgeDispatcher<LevelPin, LevelPin, FastDelay>;

/// Indicator lit (line low), button released (line low).
fn dispatcher() -> (Dispatcher, LevelPin, LevelPin) {
    let indicator = LevelPin::new(false);
    let button = LevelPin::new(false);
    let d = EdgeDispatcher::new(&test_config(), indicator.clone(), button.clone(), FastDelay);
    (d, indicator, button)
}

/// Indicator edge: the line goes low when the LED lights.
fn blink_at(ms: u64) -> RawEdge {
    RawEdge::new(InputLine::Indicator, ms * 1000, false)
}

fn button_at(ms: u64, high: bool) -> RawEdge {
    RawEdge::new(InputLine::Button, ms * 1000, high)
}

fn drain(d: &mut Dispatcher, shared: &SharedState, clock: &TestClock, sink: &RecordingSink) {
    while let Some(edge) = shared.raw_edges.pop() {
        d.dispatch(edge, shared, clock, sink).unwrap();
    }
}

fn queued_button_edges(shared: &SharedState) -> Vec<(EdgeDirection, u64)> {
    std::iter::from_fn(|| shared.button_edges.try_receive().ok())
        .map(|e| (e.direction, e.at_ms))
        .collect()
}

fn decisions(sink: &RecordingSink) -> Vec<(u32, TriggerDecision)> {
    sink.events()
        .into_iter()
        .filter_map(|e| match e {
            DoorbotEvent::Blink { count, decision } => Some((count, decision)),
            _ => None,
        })
        .collect()
}

#[test]
fn four_blinks_in_window_request_key_button() {
    let (mut d, _, _) = dispatcher();
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(9, 30));
    let sink = RecordingSink::new();

    for i in 0..4 {
        d.dispatch(blink_at(10_000 + i * 500), &shared, &clock, &sink).unwrap();
    }

    let seen = decisions(&sink);
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[3], (4, TriggerDecision::Granted(BlinkTrigger::Immediate)));
    assert!(seen[..3].iter().all(|(_, dec)| *dec == TriggerDecision::None));
    assert!(shared.intents.press_key_button.is_pending());
}

#[test]
fn four_blinks_outside_window_are_denied() {
    let (mut d, _, _) = dispatcher();
    let shared = SharedState::new();
    let clock = TestClock::new(weekend_at(9, 30));
    let sink = RecordingSink::new();

    for i in 0..4 {
        d.dispatch(blink_at(i * 500), &shared, &clock, &sink).unwrap();
    }

    assert_eq!(
        decisions(&sink).last(),
        Some(&(4, TriggerDecision::Denied(BlinkTrigger::Immediate)))
    );
    assert!(!shared.intents.press_key_button.is_pending());
}

#[test]
fn long_pause_starts_a_new_blink_sequence() {
    let (mut d, _, _) = dispatcher();
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(9, 30));
    let sink = RecordingSink::new();

    for ms in [0, 500, 1000] {
        d.dispatch(blink_at(ms), &shared, &clock, &sink).unwrap();
    }
    // Exactly the minimum pause counts as a new sequence.
    d.dispatch(blink_at(4000), &shared, &clock, &sink).unwrap();

    assert_eq!(d.blink_count(), 1);
    assert!(!shared.intents.press_key_button.is_pending());
}

#[test]
fn indicator_spike_is_ignored() {
    let (mut d, indicator, _) = dispatcher();
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(9, 30));
    let sink = RecordingSink::new();

    indicator.set_high(true);
    d.dispatch(blink_at(100), &shared, &clock, &sink).unwrap();

    assert!(sink.events().is_empty());
    assert_eq!(d.blink_count(), 0);
}

#[test]
fn button_edges_reach_press_queue_in_order() {
    let (mut d, _, button) = dispatcher();
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(9, 30));
    let sink = RecordingSink::new();

    button.set_high(true);
    d.dispatch(button_at(1000, true), &shared, &clock, &sink).unwrap();
    // Bounce: same level again, dropped.
    d.dispatch(button_at(1002, true), &shared, &clock, &sink).unwrap();
    button.set_high(false);
    d.dispatch(button_at(1300, false), &shared, &clock, &sink).unwrap();

    assert_eq!(
        queued_button_edges(&shared),
        [(EdgeDirection::Down, 1000), (EdgeDirection::Up, 1300)]
    );
}

#[test]
fn late_bounce_edge_keeps_the_real_release_time() {
    let (mut d, _, button) = dispatcher();
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(9, 30));
    let sink = RecordingSink::new();

    button.set_high(true);
    d.dispatch(button_at(0, true), &shared, &clock, &sink).unwrap();
    d.dispatch(button_at(2, true), &shared, &clock, &sink).unwrap();
    // Released at 2000 ms while the 4 ms bounce edge was still queued.
    button.set_high(false);
    d.dispatch(button_at(4, true), &shared, &clock, &sink).unwrap();
    d.dispatch(button_at(2000, false), &shared, &clock, &sink).unwrap();

    assert_eq!(
        queued_button_edges(&shared),
        [(EdgeDirection::Down, 0), (EdgeDirection::Up, 2000)]
    );
}

#[test]
fn queued_bounce_burst_yields_one_press() {
    let (mut d, _, button) = dispatcher();
    let shared = SharedState::new();
    let clock = TestClock::new(weekday_at(9, 30));
    let sink = RecordingSink::new();

    button.set_high(true);
    d.dispatch(button_at(0, true), &shared, &clock, &sink).unwrap();

    // Chatter after the press, then the release, all processed after the
    // line settled low.
    for (ms, high) in [(2, false), (3, true), (5, false), (6, true), (2000, false)] {
        assert!(shared.notify_edge(button_at(ms, high)));
    }
    button.set_high(false);
    drain(&mut d, &shared, &clock, &sink);

    assert_eq!(
        queued_button_edges(&shared),
        [(EdgeDirection::Down, 0), (EdgeDirection::Up, 2000)]
    );
}

#[test]
fn blink_is_judged_at_the_time_it_was_seen() {
    let (mut d, _, _) = dispatcher();
    let shared = SharedState::new();
    // Processed at 19:00:00 (window closed), seen at 18:59:58 and earlier.
    let clock = TestClock::new(weekday_at(19, 0));
    clock.set_uptime(12_000);
    let sink = RecordingSink::new();

    for i in 0..4 {
        assert!(shared.notify_edge(blink_at(8_500 + i * 500)));
    }
    drain(&mut d, &shared, &clock, &sink);

    assert_eq!(
        decisions(&sink).last(),
        Some(&(4, TriggerDecision::Granted(BlinkTrigger::Immediate)))
    );
    assert!(shared.intents.press_key_button.is_pending());
}
