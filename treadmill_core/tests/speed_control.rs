mod common;

use std::sync::Arc;

use common::{Journal, SpyRelay, energized, entries, journal};
use rstest::rstest;
use treadmill_core::config::SpeedControlCfg;
use treadmill_core::error::ControlError;
use treadmill_core::{RelayDirection, Speed, SpeedActuatorController};
use treadmill_traits::clock::test_clock::TestClock;

fn controller(clock: &TestClock, j: &Journal) -> SpeedActuatorController<SpyRelay> {
    SpeedActuatorController::new(
        SpyRelay::new("up", j, clock),
        SpyRelay::new("down", j, clock),
        SpyRelay::new("enable", j, clock),
        SpeedControlCfg::default(),
        Arc::new(clock.clone()),
    )
}

#[rstest]
#[case(5.0, 5.0, false)]
#[case(5.0, 4.95, false)]
#[case(5.0, 5.09, false)]
#[case(5.0, 4.91, false)]
#[case(5.0, 4.903, false)]
#[case(5.0, 5.097, false)]
#[case(5.0, 4.9005, false)]
#[case(5.0, 4.9, true)]
#[case(5.0, 5.1, true)]
#[case(8.0, 2.0, true)]
#[case(0.0, 7.5, true)]
fn deadband_gates_small_deltas(#[case] reference: f32, #[case] actual: f32, #[case] acts: bool) {
    let clock = TestClock::new();
    let j = journal();
    let mut c = controller(&clock, &j);
    assert_eq!(c.evaluate(Speed::new(reference, actual)), acts);
}

#[test]
fn act_pulses_exactly_one_relay() {
    let clock = TestClock::new();
    let j = journal();
    let mut c = controller(&clock, &j);

    assert!(c.evaluate(Speed::new(8.0, 6.0)));
    assert_eq!(c.act().unwrap(), Some(RelayDirection::Increase));
    assert_eq!(
        entries(&j),
        vec![("up", true, 0), ("up", false, 1_000)],
        "one relay, held for pulse_ms"
    );

    // the snapshot is consumed
    assert_eq!(c.act().unwrap(), None);
}

#[test]
fn act_without_evaluate_does_nothing() {
    let clock = TestClock::new();
    let j = journal();
    let mut c = controller(&clock, &j);
    assert_eq!(c.act().unwrap(), None);
    assert!(entries(&j).is_empty());
}

#[test]
fn cooldowns_hold_regardless_of_magnitude() {
    let clock = TestClock::new();
    let j = journal();
    let mut c = controller(&clock, &j);

    assert!(c.evaluate(Speed::new(10.0, 2.0)));
    c.act().unwrap();

    clock.advance_ms(299);
    assert!(!c.evaluate(Speed::new(0.0, 14.0)), "decrease inside 300 ms");
    assert!(!c.evaluate(Speed::new(14.0, 0.0)), "increase inside 1000 ms");

    clock.advance_ms(1);
    assert!(c.evaluate(Speed::new(0.0, 14.0)), "decrease after 300 ms");
    assert!(!c.evaluate(Speed::new(14.0, 0.0)), "increase still cooling");

    clock.advance_ms(700);
    assert!(c.evaluate(Speed::new(14.0, 0.0)), "increase after 1000 ms");
    assert_eq!(c.act().unwrap(), Some(RelayDirection::Increase));
    assert_eq!(energized(&j), vec!["up", "up"]);
}

#[test]
fn decrease_recovers_faster_than_increase() {
    let clock = TestClock::new();
    let j = journal();
    let mut c = controller(&clock, &j);

    assert!(c.evaluate(Speed::new(3.0, 6.0)));
    assert_eq!(c.act().unwrap(), Some(RelayDirection::Decrease));
    clock.advance_ms(300);
    assert!(c.evaluate(Speed::new(3.0, 5.0)));
    assert_eq!(c.act().unwrap(), Some(RelayDirection::Decrease));
    assert_eq!(energized(&j), vec!["down", "down"]);
    assert_eq!(c.lapse_ms(), 0);
}

#[test]
fn slow_down_pulses_until_rest() {
    let clock = TestClock::new();
    let j = journal();
    let mut c = controller(&clock, &j);
    let mut readings = [8.0f32, 5.0, 2.5, 2.0, 1.0].into_iter();

    let pulses = c.slow_down(|| readings.next().unwrap_or(0.0)).unwrap();
    assert_eq!(pulses, 3);
    assert_eq!(energized(&j), vec!["down", "down", "down"]);
    // each pulse holds 1000 ms and then settles for the decrease lapse
    assert_eq!(clock.elapsed().as_millis(), 3 * 1_300);
}

#[test]
fn slow_down_ignores_cooldown() {
    let clock = TestClock::new();
    let j = journal();
    let mut c = controller(&clock, &j);
    assert!(c.evaluate(Speed::new(3.0, 9.0)));
    c.act().unwrap();
    let mut readings = [9.0f32, 1.0].into_iter();
    assert_eq!(c.slow_down(|| readings.next().unwrap_or(0.0)).unwrap(), 1);
}

#[test]
fn start_and_stop_drive_enable_relay() {
    let clock = TestClock::new();
    let j = journal();
    let mut c = controller(&clock, &j);
    c.start().unwrap();
    assert!(c.is_enabled());
    c.stop().unwrap();
    assert!(!c.is_enabled());
    assert_eq!(
        entries(&j),
        vec![("enable", true, 0), ("enable", false, 0)]
    );
}

#[test]
fn relay_fault_surfaces_as_typed_error() {
    let clock = TestClock::new();
    let j = journal();
    let mut c = SpeedActuatorController::new(
        SpyRelay::failing("up", &j, &clock),
        SpyRelay::new("down", &j, &clock),
        SpyRelay::new("enable", &j, &clock),
        SpeedControlCfg::default(),
        Arc::new(clock.clone()),
    );
    assert!(c.evaluate(Speed::new(9.0, 1.0)));
    let err = c.act().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ControlError>(),
        Some(ControlError::Io(_))
    ));
    // the failed relay is still commanded off
    assert_eq!(entries(&j), vec![("up", false, 0)]);
}
