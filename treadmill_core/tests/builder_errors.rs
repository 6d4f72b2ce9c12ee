mod common;

use std::sync::Arc;

use rstest::rstest;

use common::{FakeKnob, SpyRelay, journal};
use treadmill_core::config::ControllerCfg;
use treadmill_core::{BuildError, MotionControllers};
use treadmill_traits::clock::test_clock::TestClock;

fn build_err(b: treadmill_core::MotionControllersBuilder) -> BuildError {
    match b.build() {
        Ok(_) => panic!("build should fail"),
        Err(e) => e
            .downcast_ref::<BuildError>()
            .cloned()
            .expect("BuildError"),
    }
}

#[test]
fn every_part_is_required() {
    let clock = TestClock::new();
    let j = journal();

    let err = build_err(MotionControllers::builder());
    assert!(matches!(err, BuildError::MissingReference("speed")));

    let err = build_err(
        MotionControllers::builder()
            .with_speed_reference(FakeKnob::at(0))
            .with_slope_reference(FakeKnob::at(0)),
    );
    assert!(matches!(err, BuildError::MissingRelay("speed")));

    let err = build_err(
        MotionControllers::builder()
            .with_speed_reference(FakeKnob::at(0))
            .with_slope_reference(FakeKnob::at(0))
            .with_speed_relays(
                SpyRelay::new("up", &j, &clock),
                SpyRelay::new("down", &j, &clock),
                SpyRelay::new("enable", &j, &clock),
            ),
    );
    assert!(matches!(err, BuildError::MissingRelay("slope")));
}

fn complete_builder(clock: &TestClock, cfg: ControllerCfg) -> treadmill_core::MotionControllersBuilder {
    let j = journal();
    MotionControllers::builder()
        .with_speed_reference(FakeKnob::at(0))
        .with_slope_reference(FakeKnob::at(0))
        .with_speed_relays(
            SpyRelay::new("up", &j, clock),
            SpyRelay::new("down", &j, clock),
            SpyRelay::new("enable", &j, clock),
        )
        .with_slope_relays(
            SpyRelay::new("lift", &j, clock),
            SpyRelay::new("lower", &j, clock),
        )
        .with_clock(Arc::new(clock.clone()))
        .with_config(cfg)
}

#[rstest]
#[case::zero_levels(|c: &mut ControllerCfg| c.slope_control.levels = 0, "levels")]
#[case::level_shorter_than_1ms(|c: &mut ControllerCfg| { c.slope_control.travel_ms = 4; c.slope_control.levels = 5; }, "travel_ms")]
#[case::zero_stale_timeout(|c: &mut ControllerCfg| c.tachometer.stale_ms = 0, "stale_ms")]
#[case::zero_sample_rate(|c: &mut ControllerCfg| c.slope_reference.sample_hz = 0, "sample_hz")]
#[case::zero_distance_step(|c: &mut ControllerCfg| c.tachometer.distance_step_m = 0.0, "distance step")]
fn invalid_config_rejected(#[case] tweak: fn(&mut ControllerCfg), #[case] needle: &str) {
    let clock = TestClock::new();
    let mut cfg = ControllerCfg::default();
    tweak(&mut cfg);
    match build_err(complete_builder(&clock, cfg)) {
        BuildError::InvalidConfig(msg) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn default_config_builds() {
    let clock = TestClock::new();
    assert!(complete_builder(&clock, ControllerCfg::default()).build().is_ok());
}
