mod common;

use std::sync::Arc;

use common::{SpyRelay, journal};
use proptest::prelude::*;
use treadmill_core::config::{SlopeControlCfg, SpeedControlCfg, TachometerCfg};
use treadmill_core::{SlopeActuatorController, Speed, SpeedActuatorController, Tachometer};
use treadmill_traits::clock::test_clock::TestClock;

fn slope(clock: &TestClock) -> SlopeActuatorController<SpyRelay> {
    let j = journal();
    SlopeActuatorController::new(
        SpyRelay::new("lift", &j, clock),
        SpyRelay::new("lower", &j, clock),
        SlopeControlCfg::default(),
        Arc::new(clock.clone()),
    )
}

proptest! {
    #[test]
    fn deadband_never_actuates(reference in 0.0f32..15.0, offset in -0.0998f32..0.0998) {
        let clock = TestClock::new();
        let j = journal();
        let mut c = SpeedActuatorController::new(
            SpyRelay::new("up", &j, &clock),
            SpyRelay::new("down", &j, &clock),
            SpyRelay::new("enable", &j, &clock),
            SpeedControlCfg::default(),
            Arc::new(clock.clone()),
        );
        prop_assert!(!c.evaluate(Speed::new(reference, reference + offset)));
    }

    #[test]
    fn cooldown_blocks_any_delta(delta in prop_oneof![-14.0f32..-0.2, 0.2f32..14.0], wait in 0u64..300) {
        let clock = TestClock::new();
        let j = journal();
        let mut c = SpeedActuatorController::new(
            SpyRelay::new("up", &j, &clock),
            SpyRelay::new("down", &j, &clock),
            SpyRelay::new("enable", &j, &clock),
            SpeedControlCfg::default(),
            Arc::new(clock.clone()),
        );
        prop_assert!(c.evaluate(Speed::new(7.0, 5.0)));
        c.act().unwrap();
        clock.advance_ms(wait);
        prop_assert!(!c.evaluate(Speed::new(7.0, 7.0 - delta)));
    }

    #[test]
    fn slope_steps_are_whole_levels(ratios in proptest::collection::vec(0.0f32..=1.0, 1..12)) {
        let clock = TestClock::new();
        let mut c = slope(&clock);
        let level = c.level_ms() as i64;
        for r in ratios {
            let target = (14_000.0f32 * r) as i64;
            let before = c.position_ms();
            let should = c.evaluate(r);
            prop_assert_eq!(should, (target - before).abs() >= level);
            c.act().unwrap();
            let moved = c.position_ms() - before;
            prop_assert!(moved == 0 || moved.abs() == level);
            if should {
                prop_assert!((target - c.position_ms()).abs() < (target - before).abs());
            }
            prop_assert!((c.position_ms() - target).abs() <= level.max((target - before).abs()));
        }
        c.get_down().unwrap();
        prop_assert_eq!(c.position_ms(), 0);
    }

    #[test]
    fn distance_is_monotonic(gaps in proptest::collection::vec(1u64..3_000, 1..40)) {
        let clock = TestClock::new();
        let t = Tachometer::new(TachometerCfg::default(), Arc::new(clock.clone()));
        let mut last = t.distance();
        for g in gaps {
            t.record_pulse();
            clock.advance_ms(g);
            let d = t.distance();
            prop_assert!(d >= last);
            prop_assert!(t.speed() >= 0.0);
            last = d;
        }
    }
}
