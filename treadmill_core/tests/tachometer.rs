use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use treadmill_core::config::TachometerCfg;
use treadmill_core::tachometer::{SampleRing, Tachometer};
use treadmill_traits::clock::test_clock::TestClock;

fn tach(clock: &TestClock) -> Tachometer {
    Tachometer::new(TachometerCfg::default(), Arc::new(clock.clone()))
}

fn pulses_every(t: &Tachometer, clock: &TestClock, n: u32, every_ms: u64) {
    for _ in 0..n {
        t.record_pulse();
        clock.advance_ms(every_ms);
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[rstest]
#[case(0)]
#[case(1)]
fn speed_is_zero_below_two_pulses(#[case] n: u32) {
    let clock = TestClock::new();
    let t = tach(&clock);
    pulses_every(&t, &clock, n, 100);
    assert_eq!(t.speed(), 0.0);
}

#[test]
fn steady_pulses_give_step_over_period() {
    let clock = TestClock::new();
    let t = tach(&clock);
    // 0.22 m every 100 ms = 2.2 m/s = 7.92 km/h
    pulses_every(&t, &clock, 8, 100);
    assert!(close(t.speed(), 7.92), "speed {}", t.speed());
}

#[test]
fn partial_history_renormalizes_weights() {
    let clock = TestClock::new();
    let t = tach(&clock);
    t.record_pulse();
    clock.advance_ms(100);
    t.record_pulse();
    clock.advance_ms(200);
    t.record_pulse();
    // newest interval 200 (w 1/2), then 100 (w 1/4): (100 + 25) / 0.75
    let period = 125.0 / 0.75;
    let expected = 0.22 / (period / 1000.0) * 3.6;
    assert!(close(t.speed(), expected), "speed {}", t.speed());
}

#[test]
fn newest_interval_dominates() {
    let mut ring = SampleRing::new();
    for tick in [0, 100, 200, 300, 400, 450] {
        ring.push(tick);
    }
    // 0.5*50 + 0.25*100 + 0.125*100 + 0.0625*100 + 0.0625*100
    assert!(close(ring.weighted_period_ms(), 75.0));
    assert_eq!(ring.newest(), Some(450));
    assert_eq!(ring.len(), 6);
}

#[test]
fn silent_sensor_reads_zero_after_stale_window() {
    let clock = TestClock::new();
    let t = tach(&clock);
    pulses_every(&t, &clock, 4, 100);
    // newest pulse is 100 ms old here
    clock.advance_ms(1_900);
    assert!(t.speed() > 0.0);
    clock.advance_ms(1);
    assert_eq!(t.speed(), 0.0);
}

#[test]
fn distance_grows_and_resets() {
    let clock = TestClock::new();
    let t = tach(&clock);
    assert_eq!(t.distance(), 0.0);
    t.record_pulse();
    assert_eq!(t.distance(), 0.0);

    let mut last = 0.0;
    for _ in 0..20 {
        t.record_pulse();
        clock.advance_ms(50);
        let d = t.distance();
        assert!(d >= last);
        last = d;
    }
    assert!(close(last, 20.0 * 0.22));

    t.reset();
    assert_eq!(t.distance(), 0.0);
    assert_eq!(t.pulse_count(), 0);
    assert_eq!(t.speed(), 0.0);
    assert_eq!(t.duration(), Duration::ZERO);
}

#[test]
fn summary_over_frozen_session() {
    let clock = TestClock::new();
    let t = tach(&clock);
    pulses_every(&t, &clock, 101, 500);
    clock.set_offset(Duration::from_secs(60));
    t.finish();

    let s = t.summary();
    assert!(close(s.distance_m, 22.0), "distance {}", s.distance_m);
    assert_eq!(s.duration, Duration::from_secs(60));
    assert!(close(s.avg_speed_kmh, 1.32), "avg {}", s.avg_speed_kmh);

    // late pulses and time do not move the frozen summary
    pulses_every(&t, &clock, 10, 100);
    let again = t.summary();
    assert_eq!(again, s);
    assert!(t.is_finished());
}

#[test]
fn finish_is_idempotent() {
    let clock = TestClock::new();
    let t = tach(&clock);
    pulses_every(&t, &clock, 3, 1_000);
    t.finish();
    let d = t.duration();
    clock.advance_ms(5_000);
    t.finish();
    assert_eq!(t.duration(), d);
}

#[test]
fn tick_wraparound_keeps_period_and_duration() {
    let clock = TestClock::new();
    let t = tach(&clock);
    clock.set_offset(Duration::from_millis(u64::from(u32::MAX) - 250));
    t.reset();
    // six pulses 100 ms apart straddle the u32 rollover
    pulses_every(&t, &clock, 6, 100);
    let st = t.state();
    assert!(st.ring.as_slice().windows(2).any(|w| w[0] < w[1]));
    assert!(close(t.speed(), 7.92), "speed {}", t.speed());
    assert_eq!(t.duration(), Duration::from_millis(600));
}

#[test]
fn pulse_input_feeds_from_another_thread() {
    let clock = TestClock::new();
    let t = tach(&clock);
    let input = t.pulse_input();
    let handle = std::thread::spawn(move || {
        for _ in 0..50 {
            input.record_pulse();
        }
    });
    handle.join().unwrap();
    assert_eq!(t.pulse_count(), 50);
}
