use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use treadmill_hardware::{PlantCfg, PlantLines, SimulatedRelay, SimulatedTreadmill};
use treadmill_traits::{MonotonicClock, Relay};

#[test]
fn plant_thread_generates_pulses_while_driven() {
    let up = SimulatedRelay::new("speed_up");
    let down = SimulatedRelay::new("speed_down");
    let mut enable = SimulatedRelay::new("motor_enable");
    let slope_up = SimulatedRelay::new("slope_up");
    let slope_down = SimulatedRelay::new("slope_down");
    let lines = PlantLines {
        speed_up: up.line(),
        speed_down: down.line(),
        motor_enable: enable.line(),
        slope_up: slope_up.line(),
        slope_down: slope_down.line(),
    };
    let cfg = PlantCfg {
        accel_kmh_per_s: 200.0,
        tick: Duration::from_millis(1),
        ..PlantCfg::default()
    };

    let pulses = Arc::new(AtomicU32::new(0));
    let pulses_isr = pulses.clone();
    let plant = SimulatedTreadmill::spawn(cfg, lines, MonotonicClock::new(), move || {
        pulses_isr.fetch_add(1, Ordering::Relaxed);
    });

    enable.set(true).unwrap();
    let mut up = up;
    up.set(true).unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while pulses.load(Ordering::Relaxed) < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(pulses.load(Ordering::Relaxed) >= 3, "belt never produced pulses");
    assert!(plant.snapshot().speed_kmh > 0.0);
    drop(plant);
}
