//! Simulated treadmill mechanics.
//!
//! A background thread integrates belt speed and deck slope from the relay
//! lines and fires the tachometer callback each time the belt has travelled
//! one distance step, standing in for the pulse interrupt.
//!
//! Each `SimulatedTreadmill` owns exactly one thread, stopped and joined on
//! drop.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use treadmill_traits::Clock;

/// Plant dynamics.
#[derive(Debug, Clone)]
pub struct PlantCfg {
    /// Belt acceleration while the speed-up relay is held (km/h per second).
    pub accel_kmh_per_s: f32,
    /// Belt deceleration while the speed-down relay is held (km/h per second).
    pub decel_kmh_per_s: f32,
    /// Coast-down rate while the motor is not enabled (km/h per second).
    pub coast_kmh_per_s: f32,
    /// Deck travel rate while a slope relay is held (ratio per second).
    pub slope_ratio_per_s: f32,
    /// Highest belt speed the motor reaches (km/h).
    pub max_kmh: f32,
    /// Belt travel per tachometer pulse (m).
    pub distance_step_m: f32,
    /// Integration step.
    pub tick: Duration,
}

impl Default for PlantCfg {
    fn default() -> Self {
        Self {
            accel_kmh_per_s: 1.0,
            decel_kmh_per_s: 2.0,
            coast_kmh_per_s: 4.0,
            slope_ratio_per_s: 1.0 / 14.0,
            max_kmh: 20.0,
            distance_step_m: 0.22,
            tick: Duration::from_millis(5),
        }
    }
}

/// Relay lines the plant reacts to.
#[derive(Debug, Clone)]
pub struct PlantLines {
    pub speed_up: Arc<AtomicBool>,
    pub speed_down: Arc<AtomicBool>,
    pub motor_enable: Arc<AtomicBool>,
    pub slope_up: Arc<AtomicBool>,
    pub slope_down: Arc<AtomicBool>,
}

/// Physical state of the simulated machine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlantSnapshot {
    pub speed_kmh: f32,
    pub slope_ratio: f32,
    pub pulses: u64,
}

#[derive(Debug, Default)]
struct PlantState {
    snapshot: PlantSnapshot,
    since_pulse_m: f32,
}

impl PlantState {
    /// Advance the model by `dt_s`; returns how many pulses the belt produced.
    fn integrate(&mut self, cfg: &PlantCfg, lines: &PlantLines, dt_s: f32) -> u32 {
        let on = |l: &Arc<AtomicBool>| l.load(Ordering::Relaxed);
        let s = &mut self.snapshot;
        if on(&lines.motor_enable) {
            if on(&lines.speed_up) {
                s.speed_kmh += cfg.accel_kmh_per_s * dt_s;
            }
            if on(&lines.speed_down) {
                s.speed_kmh -= cfg.decel_kmh_per_s * dt_s;
            }
        } else {
            s.speed_kmh -= cfg.coast_kmh_per_s * dt_s;
        }
        s.speed_kmh = s.speed_kmh.clamp(0.0, cfg.max_kmh);

        if on(&lines.slope_up) {
            s.slope_ratio += cfg.slope_ratio_per_s * dt_s;
        }
        if on(&lines.slope_down) {
            s.slope_ratio -= cfg.slope_ratio_per_s * dt_s;
        }
        // End-stops.
        s.slope_ratio = s.slope_ratio.clamp(0.0, 1.0);

        if cfg.distance_step_m <= 0.0 {
            return 0;
        }
        self.since_pulse_m += s.speed_kmh / 3.6 * dt_s;
        let mut fired = 0;
        while self.since_pulse_m >= cfg.distance_step_m {
            self.since_pulse_m -= cfg.distance_step_m;
            s.pulses += 1;
            fired += 1;
        }
        fired
    }
}

pub struct SimulatedTreadmill {
    state: Arc<Mutex<PlantState>>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl SimulatedTreadmill {
    /// Start the plant thread. `on_pulse` runs on that thread once per
    /// tachometer pulse, like an edge interrupt handler.
    pub fn spawn<C, F>(cfg: PlantCfg, lines: PlantLines, clock: C, mut on_pulse: F) -> Self
    where
        C: Clock + Send + 'static,
        F: FnMut() + Send + 'static,
    {
        let state = Arc::new(Mutex::new(PlantState::default()));
        let state_bg = state.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_bg = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            let mut last = clock.now();
            while !shutdown_bg.load(Ordering::Relaxed) {
                clock.sleep(cfg.tick);
                let now = clock.now();
                let dt_s = now.saturating_duration_since(last).as_secs_f32();
                last = now;
                let fired = match state_bg.lock() {
                    Ok(mut st) => st.integrate(&cfg, &lines, dt_s),
                    Err(_) => break,
                };
                for _ in 0..fired {
                    on_pulse();
                }
            }
            tracing::trace!("plant thread exiting cleanly");
        });

        Self {
            state,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn snapshot(&self) -> PlantSnapshot {
        self.state
            .lock()
            .map(|st| st.snapshot)
            .unwrap_or_default()
    }
}

impl Drop for SimulatedTreadmill {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "plant thread panicked during shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> PlantLines {
        PlantLines {
            speed_up: Arc::new(AtomicBool::new(false)),
            speed_down: Arc::new(AtomicBool::new(false)),
            motor_enable: Arc::new(AtomicBool::new(false)),
            slope_up: Arc::new(AtomicBool::new(false)),
            slope_down: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn speed_up_needs_motor_enable() {
        let cfg = PlantCfg::default();
        let l = lines();
        let mut st = PlantState::default();
        l.speed_up.store(true, Ordering::Relaxed);
        st.integrate(&cfg, &l, 1.0);
        assert_eq!(st.snapshot.speed_kmh, 0.0);

        l.motor_enable.store(true, Ordering::Relaxed);
        st.integrate(&cfg, &l, 2.0);
        assert!((st.snapshot.speed_kmh - 2.0).abs() < 1e-6);
    }

    #[test]
    fn belt_travel_emits_one_pulse_per_step() {
        let cfg = PlantCfg::default();
        let l = lines();
        let mut st = PlantState::default();
        st.snapshot.speed_kmh = 3.6 * 0.22; // one step per second
        l.motor_enable.store(true, Ordering::Relaxed);
        let fired: u32 = (0..10).map(|_| st.integrate(&cfg, &l, 1.0)).sum();
        // Accumulated float error may hold back the last pulse.
        assert!((9..=10).contains(&fired), "fired {fired}");
    }

    #[test]
    fn slope_stops_at_end_stops() {
        let cfg = PlantCfg::default();
        let l = lines();
        let mut st = PlantState::default();
        l.slope_down.store(true, Ordering::Relaxed);
        st.integrate(&cfg, &l, 5.0);
        assert_eq!(st.snapshot.slope_ratio, 0.0);
        l.slope_down.store(false, Ordering::Relaxed);
        l.slope_up.store(true, Ordering::Relaxed);
        st.integrate(&cfg, &l, 100.0);
        assert_eq!(st.snapshot.slope_ratio, 1.0);
    }
}
