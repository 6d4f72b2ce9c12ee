//! Simulated machine: relays drive a plant thread that emits tachometer
//! pulses, and an operator thread turns the knobs and presses the button.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use eyre::Result;
use treadmill_core::{ControllerCfg, MotionControllers, PhaseWatch, SessionPhase};
use treadmill_hardware::{
    ButtonEdge, Knob, LatchedButton, PlantCfg, PlantLines, SimulatedAnalog, SimulatedRelay,
    SimulatedTreadmill,
};
use treadmill_traits::{Clock, MonotonicClock};

use crate::run::{Machine, RidePlan};

const OPERATOR_POLL: Duration = Duration::from_millis(10);

pub struct SimBackend {
    plant: SimulatedTreadmill,
    speed_knob: Knob,
    slope_knob: Knob,
    edge: ButtonEdge,
    clock: Arc<dyn Clock + Send + Sync>,
}

pub fn assemble(
    cfg: &treadmill_config::Config,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<Machine<SimBackend>> {
    let speed_up = SimulatedRelay::new("speed_up");
    let speed_down = SimulatedRelay::new("speed_down");
    let motor_enable = SimulatedRelay::new("motor_enable");
    let slope_up = SimulatedRelay::new("slope_up");
    let slope_down = SimulatedRelay::new("slope_down");
    let lines = PlantLines {
        speed_up: speed_up.line(),
        speed_down: speed_down.line(),
        motor_enable: motor_enable.line(),
        slope_up: slope_up.line(),
        slope_down: slope_down.line(),
    };

    let speed_adc = SimulatedAnalog::new(0).with_clock(clock.clone());
    let slope_adc = SimulatedAnalog::new(0).with_clock(clock.clone());
    let speed_knob = speed_adc.knob();
    let slope_knob = slope_adc.knob();

    let controllers = MotionControllers::builder()
        .with_speed_reference(speed_adc)
        .with_slope_reference(slope_adc)
        .with_speed_relays(speed_up, speed_down, motor_enable)
        .with_slope_relays(slope_up, slope_down)
        .with_clock(clock.clone())
        .with_config(ControllerCfg::from(cfg))
        .build()?;

    let pulses = controllers.tachometer.pulse_input();
    let plant_cfg = PlantCfg {
        accel_kmh_per_s: cfg.sim.accel_kmh_per_s,
        decel_kmh_per_s: cfg.sim.decel_kmh_per_s,
        coast_kmh_per_s: cfg.sim.coast_kmh_per_s,
        slope_ratio_per_s: cfg.sim.slope_ratio_per_s,
        distance_step_m: cfg.tachometer.distance_step_m,
        ..PlantCfg::default()
    };
    let plant = SimulatedTreadmill::spawn(plant_cfg, lines, MonotonicClock::new(), move || {
        pulses.record_pulse();
    });

    let button = LatchedButton::new(clock.clone(), cfg.session.debounce_ms);
    let edge = button.edge();
    tracing::info!("simulated treadmill assembled");

    Ok(Machine {
        controllers,
        button,
        backend: SimBackend {
            plant,
            speed_knob,
            slope_knob,
            edge,
            clock,
        },
    })
}

impl SimBackend {
    /// Start the simulated operator. It rides one session per Ready phase
    /// until `stop` is raised.
    pub fn start_operator(
        &self,
        watch: PhaseWatch,
        plan: RidePlan,
        stop: Arc<AtomicBool>,
    ) -> Option<JoinHandle<()>> {
        let op = Operator {
            watch,
            edge: self.edge.clone(),
            speed_knob: self.speed_knob.clone(),
            slope_knob: self.slope_knob.clone(),
            clock: self.clock.clone(),
            plan,
            stop,
        };
        Some(std::thread::spawn(move || op.ride()))
    }

    pub fn describe(&self) -> String {
        let p = self.plant.snapshot();
        format!(
            "sim plant: {:.1} km/h, slope {:.2}, {} pulses",
            p.speed_kmh, p.slope_ratio, p.pulses
        )
    }
}

struct Operator {
    watch: PhaseWatch,
    edge: ButtonEdge,
    speed_knob: Knob,
    slope_knob: Knob,
    clock: Arc<dyn Clock + Send + Sync>,
    plan: RidePlan,
    stop: Arc<AtomicBool>,
}

impl Operator {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Wait until `pred` holds for the current phase; false if stopped first.
    fn wait_until(&self, pred: impl Fn(SessionPhase) -> bool) -> bool {
        while !self.stopped() {
            if pred(self.watch.get()) {
                return true;
            }
            self.clock.sleep(OPERATOR_POLL);
        }
        false
    }

    /// Sleep in short slices so a stop request is noticed promptly.
    fn pause(&self, d: Duration) -> bool {
        let start = self.clock.now();
        while !self.stopped() {
            let waited = self.clock.now().saturating_duration_since(start);
            if waited >= d {
                return true;
            }
            self.clock.sleep((d - waited).min(OPERATOR_POLL));
        }
        false
    }

    fn press(&self) {
        if !self.edge.falling_edge() {
            tracing::warn!("simulated press swallowed by debounce");
        }
    }

    fn ride(self) {
        let gap = Duration::from_millis(self.plan.debounce_ms + 20);
        loop {
            if !self.wait_until(|p| p == SessionPhase::Ready) || !self.pause(gap) {
                return;
            }
            tracing::info!("operator: start");
            self.press();
            if !self.wait_until(|p| p == SessionPhase::Running) {
                return;
            }
            self.speed_knob
                .set_fraction(self.plan.target_speed_kmh, self.plan.speed_full_scale);
            self.slope_knob.set_fraction(self.plan.target_slope, 1.0);
            let ride = Duration::from_millis(self.plan.ride_ms).max(gap);
            if !self.pause(ride) {
                return;
            }
            tracing::info!("operator: stop");
            self.press();
            self.speed_knob.set_level(0);
            self.slope_knob.set_level(0);
            if !self.wait_until(|p| p != SessionPhase::Running) {
                return;
            }
        }
    }
}
