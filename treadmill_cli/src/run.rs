//! `run` and `self-check`: assemble the machine and drive sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use eyre::{Result, WrapErr};
use treadmill_core::panel::{DisplayReceiver, RecvTimeoutError, TracingIndicator};
use treadmill_core::{
    DisplayContent, DisplayFeed, DisplayFrame, Indicator, MotionControllers, Panel, PhaseEvent,
    SessionStateMachine, SessionSummary,
};
use treadmill_hardware::LatchedButton;
use treadmill_traits::{Clock, MonotonicClock};

#[cfg(feature = "hardware")]
use crate::hw as backend;
#[cfg(not(feature = "hardware"))]
use crate::sim as backend;

/// Everything one backend assembles.
pub struct Machine<B> {
    pub controllers: MotionControllers,
    pub button: LatchedButton,
    pub backend: B,
}

/// What the simulated operator does each session.
#[derive(Debug, Clone)]
pub struct RidePlan {
    pub target_speed_kmh: f32,
    pub speed_full_scale: f32,
    pub target_slope: f32,
    pub ride_ms: u64,
    pub debounce_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RunOpts {
    pub sessions: Option<u32>,
    pub target_speed_kmh: f32,
    pub target_slope: f32,
    pub ride_ms: u64,
    pub json: bool,
}

/// Tracing indicator that also prints one summary line per stopped session.
struct ReportingIndicator {
    json: bool,
    session: u32,
}

impl Indicator for ReportingIndicator {
    fn notify(&mut self, event: &PhaseEvent) {
        TracingIndicator.notify(event);
        if let PhaseEvent::Stopped(summary) = event {
            self.session += 1;
            println!("{}", summary_line(self.session, summary, self.json));
        }
    }
}

fn summary_line(session: u32, s: &SessionSummary, json: bool) -> String {
    if json {
        return serde_json::json!({
            "session": session,
            "distance_m": s.distance_m,
            "avg_speed_kmh": s.avg_speed_kmh,
            "duration_s": s.duration.as_secs_f32(),
        })
        .to_string();
    }
    let frame = DisplayFrame::from_summary(s);
    format!(
        "session {session} complete: {} in {}, avg {:.1} Km/h",
        frame.distance_text().trim(),
        frame.duration_text(),
        s.avg_speed_kmh
    )
}

/// Consume display content at its own cadence until the feed is dropped.
fn spawn_renderer(rx: DisplayReceiver) -> JoinHandle<()> {
    std::thread::spawn(move || {
        loop {
            match rx.recv_timeout(Duration::from_millis(250)) {
                Ok(DisplayContent::Message(msg)) => {
                    tracing::debug!(target: "display", %msg, "screen");
                }
                Ok(DisplayContent::Frame(frame)) => {
                    tracing::debug!(target: "display", %frame, "screen");
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}

pub fn run(cfg: &treadmill_config::Config, opts: &RunOpts, shutdown: Arc<AtomicBool>) -> Result<()> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let Machine {
        mut controllers,
        button,
        backend,
    } = backend::assemble(cfg, clock.clone()).wrap_err("assemble machine")?;

    let (feed, rx) = DisplayFeed::new();
    let renderer = spawn_renderer(rx);
    let mut panel = Panel::new(
        ReportingIndicator {
            json: opts.json,
            session: 0,
        },
        feed,
        button,
    );

    let operator_stop = Arc::new(AtomicBool::new(false));
    let outcome = {
        let mut sm = SessionStateMachine::new(
            &mut controllers,
            &mut panel,
            (&cfg.session).into(),
            clock,
            cfg.run_log.path.clone(),
        );
        let plan = RidePlan {
            target_speed_kmh: opts.target_speed_kmh,
            speed_full_scale: cfg.speed_reference.full_scale,
            target_slope: opts.target_slope,
            ride_ms: opts.ride_ms,
            debounce_ms: cfg.session.debounce_ms,
        };
        let operator = backend.start_operator(sm.phase_watch(), plan, operator_stop.clone());
        let outcome = sm.run(&shutdown, opts.sessions);
        operator_stop.store(true, Ordering::Relaxed);
        if let Some(handle) = operator
            && handle.join().is_err()
        {
            tracing::warn!("operator thread panicked");
        }
        outcome
    };
    drop(panel);
    if renderer.join().is_err() {
        tracing::warn!("display renderer panicked");
    }
    tracing::debug!(backend = %backend.describe(), "backend at exit");

    let completed = outcome?;
    tracing::info!(completed, "controller stopped");
    Ok(())
}

pub fn self_check(cfg: &treadmill_config::Config, json: bool) -> Result<()> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let Machine {
        mut controllers,
        backend,
        ..
    } = backend::assemble(cfg, clock).wrap_err("assemble machine")?;

    let speed = controllers
        .speed_reference
        .sample()
        .wrap_err("sample speed knob")?;
    let slope = controllers
        .slope_reference
        .sample()
        .wrap_err("sample slope knob")?;
    let speed_rest = speed <= controllers.speed_reference.cfg().rest_threshold;
    let slope_rest = slope <= controllers.slope_reference.cfg().rest_threshold;
    controllers.release_all();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "backend": backend.describe(),
                "speed_reference_kmh": speed,
                "slope_reference_ratio": slope,
                "at_rest": speed_rest && slope_rest,
            })
        );
    } else {
        println!("{}", backend.describe());
        println!("speed knob: {speed:.2} km/h (at rest: {speed_rest})");
        println!("slope knob: {slope:.2} (at rest: {slope_rest})");
        println!("OK");
    }
    Ok(())
}
