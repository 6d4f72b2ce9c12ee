//! Session sequencing: safety gates, the control loop and the stop sequence.
//!
//! ```text
//! AwaitingSafe --both knobs at rest--> Ready --button--> Armed --button on--> Running
//!      ^                                 ^                 |                    |
//!      |                                 +---button off----+              button off
//!      |                                                                        v
//!      +----------cool-down---------- Stopped <--slow down, get down, stop-- Stopping
//! ```
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use treadmill_traits::{Button, Clock};

use crate::config::SessionCfg;
use crate::error::Result;
use crate::panel::{DisplayContent, DisplayFrame, Indicator, PhaseEvent, Screen, TickSnapshot};
use crate::phase::{PhaseWatch, SessionPhase};
use crate::reference::ReferenceReader;
use crate::run_log::RunLog;
use crate::slope::SlopeActuatorController;
use crate::speed::{Speed, SpeedActuatorController};
use crate::tachometer::{SessionSummary, Tachometer};
use crate::util::ticks_elapsed;

/// The five motion components, each owning its sensor or relays.
#[derive(Debug)]
pub struct MotionControllers {
    pub speed_reference: ReferenceReader,
    pub slope_reference: ReferenceReader,
    pub tachometer: Tachometer,
    pub speed: SpeedActuatorController,
    pub slope: SlopeActuatorController,
}

impl MotionControllers {
    /// Drop every relay, logging failures.
    pub fn release_all(&mut self) {
        self.speed.release_all();
        self.slope.release_all();
    }
}

/// Operator-facing collaborators.
pub struct Panel {
    pub indicator: Box<dyn Indicator>,
    pub screen: Box<dyn Screen>,
    pub button: Box<dyn Button>,
}

impl Panel {
    pub fn new(
        indicator: impl Indicator + 'static,
        screen: impl Screen + 'static,
        button: impl Button + 'static,
    ) -> Self {
        Self {
            indicator: Box::new(indicator),
            screen: Box::new(screen),
            button: Box::new(button),
        }
    }

    fn announce(&mut self, event: PhaseEvent) {
        self.indicator.notify(&event);
        match event {
            PhaseEvent::Running(tick) => self
                .screen
                .show(DisplayContent::Frame(DisplayFrame::from_tick(&tick))),
            PhaseEvent::Stopped(summary) => self
                .screen
                .show(DisplayContent::Frame(DisplayFrame::from_summary(&summary))),
            other => {
                if let Some(msg) = other.message() {
                    self.screen.show(DisplayContent::Message(msg.to_owned()));
                }
            }
        }
    }
}

impl core::fmt::Debug for Panel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Panel")
            .field("button_on", &self.button.is_on())
            .finish()
    }
}

/// Orchestrates one machine through repeated sessions.
///
/// Borrows the controllers and panel; it sequences them and never reaches
/// into their internals. It is the only writer of the session phase.
pub struct SessionStateMachine<'a> {
    controllers: &'a mut MotionControllers,
    panel: &'a mut Panel,
    cfg: SessionCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    phase: SessionPhase,
    watch: PhaseWatch,
    run_log_path: Option<PathBuf>,
    run_log: Option<RunLog>,
    stopped_tick: u32,
    sessions_completed: u32,
    last_summary: Option<SessionSummary>,
}

impl core::fmt::Debug for SessionStateMachine<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStateMachine")
            .field("phase", &self.phase)
            .field("sessions_completed", &self.sessions_completed)
            .finish()
    }
}

impl<'a> SessionStateMachine<'a> {
    /// Start in AwaitingSafe. `run_log_path` enables the per-session CSV log.
    pub fn new(
        controllers: &'a mut MotionControllers,
        panel: &'a mut Panel,
        cfg: SessionCfg,
        clock: Arc<dyn Clock + Send + Sync>,
        run_log_path: Option<PathBuf>,
    ) -> Self {
        let epoch = clock.now();
        let mut sm = Self {
            controllers,
            panel,
            cfg,
            clock,
            epoch,
            phase: SessionPhase::AwaitingSafe,
            watch: PhaseWatch::new(SessionPhase::AwaitingSafe),
            run_log_path,
            run_log: None,
            stopped_tick: 0,
            sessions_completed: 0,
            last_summary: None,
        };
        sm.panel.announce(PhaseEvent::Start);
        sm
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn phase_watch(&self) -> PhaseWatch {
        self.watch.clone()
    }

    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    /// Summary of the most recently stopped session.
    pub fn last_summary(&self) -> Option<SessionSummary> {
        self.last_summary
    }

    #[inline]
    fn now(&self) -> u32 {
        self.clock.ticks_ms(self.epoch)
    }

    /// Advance the machine by one step and return the phase afterwards.
    ///
    /// Waiting phases sleep one poll period (or less, in Stopped) when their
    /// exit condition does not hold. Running performs one control tick.
    /// Stopping runs the whole stop sequence.
    pub fn poll(&mut self) -> Result<SessionPhase> {
        match self.phase {
            SessionPhase::AwaitingSafe => {
                let c = &mut *self.controllers;
                if c.speed_reference.is_at_rest() && c.slope_reference.is_at_rest() {
                    self.enter(SessionPhase::Ready)?;
                } else {
                    self.clock.sleep(self.cfg.poll());
                }
            }
            SessionPhase::Ready => {
                if self.panel.button.is_on() {
                    self.enter(SessionPhase::Armed)?;
                } else {
                    self.clock.sleep(self.cfg.poll());
                }
            }
            SessionPhase::Armed => {
                if self.panel.button.is_on() {
                    self.enter(SessionPhase::Running)?;
                } else {
                    tracing::info!("start cancelled");
                    self.enter(SessionPhase::Ready)?;
                }
            }
            SessionPhase::Running => {
                if self.panel.button.is_on() {
                    self.tick()?;
                } else {
                    self.enter(SessionPhase::Stopping)?;
                }
            }
            SessionPhase::Stopping => {
                self.stop_sequence()?;
                self.enter(SessionPhase::Stopped)?;
            }
            SessionPhase::Stopped => {
                let waited = u64::from(ticks_elapsed(self.now(), self.stopped_tick));
                let remaining = self.cfg.cooldown_ms.saturating_sub(waited);
                if remaining == 0 {
                    self.enter(SessionPhase::AwaitingSafe)?;
                } else {
                    self.clock
                        .sleep(Duration::from_millis(remaining.min(self.cfg.poll_ms)));
                }
            }
        }
        Ok(self.phase)
    }

    /// Loop sessions until `shutdown` is raised or `limit` sessions have
    /// stopped. Shutdown during Running still executes the full stop
    /// sequence. Returns the number of sessions completed; the machine is
    /// back in AwaitingSafe with every relay released on return.
    pub fn run(&mut self, shutdown: &AtomicBool, limit: Option<u32>) -> Result<u32> {
        let outcome = self.run_inner(shutdown, limit);
        self.controllers.release_all();
        self.set_phase(SessionPhase::AwaitingSafe);
        outcome.map(|()| self.sessions_completed)
    }

    fn run_inner(&mut self, shutdown: &AtomicBool, limit: Option<u32>) -> Result<()> {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                match self.phase {
                    SessionPhase::Running => {
                        tracing::info!("shutdown requested; stopping session");
                        self.enter(SessionPhase::Stopping)?;
                    }
                    SessionPhase::Stopping => {}
                    _ => return Ok(()),
                }
            }
            let phase = self.poll()?;
            if phase == SessionPhase::Stopped
                && limit.is_some_and(|n| self.sessions_completed >= n)
            {
                return Ok(());
            }
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if phase != self.phase {
            tracing::info!(from = %self.phase, to = %phase, "session phase");
        }
        self.phase = phase;
        self.watch.set(phase);
    }

    fn enter(&mut self, phase: SessionPhase) -> Result<()> {
        match phase {
            SessionPhase::AwaitingSafe => self.panel.announce(PhaseEvent::Start),
            SessionPhase::Ready => {
                self.panel.button.reset();
                self.panel.announce(PhaseEvent::Ready);
            }
            SessionPhase::Armed => self.panel.announce(PhaseEvent::Armed),
            SessionPhase::Running => {
                self.controllers.tachometer.reset();
                let started = self.controllers.speed.start();
                self.guard(started)?;
                self.open_run_log();
            }
            SessionPhase::Stopping => {
                self.controllers.tachometer.finish();
                self.panel.announce(PhaseEvent::Stopping);
            }
            SessionPhase::Stopped => {
                let summary = self.controllers.tachometer.summary();
                self.last_summary = Some(summary);
                self.sessions_completed += 1;
                self.stopped_tick = self.now();
                tracing::info!(
                    distance_m = summary.distance_m,
                    avg_speed_kmh = summary.avg_speed_kmh,
                    duration_s = summary.duration.as_secs(),
                    "session complete"
                );
                self.panel.announce(PhaseEvent::Stopped(summary));
            }
        }
        self.set_phase(phase);
        Ok(())
    }

    /// One control iteration for both axes, then publish a snapshot.
    fn tick(&mut self) -> Result<()> {
        let c = &mut *self.controllers;
        let actual = c.tachometer.speed();
        let reference = match c.speed_reference.sample() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "speed reference unavailable; holding speed");
                None
            }
        };
        if let Some(reference) = reference {
            if c.speed.evaluate(Speed::new(reference, actual)) {
                let acted = c.speed.act().map(|_| ());
                self.guard(acted)?;
            }
        }

        let c = &mut *self.controllers;
        match c.slope_reference.sample() {
            Ok(ratio) => {
                if c.slope.evaluate(ratio) {
                    let acted = c.slope.act().map(|_| ());
                    self.guard(acted)?;
                }
            }
            Err(e) => tracing::warn!(error = %e, "slope reference unavailable; holding slope"),
        }

        let c = &*self.controllers;
        let speed = Speed::new(
            reference.or(c.speed_reference.last()).unwrap_or(0.0),
            c.tachometer.speed(),
        );
        let snapshot = TickSnapshot {
            speed,
            slope_ratio: c.slope.position_ratio(),
            distance_m: c.tachometer.distance(),
            duration: c.tachometer.duration(),
        };
        self.panel.announce(PhaseEvent::Running(snapshot));
        self.log_tick(snapshot.duration, speed);
        Ok(())
    }

    /// Slow down to rest, close the run log, level the deck, cut the motor.
    fn stop_sequence(&mut self) -> Result<()> {
        let c = &mut *self.controllers;
        let slowed = c.speed.slow_down(|| c.tachometer.speed());
        let pulses = self.guard(slowed)?;
        tracing::debug!(pulses, "slow-down complete");
        self.close_run_log();

        let lowered = self.controllers.slope.get_down();
        self.guard(lowered)?;
        let stopped = self.controllers.speed.stop();
        self.guard(stopped)
    }

    /// On a relay fault: drop every relay, then hand the error back.
    fn guard<T>(&mut self, r: Result<T>) -> Result<T> {
        if r.is_err() {
            tracing::error!("relay fault; releasing all relays");
            self.controllers.release_all();
        }
        r
    }

    fn open_run_log(&mut self) {
        let Some(path) = self.run_log_path.as_ref() else {
            return;
        };
        match RunLog::open(path) {
            Ok(log) => self.run_log = Some(log),
            Err(e) => tracing::warn!(error = %e, "run log disabled for this session"),
        }
    }

    fn log_tick(&mut self, duration: Duration, speed: Speed) {
        if let Some(log) = self.run_log.as_mut() {
            if let Err(e) = log.record(duration, speed) {
                tracing::warn!(error = %e, "run log write failed; closing it");
                self.run_log = None;
            }
        }
    }

    fn close_run_log(&mut self) {
        if let Some(log) = self.run_log.take() {
            if let Err(e) = log.close() {
                tracing::warn!(error = %e, "run log close failed");
            }
        }
    }
}
