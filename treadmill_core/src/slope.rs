//! Time-proportional slope control.
//!
//! The lift has no position sensor. Position is the net time the lift has
//! been driven up, and corrections are whole levels of `travel_ms / levels`.
use std::sync::Arc;
use std::time::Duration;

use treadmill_traits::{Clock, Relay};

use crate::actuator::{RelayDirection, pulse, release};
use crate::config::SlopeControlCfg;
use crate::error::Result;

/// Accumulated commanded time, `increased - decreased` (ms).
///
/// Nothing clamps it to `[0, travel_ms]`; the physical end-stops do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorPosition {
    pub increased_ms: u64,
    pub decreased_ms: u64,
}

impl ActuatorPosition {
    #[inline]
    pub fn position_ms(&self) -> i64 {
        self.increased_ms as i64 - self.decreased_ms as i64
    }
}

pub struct SlopeActuatorController<R = Box<dyn Relay>> {
    increase: R,
    decrease: R,
    cfg: SlopeControlCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    position: ActuatorPosition,
    target_ms: i64,
}

impl<R: Relay> core::fmt::Debug for SlopeActuatorController<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlopeActuatorController")
            .field("position_ms", &self.position.position_ms())
            .field("target_ms", &self.target_ms)
            .finish()
    }
}

impl<R: Relay> SlopeActuatorController<R> {
    pub fn new(
        increase: R,
        decrease: R,
        cfg: SlopeControlCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            increase,
            decrease,
            cfg,
            clock,
            position: ActuatorPosition::default(),
            target_ms: 0,
        }
    }

    pub fn level_ms(&self) -> u64 {
        self.cfg.level_ms()
    }

    pub fn position(&self) -> ActuatorPosition {
        self.position
    }

    pub fn position_ms(&self) -> i64 {
        self.position.position_ms()
    }

    /// Position as a ratio of full travel (for display).
    pub fn position_ratio(&self) -> f32 {
        if self.cfg.travel_ms == 0 {
            return 0.0;
        }
        self.position_ms() as f32 / self.cfg.travel_ms as f32
    }

    #[inline]
    fn error_ms(&self) -> i64 {
        self.target_ms - self.position_ms()
    }

    /// Set the target from a 0..1 reference ratio; true iff the position is
    /// at least one whole level away from it.
    pub fn evaluate(&mut self, target_ratio: f32) -> bool {
        let ratio = if target_ratio.is_finite() {
            target_ratio
        } else {
            0.0
        };
        // Truncated to whole milliseconds.
        self.target_ms = (self.cfg.travel_ms as f32 * ratio) as i64;
        self.error_ms().unsigned_abs() >= self.level_ms()
    }

    /// Move exactly one level toward the target set by `evaluate()`.
    ///
    /// Does nothing while the error is under one level, so a call can never
    /// overshoot the target by more than a level.
    pub fn act(&mut self) -> Result<Option<RelayDirection>> {
        let level = self.level_ms();
        let error = self.error_ms();
        if level == 0 || error.unsigned_abs() < level {
            return Ok(None);
        }
        let hold = Duration::from_millis(level);
        let dir = if error > 0 {
            pulse(&mut self.increase, hold, &*self.clock, "slope increase")?;
            self.position.increased_ms += level;
            RelayDirection::Increase
        } else {
            pulse(&mut self.decrease, hold, &*self.clock, "slope decrease")?;
            self.position.decreased_ms += level;
            RelayDirection::Decrease
        };
        tracing::debug!(
            target_ms = self.target_ms,
            position_ms = self.position_ms(),
            %dir,
            "slope actuation"
        );
        Ok(Some(dir))
    }

    /// Return the deck to horizontal.
    ///
    /// Holds "decrease" for the net positive position plus `settle_ms`, so
    /// rounding drift ends against the lower end-stop, then zeroes the
    /// tracker. Returns the hold applied.
    pub fn get_down(&mut self) -> Result<Duration> {
        let net = self.position_ms().max(0) as u64;
        let hold = Duration::from_millis(net + self.cfg.settle_ms);
        pulse(&mut self.decrease, hold, &*self.clock, "slope decrease")?;
        self.position = ActuatorPosition::default();
        self.target_ms = 0;
        tracing::debug!(hold_ms = hold.as_millis() as u64, "slope returned to horizontal");
        Ok(hold)
    }

    /// Drop both relays, logging failures. Fault path only.
    pub fn release_all(&mut self) {
        release(&mut self.increase, "slope increase");
        release(&mut self.decrease, "slope decrease");
    }

    pub fn cfg(&self) -> &SlopeControlCfg {
        &self.cfg
    }
}
