//! Hysteretic two-relay speed control.
use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use treadmill_traits::{Clock, Relay};

use crate::actuator::{RelayDirection, pulse, release};
use crate::config::SpeedControlCfg;
use crate::error::Result;
use crate::hw_error::to_report;
use crate::util::{DEADBAND_EPS_KMH, ticks_elapsed};

/// Reference and measured belt speed for one control tick (km/h).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Speed {
    pub reference: f32,
    pub actual: f32,
}

impl Speed {
    pub fn new(reference: f32, actual: f32) -> Self {
        Self { reference, actual }
    }

    /// `reference - actual`; positive means the belt must speed up.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.reference - self.actual
    }
}

/// Drives the speed-up / speed-down relays of the motor controller, gated by
/// a master enable relay.
///
/// Two gates keep the relays from chattering: a deadband around the setpoint
/// and per-direction cooldowns since the last actuation. Decreases recover
/// faster than increases.
pub struct SpeedActuatorController<R = Box<dyn Relay>> {
    increase: R,
    decrease: R,
    enable: R,
    cfg: SpeedControlCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    last_action_tick: Option<u32>,
    // Snapshot accepted by the last successful evaluate(), with its lapse.
    pending: Option<(Speed, u32)>,
    enabled: bool,
}

impl<R: Relay> core::fmt::Debug for SpeedActuatorController<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpeedActuatorController")
            .field("enabled", &self.enabled)
            .field("last_action_tick", &self.last_action_tick)
            .field("pending", &self.pending)
            .finish()
    }
}

impl<R: Relay> SpeedActuatorController<R> {
    pub fn new(
        increase: R,
        decrease: R,
        enable: R,
        cfg: SpeedControlCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let epoch = clock.now();
        Self {
            increase,
            decrease,
            enable,
            cfg,
            clock,
            epoch,
            last_action_tick: None,
            pending: None,
            enabled: false,
        }
    }

    #[inline]
    fn now(&self) -> u32 {
        self.clock.ticks_ms(self.epoch)
    }

    /// Milliseconds since the last actuation (`u32::MAX` if none yet).
    pub fn lapse_ms(&self) -> u32 {
        match self.last_action_tick {
            Some(t) => ticks_elapsed(self.now(), t),
            None => u32::MAX,
        }
    }

    /// Decide whether `speed` warrants an actuation.
    ///
    /// False while inside the cooldown for the direction the delta asks for,
    /// or while |delta| is below the deadband. A delta equal to the deadband
    /// acts; `DEADBAND_EPS_KMH` only absorbs f32 subtraction noise such as
    /// `5.1 - 5.0`. On true the snapshot is kept for `act()`.
    pub fn evaluate(&mut self, speed: Speed) -> bool {
        self.pending = None;
        let lapse = self.lapse_ms();
        let inc = self.cfg.increase_lapse_ms;
        let dec = self.cfg.decrease_lapse_ms;
        if lapse < inc && lapse < dec {
            return false;
        }
        let delta = speed.delta();
        if !delta.is_finite() || delta.abs() < self.cfg.deadband_kmh - DEADBAND_EPS_KMH {
            return false;
        }
        let cooldown = if delta > 0.0 { inc } else { dec };
        if lapse < cooldown {
            return false;
        }
        self.pending = Some((speed, lapse));
        true
    }

    /// Pulse exactly one relay toward the snapshot accepted by `evaluate()`.
    ///
    /// Returns the direction driven, or `None` when nothing was pending.
    pub fn act(&mut self) -> Result<Option<RelayDirection>> {
        let Some((speed, lapse)) = self.pending.take() else {
            return Ok(None);
        };
        let delta = speed.delta();
        let hold = Duration::from_millis(self.cfg.pulse_ms);
        let dir = if delta > 0.0 && lapse >= self.cfg.increase_lapse_ms {
            pulse(&mut self.increase, hold, &*self.clock, "speed increase")?;
            RelayDirection::Increase
        } else if delta < 0.0 && lapse >= self.cfg.decrease_lapse_ms {
            pulse(&mut self.decrease, hold, &*self.clock, "speed decrease")?;
            RelayDirection::Decrease
        } else {
            return Ok(None);
        };
        self.last_action_tick = Some(self.now());
        tracing::debug!(
            reference = speed.reference,
            actual = speed.actual,
            %dir,
            "speed actuation"
        );
        Ok(Some(dir))
    }

    /// Pulse "decrease" until `measured()` reports at most `rest_kmh`,
    /// ignoring the cooldowns. Returns the number of pulses issued.
    pub fn slow_down(&mut self, mut measured: impl FnMut() -> f32) -> Result<u32> {
        let hold = Duration::from_millis(self.cfg.pulse_ms);
        let settle = Duration::from_millis(u64::from(self.cfg.decrease_lapse_ms));
        let mut pulses = 0u32;
        loop {
            let actual = measured();
            if actual <= self.cfg.rest_kmh {
                tracing::debug!(actual, pulses, "slow-down reached rest speed");
                break;
            }
            pulse(&mut self.decrease, hold, &*self.clock, "speed decrease")?;
            self.clock.sleep(settle);
            pulses += 1;
        }
        self.pending = None;
        self.last_action_tick = Some(self.now());
        Ok(pulses)
    }

    /// Energize the master enable relay; the motor accepts actuation.
    pub fn start(&mut self) -> Result<()> {
        self.enable
            .set(true)
            .map_err(to_report)
            .wrap_err("energize motor enable relay")?;
        self.enabled = true;
        tracing::info!("motor enabled");
        Ok(())
    }

    /// Release the master enable relay.
    pub fn stop(&mut self) -> Result<()> {
        self.enable
            .set(false)
            .map_err(to_report)
            .wrap_err("release motor enable relay")?;
        self.enabled = false;
        self.pending = None;
        tracing::info!("motor disabled");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drop every relay, logging failures. Fault path only.
    pub fn release_all(&mut self) {
        release(&mut self.increase, "speed increase");
        release(&mut self.decrease, "speed decrease");
        release(&mut self.enable, "motor enable");
        self.enabled = false;
        self.pending = None;
    }

    pub fn cfg(&self) -> &SpeedControlCfg {
        &self.cfg
    }
}
