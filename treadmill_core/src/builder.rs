//! Assembles [`MotionControllers`] from boxed hardware parts.
//!
//! Every part is required; `build()` reports the first one missing as a
//! [`BuildError`]. The clock defaults to [`MonotonicClock`].
use std::sync::Arc;

use treadmill_traits::clock::{Clock, MonotonicClock};
use treadmill_traits::{AnalogInput, Relay};

use crate::config::ControllerCfg;
use crate::error::{BuildError, Result};
use crate::reference::ReferenceReader;
use crate::session::MotionControllers;
use crate::slope::SlopeActuatorController;
use crate::speed::SpeedActuatorController;
use crate::tachometer::Tachometer;

type BoxRelay = Box<dyn Relay>;

#[derive(Default)]
pub struct MotionControllersBuilder {
    speed_reference: Option<Box<dyn AnalogInput>>,
    slope_reference: Option<Box<dyn AnalogInput>>,
    speed_relays: Option<(BoxRelay, BoxRelay, BoxRelay)>,
    slope_relays: Option<(BoxRelay, BoxRelay)>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    cfg: Option<ControllerCfg>,
}

impl MotionControllers {
    pub fn builder() -> MotionControllersBuilder {
        MotionControllersBuilder::default()
    }
}

impl MotionControllersBuilder {
    pub fn with_speed_reference(mut self, input: impl AnalogInput + 'static) -> Self {
        self.speed_reference = Some(Box::new(input));
        self
    }

    pub fn with_slope_reference(mut self, input: impl AnalogInput + 'static) -> Self {
        self.slope_reference = Some(Box::new(input));
        self
    }

    /// Speed-up, speed-down and motor-enable relays.
    pub fn with_speed_relays(
        mut self,
        increase: impl Relay + 'static,
        decrease: impl Relay + 'static,
        enable: impl Relay + 'static,
    ) -> Self {
        self.speed_relays = Some((Box::new(increase), Box::new(decrease), Box::new(enable)));
        self
    }

    /// Slope-up and slope-down relays.
    pub fn with_slope_relays(
        mut self,
        increase: impl Relay + 'static,
        decrease: impl Relay + 'static,
    ) -> Self {
        self.slope_relays = Some((Box::new(increase), Box::new(decrease)));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_config(mut self, cfg: ControllerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn build(self) -> Result<MotionControllers> {
        let speed_input = self
            .speed_reference
            .ok_or(BuildError::MissingReference("speed"))?;
        let slope_input = self
            .slope_reference
            .ok_or(BuildError::MissingReference("slope"))?;
        let (speed_up, speed_down, enable) =
            self.speed_relays.ok_or(BuildError::MissingRelay("speed"))?;
        let (slope_up, slope_down) = self.slope_relays.ok_or(BuildError::MissingRelay("slope"))?;
        let cfg = self.cfg.unwrap_or_default();
        if cfg.slope_control.levels == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "slope levels must be >= 1",
            )));
        }
        if cfg.slope_control.level_ms() == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "slope travel_ms must be >= levels",
            )));
        }
        if cfg.speed_reference.sample_hz == 0 || cfg.slope_reference.sample_hz == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "reference sample_hz must be > 0",
            )));
        }
        if cfg.tachometer.distance_step_m <= 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "distance step must be > 0",
            )));
        }
        if cfg.tachometer.stale_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "tachometer stale_ms must be >= 1",
            )));
        }
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        Ok(MotionControllers {
            speed_reference: ReferenceReader::new("speed", speed_input, cfg.speed_reference),
            slope_reference: ReferenceReader::new("slope", slope_input, cfg.slope_reference),
            tachometer: Tachometer::new(cfg.tachometer, clock.clone()),
            speed: SpeedActuatorController::new(
                speed_up,
                speed_down,
                enable,
                cfg.speed_control,
                clock.clone(),
            ),
            slope: SlopeActuatorController::new(slope_up, slope_down, cfg.slope_control, clock),
        })
    }
}
