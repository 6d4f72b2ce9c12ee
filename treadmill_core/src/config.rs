//! Runtime configuration for the controllers.
//!
//! These are the structs the core runs on. They are separate from the
//! TOML-deserialized config in `treadmill_config`; see `conversions`.
use std::time::Duration;

/// One potentiometer reference input.
#[derive(Debug, Clone)]
pub struct ReferenceCfg {
    /// Physical value at ADC full scale (km/h for speed, ratio for slope).
    pub full_scale: f32,
    /// `is_at_rest` holds at or below this value.
    pub rest_threshold: f32,
    /// Sub-samples (K) averaged per capture.
    pub subsamples: usize,
    /// Capture pacing in Hz.
    pub sample_hz: u32,
}

impl ReferenceCfg {
    /// Speed knob: 0..15 km/h, at rest below 2 km/h.
    pub fn speed() -> Self {
        Self {
            full_scale: 15.0,
            rest_threshold: 2.0,
            subsamples: 10,
            sample_hz: 100,
        }
    }

    /// Slope knob: 0..1 of deck travel, at rest below 0.1.
    pub fn slope() -> Self {
        Self {
            full_scale: 1.0,
            rest_threshold: 0.1,
            subsamples: 10,
            sample_hz: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TachometerCfg {
    /// Belt travel per pulse (m).
    pub distance_step_m: f32,
    /// Live speed reads 0 after this long without a pulse.
    pub stale_ms: u32,
}

impl Default for TachometerCfg {
    fn default() -> Self {
        Self {
            distance_step_m: 0.22,
            stale_ms: 2_000,
        }
    }
}

/// Hysteretic speed control.
#[derive(Debug, Clone)]
pub struct SpeedControlCfg {
    /// No actuation while |reference - actual| is below this (km/h).
    pub deadband_kmh: f32,
    /// Minimum time after an actuation before the next increase.
    pub increase_lapse_ms: u32,
    /// Minimum time after an actuation before the next decrease.
    pub decrease_lapse_ms: u32,
    /// Relay hold per actuation.
    pub pulse_ms: u64,
    /// Slow-down target of the stop sequence (km/h).
    pub rest_kmh: f32,
}

impl Default for SpeedControlCfg {
    fn default() -> Self {
        Self {
            deadband_kmh: 0.1,
            increase_lapse_ms: 1_000,
            decrease_lapse_ms: 300,
            pulse_ms: 1_000,
            rest_kmh: 2.0,
        }
    }
}

/// Time-proportional slope control.
#[derive(Debug, Clone)]
pub struct SlopeControlCfg {
    /// Time for the lift to cover the whole range (T_MAX).
    pub travel_ms: u64,
    /// Number of discrete levels the range is split into (N_LEVELS).
    pub levels: u32,
    /// Extra hold when returning to horizontal.
    pub settle_ms: u64,
}

impl SlopeControlCfg {
    /// Duration of one level: `travel_ms / levels`, truncated.
    #[inline]
    pub fn level_ms(&self) -> u64 {
        self.travel_ms / u64::from(self.levels.max(1))
    }
}

impl Default for SlopeControlCfg {
    fn default() -> Self {
        Self {
            travel_ms: 14_000,
            levels: 5,
            settle_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionCfg {
    /// Poll cadence while waiting on the operator.
    pub poll_ms: u64,
    /// Wait in Stopped before the next session may begin.
    pub cooldown_ms: u64,
}

impl SessionCfg {
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            poll_ms: 1_000,
            cooldown_ms: 30_000,
        }
    }
}

/// Everything the controllers need, grouped.
#[derive(Debug, Clone)]
pub struct ControllerCfg {
    pub speed_reference: ReferenceCfg,
    pub slope_reference: ReferenceCfg,
    pub tachometer: TachometerCfg,
    pub speed_control: SpeedControlCfg,
    pub slope_control: SlopeControlCfg,
    pub session: SessionCfg,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            speed_reference: ReferenceCfg::speed(),
            slope_reference: ReferenceCfg::slope(),
            tachometer: TachometerCfg::default(),
            speed_control: SpeedControlCfg::default(),
            slope_control: SlopeControlCfg::default(),
            session: SessionCfg::default(),
        }
    }
}
