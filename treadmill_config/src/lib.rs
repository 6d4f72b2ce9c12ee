#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the treadmill controller.
//!
//! `Config` and its sections are deserialized from TOML and validated. Every
//! section except `[pins]` is optional and defaults to the stock machine.
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub speed_up: u8,
    pub speed_down: u8,
    pub motor_enable: u8,
    pub slope_up: u8,
    pub slope_down: u8,
    pub tachometer: u8,
    pub button: u8,
    /// MCP3008 channel wired to the speed potentiometer.
    #[serde(default)]
    pub speed_reference_channel: u8,
    /// MCP3008 channel wired to the slope potentiometer.
    #[serde(default = "default_slope_channel")]
    pub slope_reference_channel: u8,
}

fn default_slope_channel() -> u8 {
    1
}

/// Speed potentiometer input.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpeedReferenceCfg {
    /// Speed at ADC full scale (km/h).
    pub full_scale: f32,
    /// Speeds at or below this count as "control down".
    pub rest_threshold: f32,
    /// Sub-samples averaged per capture.
    pub subsamples: usize,
    /// Capture pacing.
    pub sample_hz: u32,
}

impl Default for SpeedReferenceCfg {
    fn default() -> Self {
        Self {
            full_scale: 15.0,
            rest_threshold: 2.0,
            subsamples: 10,
            sample_hz: 100,
        }
    }
}

/// Slope potentiometer input; values are a 0.0..=1.0 ratio of deck travel.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SlopeReferenceCfg {
    pub full_scale: f32,
    pub rest_threshold: f32,
    pub subsamples: usize,
    pub sample_hz: u32,
}

impl Default for SlopeReferenceCfg {
    fn default() -> Self {
        Self {
            full_scale: 1.0,
            rest_threshold: 0.1,
            subsamples: 10,
            sample_hz: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TachometerCfg {
    /// Belt travel per pulse in meters.
    pub distance_step_m: f32,
    /// Live speed reads 0 after this long without a pulse.
    pub stale_ms: u64,
}

impl Default for TachometerCfg {
    fn default() -> Self {
        Self {
            distance_step_m: 0.22,
            stale_ms: 2_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpeedControlCfg {
    pub deadband_kmh: f32,
    pub increase_lapse_ms: u64,
    pub decrease_lapse_ms: u64,
    pub pulse_ms: u64,
    /// Slow-down target of the stop sequence.
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SlopeControlCfg {
    /// Time for the lift motor to cover the full range.
    pub travel_ms: u64,
    pub levels: u32,
    /// Extra hold when returning to horizontal.
    pub settle_ms: u64,
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionCfg {
    /// Poll cadence while waiting on the operator.
    pub poll_ms: u64,
    /// Wait after Stopped before accepting a new session.
    pub cooldown_ms: u64,
    /// Button debounce window.
    pub debounce_ms: u64,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            poll_ms: 1_000,
            cooldown_ms: 30_000,
            debounce_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Per-tick CSV log of `duration,reference_speed,actual_speed`.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RunLogCfg {
    pub path: Option<PathBuf>,
}

/// Simulated plant used when built without the `hardware` feature.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    pub accel_kmh_per_s: f32,
    pub decel_kmh_per_s: f32,
    pub coast_kmh_per_s: f32,
    pub slope_ratio_per_s: f32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            accel_kmh_per_s: 1.0,
            decel_kmh_per_s: 2.0,
            coast_kmh_per_s: 4.0,
            slope_ratio_per_s: 1.0 / 14.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub speed_reference: SpeedReferenceCfg,
    #[serde(default)]
    pub slope_reference: SlopeReferenceCfg,
    #[serde(default)]
    pub tachometer: TachometerCfg,
    #[serde(default)]
    pub speed_control: SpeedControlCfg,
    #[serde(default)]
    pub slope_control: SlopeControlCfg,
    #[serde(default)]
    pub session: SessionCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub run_log: RunLogCfg,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    use eyre::WrapErr;
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

fn validate_reference(
    name: &str,
    full_scale: f32,
    rest_threshold: f32,
    subsamples: usize,
    sample_hz: u32,
) -> eyre::Result<()> {
    if !(full_scale.is_finite() && full_scale > 0.0) {
        eyre::bail!("{name}.full_scale must be > 0");
    }
    if !(rest_threshold >= 0.0 && rest_threshold < full_scale) {
        eyre::bail!("{name}.rest_threshold must be in [0, full_scale)");
    }
    if subsamples == 0 || subsamples > 256 {
        eyre::bail!("{name}.subsamples must be in [1, 256]");
    }
    if sample_hz == 0 {
        eyre::bail!("{name}.sample_hz must be > 0");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins: every relay output needs its own line
        let outputs = [
            self.pins.speed_up,
            self.pins.speed_down,
            self.pins.motor_enable,
            self.pins.slope_up,
            self.pins.slope_down,
        ];
        for (i, a) in outputs.iter().enumerate() {
            if outputs[i + 1..].contains(a) {
                eyre::bail!("pins: relay outputs must be distinct (pin {a} used twice)");
            }
        }
        if self.pins.speed_reference_channel > 7 || self.pins.slope_reference_channel > 7 {
            eyre::bail!("pins: reference channels must be in [0, 7]");
        }

        // References
        let sr = &self.speed_reference;
        validate_reference(
            "speed_reference",
            sr.full_scale,
            sr.rest_threshold,
            sr.subsamples,
            sr.sample_hz,
        )?;
        let lr = &self.slope_reference;
        validate_reference(
            "slope_reference",
            lr.full_scale,
            lr.rest_threshold,
            lr.subsamples,
            lr.sample_hz,
        )?;
        if self.slope_reference.full_scale > 1.0 {
            eyre::bail!("slope_reference.full_scale is a ratio and must be <= 1.0");
        }

        // Tachometer
        if !(self.tachometer.distance_step_m.is_finite() && self.tachometer.distance_step_m > 0.0)
        {
            eyre::bail!("tachometer.distance_step_m must be > 0");
        }
        if self.tachometer.stale_ms == 0 {
            eyre::bail!("tachometer.stale_ms must be >= 1");
        }

        // Speed control
        let sc = &self.speed_control;
        if !(sc.deadband_kmh >= 0.0 && sc.deadband_kmh < 5.0) {
            eyre::bail!("speed_control.deadband_kmh must be in [0.0, 5.0)");
        }
        if sc.pulse_ms == 0 {
            eyre::bail!("speed_control.pulse_ms must be >= 1");
        }
        if sc.pulse_ms > 10_000 {
            eyre::bail!("speed_control.pulse_ms is unreasonably large (>10s)");
        }
        if sc.rest_kmh < 0.0 {
            eyre::bail!("speed_control.rest_kmh must be >= 0.0");
        }

        // Slope control
        if self.slope_control.levels == 0 {
            eyre::bail!("slope_control.levels must be >= 1");
        }
        if self.slope_control.travel_ms < u64::from(self.slope_control.levels) {
            eyre::bail!("slope_control.travel_ms must be >= levels (level duration >= 1ms)");
        }

        // Session
        if self.session.poll_ms == 0 {
            eyre::bail!("session.poll_ms must be >= 1");
        }
        if self.session.cooldown_ms > 60 * 60 * 1000 {
            eyre::bail!("session.cooldown_ms is unreasonably large (>1h)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Sim
        let sim = &self.sim;
        if sim.accel_kmh_per_s <= 0.0
            || sim.decel_kmh_per_s <= 0.0
            || sim.coast_kmh_per_s <= 0.0
            || sim.slope_ratio_per_s <= 0.0
        {
            eyre::bail!("sim rates must be > 0");
        }

        Ok(())
    }
}
