//! `From` implementations bridging `treadmill_config` types to core types.

use crate::config::{
    ControllerCfg, ReferenceCfg, SessionCfg, SlopeControlCfg, SpeedControlCfg, TachometerCfg,
};

/// Millisecond settings that feed tick arithmetic are u32; validated configs
/// never come close, but saturate rather than wrap.
#[inline]
fn ms_u32(ms: u64) -> u32 {
    u32::try_from(ms).unwrap_or(u32::MAX)
}

// ── References ───────────────────────────────────────────────────────────────

impl From<&treadmill_config::SpeedReferenceCfg> for ReferenceCfg {
    fn from(c: &treadmill_config::SpeedReferenceCfg) -> Self {
        Self {
            full_scale: c.full_scale,
            rest_threshold: c.rest_threshold,
            subsamples: c.subsamples,
            sample_hz: c.sample_hz,
        }
    }
}

impl From<&treadmill_config::SlopeReferenceCfg> for ReferenceCfg {
    fn from(c: &treadmill_config::SlopeReferenceCfg) -> Self {
        Self {
            full_scale: c.full_scale,
            rest_threshold: c.rest_threshold,
            subsamples: c.subsamples,
            sample_hz: c.sample_hz,
        }
    }
}

// ── Tachometer ───────────────────────────────────────────────────────────────

impl From<&treadmill_config::TachometerCfg> for TachometerCfg {
    fn from(c: &treadmill_config::TachometerCfg) -> Self {
        Self {
            distance_step_m: c.distance_step_m,
            stale_ms: ms_u32(c.stale_ms),
        }
    }
}

// ── Actuators ────────────────────────────────────────────────────────────────

impl From<&treadmill_config::SpeedControlCfg> for SpeedControlCfg {
    fn from(c: &treadmill_config::SpeedControlCfg) -> Self {
        Self {
            deadband_kmh: c.deadband_kmh,
            increase_lapse_ms: ms_u32(c.increase_lapse_ms),
            decrease_lapse_ms: ms_u32(c.decrease_lapse_ms),
            pulse_ms: c.pulse_ms,
            rest_kmh: c.rest_kmh,
        }
    }
}

impl From<&treadmill_config::SlopeControlCfg> for SlopeControlCfg {
    fn from(c: &treadmill_config::SlopeControlCfg) -> Self {
        Self {
            travel_ms: c.travel_ms,
            levels: c.levels,
            settle_ms: c.settle_ms,
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

impl From<&treadmill_config::SessionCfg> for SessionCfg {
    fn from(c: &treadmill_config::SessionCfg) -> Self {
        Self {
            poll_ms: c.poll_ms,
            cooldown_ms: c.cooldown_ms,
        }
    }
}

impl From<&treadmill_config::Config> for ControllerCfg {
    fn from(c: &treadmill_config::Config) -> Self {
        Self {
            speed_reference: (&c.speed_reference).into(),
            slope_reference: (&c.slope_reference).into(),
            tachometer: (&c.tachometer).into(),
            speed_control: (&c.speed_control).into(),
            slope_control: (&c.slope_control).into(),
            session: (&c.session).into(),
        }
    }
}
