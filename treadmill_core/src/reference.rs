//! Operator reference inputs (speed and slope potentiometers).
use eyre::WrapErr;
use treadmill_traits::AnalogInput;

use crate::config::ReferenceCfg;
use crate::error::Result;
use crate::hw_error::to_report;

/// ADC resolution the scaling assumes (8-bit captures).
pub const ADC_LEVELS: f32 = 256.0;

/// Periodic analog sampling of one potentiometer, scaled to a physical value.
///
/// The capture buffer is allocated once and overwritten on every `sample()`.
pub struct ReferenceReader<A = Box<dyn AnalogInput>> {
    name: &'static str,
    input: A,
    cfg: ReferenceCfg,
    buf: Vec<u8>,
    last: Option<f32>,
}

impl<A> core::fmt::Debug for ReferenceReader<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReferenceReader")
            .field("name", &self.name)
            .field("last", &self.last)
            .finish()
    }
}

impl<A: AnalogInput> ReferenceReader<A> {
    pub fn new(name: &'static str, input: A, cfg: ReferenceCfg) -> Self {
        let buf = vec![0; cfg.subsamples.max(1)];
        Self {
            name,
            input,
            cfg,
            buf,
            last: None,
        }
    }

    /// Capture `subsamples` conversions (blocks for the capture window),
    /// average them and rescale to the physical unit.
    pub fn sample(&mut self) -> Result<f32> {
        self.input
            .read_timed(&mut self.buf, self.cfg.sample_hz)
            .map_err(to_report)
            .wrap_err_with(|| format!("{} reference capture", self.name))?;
        let sum: u32 = self.buf.iter().map(|&v| u32::from(v)).sum();
        // Integer average, like the ADC-side accumulator.
        let level = sum / self.buf.len() as u32;
        let value = level as f32 * self.cfg.full_scale / ADC_LEVELS;
        tracing::trace!(
            reference = self.name,
            level,
            value,
            window_us = crate::util::capture_window_us(self.buf.len(), self.cfg.sample_hz),
            "reference sample"
        );
        self.last = Some(value);
        Ok(value)
    }

    /// True iff a fresh sample is at or below the rest threshold.
    ///
    /// A failed capture never reads as "at rest".
    pub fn is_at_rest(&mut self) -> bool {
        match self.sample() {
            Ok(v) => v <= self.cfg.rest_threshold,
            Err(e) => {
                tracing::warn!(reference = self.name, error = %e, "capture failed; not at rest");
                false
            }
        }
    }

    /// Most recent successfully sampled value.
    pub fn last(&self) -> Option<f32> {
        self.last
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cfg(&self) -> &ReferenceCfg {
        &self.cfg
    }
}
