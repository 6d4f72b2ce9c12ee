//! Tick arithmetic and numeric helpers.
//!
//! Timestamps are free-running `u32` millisecond ticks. They wrap after
//! ~49.7 days, so they are only ever compared through the wrapping
//! differences below, never by plain subtraction.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;
/// m/s to km/h.
pub const MPS_TO_KMH: f32 = 3.6;

/// Signed difference `end - start` between two wrapping tick values.
///
/// Correct as long as the true distance is below 2^31 ms.
#[inline]
pub fn ticks_diff(end: u32, start: u32) -> i32 {
    end.wrapping_sub(start) as i32
}

/// Elapsed ticks from `start` to `end`, clamped at 0 if `end` precedes `start`.
#[inline]
pub fn ticks_elapsed(end: u32, start: u32) -> u32 {
    ticks_diff(end, start).max(0) as u32
}

/// Tolerance for comparing a speed delta against the deadband (km/h).
pub const DEADBAND_EPS_KMH: f32 = 1e-4;

/// Capture window of `samples` conversions paced at `hz`, in microseconds.
#[inline]
pub fn capture_window_us(samples: usize, hz: u32) -> u64 {
    (samples as u64).saturating_mul(1_000_000) / u64::from(hz.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_diff_survives_wraparound() {
        let start = u32::MAX - 99;
        let end = 100u32; // 200 ticks later, after the wrap
        assert_eq!(ticks_diff(end, start), 200);
        assert_eq!(ticks_diff(start, end), -200);
    }

    #[test]
    fn ticks_elapsed_clamps_negative() {
        assert_eq!(ticks_elapsed(10, 20), 0);
        assert_eq!(ticks_elapsed(20, 10), 10);
        assert_eq!(ticks_elapsed(5, u32::MAX), 6);
    }

    #[test]
    fn capture_window() {
        assert_eq!(capture_window_us(10, 100), 100_000);
        assert_eq!(capture_window_us(10, 0), 10_000_000);
    }
}
