//! Tachometer pulse capture and speed filtering.
//!
//! The pulse interrupt pushes a millisecond tick into a fixed ring of recent
//! timestamps and bumps a counter ([`PulseInput::record_pulse`]). The main
//! loop reads the ring and counter together inside a critical section, then
//! derives speed, distance and duration from that consistent copy.
//!
//! Speed is `distance_step / weighted_period`, where the weighted period
//! favours the most recent intervals:
//!
//! | interval        | weight |
//! |-----------------|--------|
//! | newest          | 1/2    |
//! | second          | 1/4    |
//! | third           | 1/8    |
//! | fourth, fifth   | 1/16   |
//!
//! With fewer intervals recorded, the available weights are renormalized.
//! An undefined period (fewer than two pulses, or a silent sensor) reads as
//! zero speed.
use std::cell::RefCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use critical_section::Mutex;
use treadmill_traits::Clock;

use crate::config::TachometerCfg;
use crate::util::{MPS_TO_KMH, ticks_elapsed};

/// Timestamps kept in the ring.
pub const RING_CAPACITY: usize = 6;
/// Interval weights, newest first. They sum to 1.
pub const WEIGHTS: [f32; RING_CAPACITY - 1] = [0.5, 0.25, 0.125, 0.0625, 0.0625];

/// Fixed-capacity, newest-first ring of pulse ticks.
///
/// `push` shifts every entry one slot older and drops the oldest, so it is
/// O(capacity) and never allocates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleRing {
    ticks: [u32; RING_CAPACITY],
    len: usize,
}

impl SampleRing {
    pub const fn new() -> Self {
        Self {
            ticks: [0; RING_CAPACITY],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, tick: u32) {
        self.ticks.copy_within(0..RING_CAPACITY - 1, 1);
        self.ticks[0] = tick;
        if self.len < RING_CAPACITY {
            self.len += 1;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn newest(&self) -> Option<u32> {
        (self.len > 0).then_some(self.ticks[0])
    }

    /// Recorded ticks, newest first.
    pub fn as_slice(&self) -> &[u32] {
        &self.ticks[..self.len]
    }

    /// Intervals between consecutive recorded ticks, newest first.
    pub fn intervals(&self) -> impl Iterator<Item = u32> + '_ {
        self.as_slice()
            .windows(2)
            .map(|w| ticks_elapsed(w[0], w[1]))
    }

    /// Weighted period in milliseconds; 0.0 when fewer than two ticks exist.
    pub fn weighted_period_ms(&self) -> f32 {
        let mut weighted = 0.0f32;
        let mut weight_sum = 0.0f32;
        for (dt, w) in self.intervals().zip(WEIGHTS) {
            weighted += w * dt as f32;
            weight_sum += w;
        }
        if weight_sum > 0.0 {
            weighted / weight_sum
        } else {
            0.0
        }
    }
}

/// Everything the interrupt and the main loop share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TachometerState {
    pub ring: SampleRing,
    pub pulse_count: u32,
    pub start_tick: u32,
    pub end_tick: Option<u32>,
    pub end_count: Option<u32>,
}

/// Averages over a whole (frozen) session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionSummary {
    pub avg_speed_kmh: f32,
    pub distance_m: f32,
    pub duration: Duration,
}

struct Shared {
    state: Mutex<RefCell<TachometerState>>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl Shared {
    #[inline]
    fn now(&self) -> u32 {
        self.clock.ticks_ms(self.epoch)
    }

    /// Consistent copy of the shared state.
    #[inline]
    fn snapshot(&self) -> TachometerState {
        critical_section::with(|cs| *self.state.borrow_ref(cs))
    }

    #[inline]
    fn update<R>(&self, f: impl FnOnce(&mut TachometerState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }
}

/// Interrupt-side handle. Cheap to clone into an edge callback.
#[derive(Clone)]
pub struct PulseInput {
    shared: Arc<Shared>,
}

impl PulseInput {
    /// Record one tachometer pulse at the current tick.
    ///
    /// Bounded work, no allocation: one ring shift and a counter increment.
    #[inline]
    pub fn record_pulse(&self) {
        let now = self.shared.now();
        self.shared.update(|st| {
            st.ring.push(now);
            st.pulse_count = st.pulse_count.wrapping_add(1);
        });
    }
}

/// Filtered speed, cumulative distance and elapsed time from belt pulses.
pub struct Tachometer {
    shared: Arc<Shared>,
    cfg: TachometerCfg,
}

impl core::fmt::Debug for Tachometer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.shared.snapshot();
        f.debug_struct("Tachometer")
            .field("pulse_count", &st.pulse_count)
            .field("frozen", &st.end_tick.is_some())
            .finish()
    }
}

impl Tachometer {
    pub fn new(cfg: TachometerCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        let shared = Arc::new(Shared {
            state: Mutex::new(RefCell::new(TachometerState::default())),
            clock,
            epoch,
        });
        let tach = Self { shared, cfg };
        tach.reset();
        tach
    }

    /// Handle for the pulse interrupt.
    pub fn pulse_input(&self) -> PulseInput {
        PulseInput {
            shared: self.shared.clone(),
        }
    }

    /// Same as [`PulseInput::record_pulse`].
    pub fn record_pulse(&self) {
        self.pulse_input().record_pulse();
    }

    /// Start a new measurement: clear history and counters, restart the clock.
    pub fn reset(&self) {
        let now = self.shared.now();
        self.shared.update(|st| {
            *st = TachometerState {
                start_tick: now,
                ..TachometerState::default()
            };
        });
        tracing::debug!("tachometer reset");
    }

    /// Freeze end time and pulse count for [`Tachometer::summary`].
    /// Later calls keep the first freeze.
    pub fn finish(&self) {
        let now = self.shared.now();
        self.shared.update(|st| {
            if st.end_tick.is_none() {
                st.end_tick = Some(now);
                st.end_count = Some(st.pulse_count);
            }
        });
    }

    pub fn is_finished(&self) -> bool {
        self.shared.snapshot().end_tick.is_some()
    }

    pub fn state(&self) -> TachometerState {
        self.shared.snapshot()
    }

    pub fn pulse_count(&self) -> u32 {
        self.shared.snapshot().pulse_count
    }

    /// Live belt speed in km/h from the weighted recent period.
    ///
    /// Reads 0 until two pulses exist, and again once the newest pulse is
    /// older than `stale_ms`.
    pub fn speed(&self) -> f32 {
        let st = self.shared.snapshot();
        let Some(newest) = st.ring.newest() else {
            return 0.0;
        };
        let now = self.shared.now();
        if ticks_elapsed(now, newest) > self.cfg.stale_ms {
            return 0.0;
        }
        let period_ms = st.ring.weighted_period_ms();
        if period_ms <= 0.0 {
            return 0.0;
        }
        self.cfg.distance_step_m / (period_ms / 1_000.0) * MPS_TO_KMH
    }

    /// Belt travel since `reset()` in meters (frozen after `finish()`).
    ///
    /// The first pulse only opens the first interval, hence `count - 1`.
    pub fn distance(&self) -> f32 {
        let st = self.shared.snapshot();
        self.distance_for(st.end_count.unwrap_or(st.pulse_count))
    }

    /// Time since `reset()` (frozen after `finish()`).
    pub fn duration(&self) -> Duration {
        let st = self.shared.snapshot();
        let end = st.end_tick.unwrap_or_else(|| self.shared.now());
        Duration::from_millis(u64::from(ticks_elapsed(end, st.start_tick)))
    }

    /// Whole-session averages over the frozen window, or the live window if
    /// `finish()` has not been called.
    pub fn summary(&self) -> SessionSummary {
        let distance_m = self.distance();
        let duration = self.duration();
        let secs = duration.as_secs_f32();
        let avg_speed_kmh = if secs > 0.0 {
            distance_m / secs * MPS_TO_KMH
        } else {
            0.0
        };
        SessionSummary {
            avg_speed_kmh,
            distance_m,
            duration,
        }
    }

    #[inline]
    fn distance_for(&self, count: u32) -> f32 {
        count.saturating_sub(1) as f32 * self.cfg.distance_step_m
    }
}
