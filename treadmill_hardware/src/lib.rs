//! Relay, analog, button and tachometer backends.
//!
//! The simulated backends are always available and drive the CLI's sim mode
//! and the integration tests. Raspberry Pi backends (`rppal`) live behind the
//! `hardware` feature.
pub mod error;
pub mod plant;
pub mod util;

#[cfg(feature = "hardware")]
pub mod gpio;
#[cfg(feature = "hardware")]
pub mod mcp3008;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::Instant;

use treadmill_traits::{AnalogInput, BoxError, Button, Clock, Relay};

pub use plant::{PlantCfg, PlantLines, PlantSnapshot, SimulatedTreadmill};

/// Simulated relay: the coil state is a shared line other components observe.
#[derive(Debug, Clone)]
pub struct SimulatedRelay {
    name: &'static str,
    line: Arc<AtomicBool>,
}

impl SimulatedRelay {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            line: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared handle to the coil state (read by the simulated plant).
    pub fn line(&self) -> Arc<AtomicBool> {
        self.line.clone()
    }

    pub fn is_on(&self) -> bool {
        self.line.load(Ordering::Relaxed)
    }
}

impl Relay for SimulatedRelay {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        let was = self.line.swap(on, Ordering::Relaxed);
        if was != on {
            tracing::trace!(relay = self.name, on, "relay (simulated)");
        }
        Ok(())
    }
}

/// Simulated potentiometer feeding an 8-bit ADC.
///
/// The level is set through a [`Knob`]; every capture returns that level in
/// all slots. When a clock is attached, the capture blocks for the window
/// duration like a timer-triggered ADC would.
pub struct SimulatedAnalog {
    level: Arc<AtomicU8>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl SimulatedAnalog {
    pub fn new(level: u8) -> Self {
        Self {
            level: Arc::new(AtomicU8::new(level)),
            clock: None,
        }
    }

    /// Block for the capture window on `clock` during each read.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn knob(&self) -> Knob {
        Knob {
            level: self.level.clone(),
        }
    }
}

impl AnalogInput for SimulatedAnalog {
    fn read_timed(&mut self, buf: &mut [u8], sample_hz: u32) -> Result<(), BoxError> {
        if let Some(clock) = &self.clock {
            let window_us = (buf.len() as u64) * 1_000_000 / u64::from(sample_hz.max(1));
            clock.sleep(std::time::Duration::from_micros(window_us));
        }
        buf.fill(self.level.load(Ordering::Relaxed));
        Ok(())
    }
}

/// Operator-side handle of a [`SimulatedAnalog`].
#[derive(Debug, Clone)]
pub struct Knob {
    level: Arc<AtomicU8>,
}

impl Knob {
    pub fn set_level(&self, level: u8) {
        self.level.store(level, Ordering::Relaxed);
    }

    /// Turn the knob to `value` of `full_scale` (clamped to the 8-bit range).
    pub fn set_fraction(&self, value: f32, full_scale: f32) {
        let frac = if full_scale > 0.0 {
            (value / full_scale).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let level = (frac * 256.0).round().min(255.0) as u8;
        self.set_level(level);
    }
}

/// Toggling latch fed by debounced falling edges.
///
/// The latch itself is a single atomic; the edge side ([`ButtonEdge`]) is
/// what an interrupt handler or a simulated operator calls.
pub struct LatchedButton {
    latched: Arc<AtomicBool>,
    edge: ButtonEdge,
}

impl LatchedButton {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, debounce_ms: u64) -> Self {
        let latched = Arc::new(AtomicBool::new(false));
        let epoch = clock.now();
        let edge = ButtonEdge {
            latched: latched.clone(),
            last_edge_ms: Arc::new(AtomicU64::new(u64::MAX)),
            debounce_ms,
            clock,
            epoch,
        };
        Self { latched, edge }
    }

    /// Handle for the edge source.
    pub fn edge(&self) -> ButtonEdge {
        self.edge.clone()
    }
}

impl Button for LatchedButton {
    fn is_on(&self) -> bool {
        self.latched.load(Ordering::Acquire)
    }

    fn reset(&mut self) {
        self.latched.store(false, Ordering::Release);
    }
}

/// Edge side of a [`LatchedButton`]; cheap to clone into an interrupt callback.
#[derive(Clone)]
pub struct ButtonEdge {
    latched: Arc<AtomicBool>,
    last_edge_ms: Arc<AtomicU64>,
    debounce_ms: u64,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl ButtonEdge {
    /// Register a falling edge. Returns whether the edge toggled the latch
    /// (edges inside the debounce window are ignored).
    pub fn falling_edge(&self) -> bool {
        let now = self.clock.ms_since(self.epoch);
        let last = match self.last_edge_ms.load(Ordering::Acquire) {
            u64::MAX => None,
            ms => Some(ms),
        };
        if !util::debounce_accepts(last, now, self.debounce_ms) {
            tracing::trace!(now, "button bounce ignored");
            return false;
        }
        self.last_edge_ms.store(now, Ordering::Release);
        let was = self.latched.fetch_xor(true, Ordering::AcqRel);
        tracing::debug!(on = !was, "button toggled");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treadmill_traits::clock::test_clock::TestClock;

    #[test]
    fn simulated_relay_tracks_line() {
        let mut relay = SimulatedRelay::new("speed_up");
        let line = relay.line();
        relay.set(true).unwrap();
        assert!(line.load(Ordering::Relaxed));
        relay.set(false).unwrap();
        assert!(!relay.is_on());
    }

    #[test]
    fn simulated_analog_fills_capture_window() {
        let mut adc = SimulatedAnalog::new(0);
        adc.knob().set_level(128);
        let mut buf = [0u8; 10];
        adc.read_timed(&mut buf, 100).unwrap();
        assert!(buf.iter().all(|&v| v == 128));
    }

    #[test]
    fn simulated_analog_blocks_for_window_on_clock() {
        let clock = TestClock::new();
        let mut adc = SimulatedAnalog::new(3).with_clock(Arc::new(clock.clone()));
        let mut buf = [0u8; 10];
        adc.read_timed(&mut buf, 100).unwrap();
        assert_eq!(clock.elapsed().as_millis(), 100);
    }

    #[test]
    fn knob_fraction_saturates_at_full_scale() {
        let adc = SimulatedAnalog::new(0);
        let knob = adc.knob();
        knob.set_fraction(30.0, 15.0);
        assert_eq!(adc.level.load(Ordering::Relaxed), 255);
        knob.set_fraction(7.5, 15.0);
        assert_eq!(adc.level.load(Ordering::Relaxed), 128);
    }

    #[test]
    fn button_debounces_edges() {
        let clock = TestClock::new();
        let mut button = LatchedButton::new(Arc::new(clock.clone()), 500);
        let edge = button.edge();
        assert!(edge.falling_edge());
        assert!(button.is_on());
        clock.advance_ms(100);
        assert!(!edge.falling_edge(), "bounce inside window");
        assert!(button.is_on());
        clock.advance_ms(400);
        assert!(edge.falling_edge());
        assert!(!button.is_on());
        edge.falling_edge();
        button.reset();
        assert!(!button.is_on());
    }
}
