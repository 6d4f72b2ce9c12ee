//! Hardware seams shared by the controller core and its backends.
//!
//! Every trait returns `Box<dyn Error + Send + Sync>` so backends can surface
//! their own error types; `treadmill_core` maps them to typed errors.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single on/off output line driving a relay coil.
pub trait Relay {
    fn set(&mut self, on: bool) -> Result<(), BoxError>;
}

/// Hardware-timed analog capture.
///
/// `read_timed` fills every slot of `buf` with one 8-bit conversion, paced at
/// `sample_hz`, and blocks until the whole window has been captured.
pub trait AnalogInput {
    fn read_timed(&mut self, buf: &mut [u8], sample_hz: u32) -> Result<(), BoxError>;
}

/// Debounced start/stop push button exposed as a toggling latch.
pub trait Button {
    /// Current latch state; toggled by each (debounced) falling edge.
    fn is_on(&self) -> bool;
    /// Force the latch off.
    fn reset(&mut self);
}

impl<R: Relay + ?Sized> Relay for Box<R> {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        (**self).set(on)
    }
}

impl<A: AnalogInput + ?Sized> AnalogInput for Box<A> {
    fn read_timed(&mut self, buf: &mut [u8], sample_hz: u32) -> Result<(), BoxError> {
        (**self).read_timed(buf, sample_hz)
    }
}

impl<B: Button + ?Sized> Button for Box<B> {
    fn is_on(&self) -> bool {
        (**self).is_on()
    }
    fn reset(&mut self) {
        (**self).reset();
    }
}
