//! Raspberry Pi GPIO backends (`rppal`).
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use tracing::{debug, trace};

use crate::ButtonEdge;
use crate::error::{HwError, Result};
use treadmill_traits::{BoxError, Relay};

fn gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))
}

/// Relay coil on a push-pull output, active high.
pub struct GpioRelay {
    pin: OutputPin,
}

impl GpioRelay {
    pub fn new(bcm: u8) -> Result<Self> {
        let mut pin = gpio()?
            .get(bcm)
            .map_err(|e| HwError::Gpio(format!("relay pin {bcm}: {e}")))?
            .into_output();
        pin.set_low();
        debug!(pin = bcm, "relay output ready");
        Ok(Self { pin })
    }
}

impl Relay for GpioRelay {
    fn set(&mut self, on: bool) -> std::result::Result<(), BoxError> {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}

impl Drop for GpioRelay {
    fn drop(&mut self) {
        self.pin.set_low();
    }
}

/// Edge interrupt on a pulled-up input; the pin must stay alive for the
/// interrupt to keep firing.
pub struct FallingEdgeInput {
    _pin: InputPin,
}

impl FallingEdgeInput {
    pub fn new<F>(bcm: u8, mut on_edge: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let mut pin = gpio()?
            .get(bcm)
            .map_err(|e| HwError::Gpio(format!("input pin {bcm}: {e}")))?
            .into_input_pullup();
        pin.set_async_interrupt(Trigger::FallingEdge, move |level: Level| {
            trace!(?level, "edge");
            on_edge();
        })
        .map_err(|e| HwError::Gpio(format!("interrupt on pin {bcm}: {e}")))?;
        Ok(Self { _pin: pin })
    }

    /// Start/stop button: each falling edge feeds the debounced latch.
    pub fn button(bcm: u8, edge: ButtonEdge) -> Result<Self> {
        Self::new(bcm, move || {
            edge.falling_edge();
        })
    }
}
