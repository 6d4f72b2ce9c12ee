//! MCP3008 10-bit ADC over SPI, reduced to 8-bit samples.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::ten_bit_to_u8;
use treadmill_traits::{AnalogInput, BoxError};

const SPI_CLOCK_HZ: u32 = 1_000_000;

/// Shared SPI bus; both reference channels sit on one converter.
#[derive(Clone)]
pub struct Mcp3008 {
    spi: Arc<Mutex<Spi>>,
}

impl Mcp3008 {
    pub fn open() -> Result<Self> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(Self {
            spi: Arc::new(Mutex::new(spi)),
        })
    }

    pub fn channel(&self, channel: u8) -> Mcp3008Channel {
        Mcp3008Channel {
            adc: self.clone(),
            channel: channel & 0x07,
        }
    }

    fn convert(&self, channel: u8) -> Result<u16> {
        // Start bit, single-ended mode + channel, padding.
        let tx = [0x01, 0x80 | (channel << 4), 0x00];
        let mut rx = [0u8; 3];
        let spi = self
            .spi
            .lock()
            .map_err(|_| HwError::Spi("spi bus lock poisoned".into()))?;
        spi.transfer(&mut rx, &tx)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok((u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2]))
    }
}

pub struct Mcp3008Channel {
    adc: Mcp3008,
    channel: u8,
}

impl AnalogInput for Mcp3008Channel {
    fn read_timed(&mut self, buf: &mut [u8], sample_hz: u32) -> std::result::Result<(), BoxError> {
        let period = Duration::from_micros(1_000_000 / u64::from(sample_hz.max(1)));
        for slot in buf.iter_mut() {
            let raw = self.adc.convert(self.channel)?;
            *slot = ten_bit_to_u8(raw);
            std::thread::sleep(period);
        }
        trace!(channel = self.channel, first = buf.first().copied(), "adc window");
        Ok(())
    }
}
