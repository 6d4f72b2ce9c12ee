//! Raspberry Pi assembly: relays on GPIO, knobs on an MCP3008, tachometer
//! and button on edge interrupts.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::JoinHandle;

use eyre::{Result, WrapErr};
use treadmill_core::{ControllerCfg, MotionControllers, PhaseWatch};
use treadmill_hardware::LatchedButton;
use treadmill_hardware::gpio::{FallingEdgeInput, GpioRelay};
use treadmill_hardware::mcp3008::Mcp3008;
use treadmill_traits::Clock;

use crate::run::{Machine, RidePlan};

/// Interrupt registrations; dropping them disables the edges.
pub struct HwBackend {
    _tachometer: FallingEdgeInput,
    _button: FallingEdgeInput,
}

pub fn assemble(
    cfg: &treadmill_config::Config,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<Machine<HwBackend>> {
    let pins = &cfg.pins;
    let relay = |bcm: u8| GpioRelay::new(bcm).wrap_err_with(|| format!("open relay pin {bcm}"));
    let adc = Mcp3008::open().wrap_err("open MCP3008 on SPI0")?;

    let controllers = MotionControllers::builder()
        .with_speed_reference(adc.channel(pins.speed_reference_channel))
        .with_slope_reference(adc.channel(pins.slope_reference_channel))
        .with_speed_relays(
            relay(pins.speed_up)?,
            relay(pins.speed_down)?,
            relay(pins.motor_enable)?,
        )
        .with_slope_relays(relay(pins.slope_up)?, relay(pins.slope_down)?)
        .with_clock(clock.clone())
        .with_config(ControllerCfg::from(cfg))
        .build()?;

    let pulses = controllers.tachometer.pulse_input();
    let tachometer = FallingEdgeInput::new(pins.tachometer, move || pulses.record_pulse())
        .wrap_err_with(|| format!("tachometer interrupt on pin {}", pins.tachometer))?;

    let button = LatchedButton::new(clock, cfg.session.debounce_ms);
    let button_irq = FallingEdgeInput::button(pins.button, button.edge())
        .wrap_err_with(|| format!("button interrupt on pin {}", pins.button))?;
    tracing::info!("hardware assembled");

    Ok(Machine {
        controllers,
        button,
        backend: HwBackend {
            _tachometer: tachometer,
            _button: button_irq,
        },
    })
}

impl HwBackend {
    /// A real operator stands at the panel.
    pub fn start_operator(
        &self,
        _watch: PhaseWatch,
        _plan: RidePlan,
        _stop: Arc<AtomicBool>,
    ) -> Option<JoinHandle<()>> {
        None
    }

    pub fn describe(&self) -> String {
        "hardware backend (rppal)".to_string()
    }
}
