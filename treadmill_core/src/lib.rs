#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Motion-control core of the treadmill (hardware-agnostic).
//!
//! All hardware goes through the `treadmill_traits` seams: `Relay` outputs,
//! `AnalogInput` potentiometers, a latched `Button` and a `Clock`.
//!
//! ## Components
//!
//! - **Reference readers** (`reference`): speed and slope knobs, averaged and
//!   scaled to km/h or a 0..1 ratio.
//! - **Tachometer** (`tachometer`): interrupt-captured pulse ticks, weighted
//!   period filter, distance and duration.
//! - **Speed control** (`speed`): hysteretic up/down relays with a deadband
//!   and direction-aware cooldowns, plus the motor enable relay.
//! - **Slope control** (`slope`): open-loop, time-proportional lift control
//!   in whole levels.
//! - **Session** (`session`): the phase machine that gates start and runs
//!   the ordered stop sequence.
//!
//! ## Time
//!
//! Timestamps are wrapping `u32` millisecond ticks (see `util`). Relay holds
//! are synchronous sleeps on the injected `Clock`, so tests on a virtual
//! clock run instantly.

pub mod actuator;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod panel;
pub mod phase;
pub mod reference;
pub mod run_log;
pub mod session;
pub mod slope;
pub mod speed;
pub mod tachometer;
pub mod util;

pub use actuator::RelayDirection;
pub use builder::MotionControllersBuilder;
pub use config::ControllerCfg;
pub use error::{BuildError, ControlError, Report, Result};
pub use panel::{DisplayContent, DisplayFeed, DisplayFrame, Indicator, PhaseEvent, Screen};
pub use phase::{PhaseWatch, SessionPhase};
pub use reference::ReferenceReader;
pub use session::{MotionControllers, Panel, SessionStateMachine};
pub use slope::{ActuatorPosition, SlopeActuatorController};
pub use speed::{Speed, SpeedActuatorController};
pub use tachometer::{PulseInput, SessionSummary, Tachometer};
