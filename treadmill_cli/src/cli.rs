//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "treadmill", version, about = "Treadmill motion controller")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/treadmill.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run sessions until Ctrl-C (or until --sessions have completed)
    Run {
        /// Stop after this many completed sessions
        #[arg(long, value_name = "N")]
        sessions: Option<u32>,
        /// Simulated operator: speed knob setting while riding (km/h)
        #[arg(long, value_name = "KMH", default_value_t = 6.0)]
        target_speed: f32,
        /// Simulated operator: slope knob setting while riding (0..1)
        #[arg(long, value_name = "RATIO", default_value_t = 0.0)]
        target_slope: f32,
        /// Simulated operator: ride length before pressing stop (ms)
        #[arg(long, value_name = "MS", default_value_t = 10_000)]
        ride_ms: u64,
    },
    /// Assemble the hardware, sample both knobs and report
    SelfCheck,
}
