mod cli;
mod error_fmt;
#[cfg(feature = "hardware")]
mod hw;
mod logging;
mod run;
#[cfg(not(feature = "hardware"))]
mod sim;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    let code = match real_main(&cli) {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "fatal");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&err));
            } else {
                eprintln!("{}", humanize(&err));
            }
            exit_code_for_error(&err)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: &Cli) -> Result<()> {
    let cfg = treadmill_config::load_file(&cli.config);
    logging::init_tracing(
        cli.json,
        &cli.log_level,
        cfg.as_ref().ok().map(|c| &c.logging),
    );
    let cfg = cfg?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match &cli.cmd {
        Commands::Run {
            sessions,
            target_speed,
            target_slope,
            ride_ms,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::Relaxed);
            })
            .wrap_err("install Ctrl-C handler")?;

            let opts = run::RunOpts {
                sessions: *sessions,
                target_speed_kmh: *target_speed,
                target_slope: *target_slope,
                ride_ms: *ride_ms,
                json: cli.json,
            };
            run::run(&cfg, &opts, shutdown)
        }
        Commands::SelfCheck => run::self_check(&cfg, cli.json),
    }
}
