//! Tracing setup: console (pretty or JSON) plus an optional JSON file sink.

use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::cli::FILE_GUARD;

/// `RUST_LOG` wins over `--log-level`.
fn console_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. Safe to call once; later calls are no-ops.
pub fn init_tracing(json: bool, level: &str, logging: Option<&treadmill_config::Logging>) {
    let pretty = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter(level))
    });
    let json_console = json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter(level))
    });

    let file = logging.and_then(|l| {
        let path = Path::new(l.file.as_deref()?);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name()?;
        let appender = match l.rotation.as_deref() {
            Some("daily") => rolling::daily(dir, name),
            Some("hourly") => rolling::hourly(dir, name),
            _ => rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let level = l.level.as_deref().unwrap_or("info");
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(level)),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(pretty)
        .with(json_console)
        .with(file)
        .try_init();
}
