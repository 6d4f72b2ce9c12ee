//! Human-readable error descriptions and structured JSON error formatting.

use treadmill_core::error::{BuildError, ControlError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRelay(which) => format!(
                "What happened: The {which} relays were not provided to the controller.\nLikely causes: Relay outputs failed to initialize.\nHow to fix: Check the [pins] section and GPIO permissions."
            ),
            BuildError::MissingReference(which) => format!(
                "What happened: The {which} knob input was not provided to the controller.\nLikely causes: The ADC failed to open.\nHow to fix: Check SPI is enabled and the *_reference_channel pins."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ControlError>() {
        return match ce {
            ControlError::HardwareFault(_) | ControlError::Hardware(_) => format!(
                "What happened: A relay could not be driven ({ce}).\nAll relays were released and the session was aborted.\nLikely causes: Wiring, power to the relay board, or GPIO permissions.\nHow to fix: Inspect the relay board, then restart."
            ),
            ControlError::Io(_) => format!(
                "What happened: An I/O error stopped the controller ({ce}).\nAll relays were released.\nHow to fix: Re-run with --log-level=debug for details."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.starts_with("reading config") {
        return format!(
            "What happened: The config file could not be read.\nHow to fix: Pass --config <FILE> or create etc/treadmill.toml. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration") || lower.starts_with("parsing config") {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [pins] or out-of-range values.\nHow to fix: Edit the TOML config and try again. Details: {err:#}"
        );
    }

    if lower.contains("gpio") || lower.contains("spi") {
        return "What happened: Failed to initialize hardware.\nLikely causes: Incorrect pin numbers, SPI disabled, or insufficient permissions.\nHow to fix: Fix the [pins] values; ensure the process can access /dev/gpiomem and /dev/spidev0.0.".to_string();
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 config/build, 3 relay fault, 4 I/O, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    if let Some(ce) = err.downcast_ref::<ControlError>() {
        return match ce {
            ControlError::Hardware(_) | ControlError::HardwareFault(_) => 3,
            ControlError::Io(_) => 4,
            ControlError::Config(_) => 2,
            ControlError::State(_) => 1,
        };
    }
    let lower = format!("{err:#}").to_ascii_lowercase();
    if lower.contains("config") {
        return 2;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<ControlError>() {
        Some(ControlError::Hardware(_) | ControlError::HardwareFault(_)) => "HardwareFault",
        Some(ControlError::Io(_)) => "Io",
        Some(ControlError::Config(_)) => "Config",
        Some(ControlError::State(_)) => "State",
        None if exit_code_for_error(err) == 2 => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_fault_maps_to_exit_3() {
        let err = eyre::Report::new(ControlError::HardwareFault("gpio 17".into()))
            .wrap_err("energize speed increase relay");
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("relays were released"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "HardwareFault");
    }

    #[test]
    fn build_error_maps_to_exit_2() {
        let err = eyre::Report::new(BuildError::MissingRelay("slope"));
        assert_eq!(exit_code_for_error(&err), 2);
        assert!(humanize(&err).contains("slope relays"));
    }
}
