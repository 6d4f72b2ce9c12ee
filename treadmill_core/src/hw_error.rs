//! Maps `Box<dyn Error>` from trait boundaries to typed `ControlError`.
//!
//! The traits in `treadmill_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `treadmill_hardware::HwError` downcasting.

use crate::error::ControlError;

/// Map a trait-boundary error to a typed `ControlError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ControlError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<treadmill_hardware::error::HwError>() {
            return match hw {
                treadmill_hardware::error::HwError::Io(io) => ControlError::Io(io.to_string()),
                other => ControlError::HardwareFault(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return ControlError::Io(io.to_string());
    }
    let s = e.to_string();
    if s.to_lowercase().contains("gpio") {
        ControlError::HardwareFault(s)
    } else {
        ControlError::Hardware(s)
    }
}

/// Convenience for `map_err` on trait results.
pub(crate) fn to_report(e: treadmill_traits::BoxError) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}
