//! Relay pulses shared by both actuator controllers.
use std::time::Duration;

use eyre::WrapErr;
use treadmill_traits::{Clock, Relay};

use crate::error::Result;
use crate::hw_error::to_report;

/// Which way an actuator was driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayDirection {
    Increase,
    Decrease,
}

impl RelayDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayDirection::Increase => "increase",
            RelayDirection::Decrease => "decrease",
        }
    }
}

impl core::fmt::Display for RelayDirection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Energize `relay`, hold for `hold`, release.
///
/// The hold is a deliberate synchronous dwell on `clock`. If energizing
/// fails the relay is still commanded off before the error is returned.
pub(crate) fn pulse<R: Relay + ?Sized>(
    relay: &mut R,
    hold: Duration,
    clock: &dyn Clock,
    what: &'static str,
) -> Result<()> {
    if let Err(e) = relay.set(true) {
        let _ = relay.set(false);
        return Err(to_report(e)).wrap_err_with(|| format!("energize {what} relay"));
    }
    clock.sleep(hold);
    relay
        .set(false)
        .map_err(to_report)
        .wrap_err_with(|| format!("release {what} relay"))
}

/// Best-effort release used on the fault path; logs instead of failing.
pub(crate) fn release<R: Relay + ?Sized>(relay: &mut R, what: &'static str) {
    if let Err(e) = relay.set(false) {
        tracing::warn!(relay = what, error = %e, "release failed");
    }
}
