//! Panel stand-ins for tests and headless runs.
use crate::panel::{DisplayContent, Indicator, PhaseEvent, Screen};

/// An indicator that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndicator;

impl Indicator for NullIndicator {
    fn notify(&mut self, _event: &PhaseEvent) {}
}

/// A screen that discards everything it is shown.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScreen;

impl Screen for NullScreen {
    fn show(&mut self, _content: DisplayContent) {}
}
