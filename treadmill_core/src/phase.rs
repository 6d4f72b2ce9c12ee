//! Session phase and a read-only handle to observe it from other threads.
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where the machine is in its start-to-stop cycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// Waiting for both knobs to be turned down.
    #[default]
    AwaitingSafe = 0,
    /// Safe to get on; waiting for the button.
    Ready = 1,
    /// Button pressed; motor about to start.
    Armed = 2,
    Running = 3,
    /// Slow-down, get-down and motor cut in progress.
    Stopping = 4,
    /// Session over; cool-down before the next one.
    Stopped = 5,
}

impl SessionPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionPhase::AwaitingSafe => "awaiting_safe",
            SessionPhase::Ready => "ready",
            SessionPhase::Armed => "armed",
            SessionPhase::Running => "running",
            SessionPhase::Stopping => "stopping",
            SessionPhase::Stopped => "stopped",
        }
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => SessionPhase::AwaitingSafe,
            1 => SessionPhase::Ready,
            2 => SessionPhase::Armed,
            3 => SessionPhase::Running,
            4 => SessionPhase::Stopping,
            5 => SessionPhase::Stopped,
            _ => return None,
        })
    }
}

impl core::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloneable view of the current phase. Only the session writes it.
#[derive(Debug, Clone, Default)]
pub struct PhaseWatch(Arc<AtomicU8>);

impl PhaseWatch {
    pub(crate) fn new(phase: SessionPhase) -> Self {
        Self(Arc::new(AtomicU8::new(phase as u8)))
    }

    pub fn get(&self) -> SessionPhase {
        SessionPhase::from_u8(self.0.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn is(&self, phase: SessionPhase) -> bool {
        self.get() == phase
    }

    pub(crate) fn set(&self, phase: SessionPhase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}
