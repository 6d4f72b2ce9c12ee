//! Operator panel collaborators: indicator (LED + buzzer) and screen.
//!
//! The session pushes events and content here; nothing flows back into the
//! control logic. Implementations must return promptly: any feedback they
//! produce is bounded to a few hundred milliseconds.
use std::time::Duration;

pub use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::speed::Speed;
use crate::tachometer::SessionSummary;

/// Live values published once per control tick while Running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSnapshot {
    pub speed: Speed,
    pub slope_ratio: f32,
    pub distance_m: f32,
    pub duration: Duration,
}

/// Phase changes as seen by the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseEvent {
    Start,
    Ready,
    Armed,
    Running(TickSnapshot),
    Stopping,
    Stopped(SessionSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Red,
    Green,
    Blue,
    Yellow,
}

/// LED colour plus a beep pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorCue {
    pub color: LedColor,
    pub beeps: u8,
    pub beep_ms: u16,
}

impl PhaseEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PhaseEvent::Start => "start",
            PhaseEvent::Ready => "ready",
            PhaseEvent::Armed => "armed",
            PhaseEvent::Running(_) => "running",
            PhaseEvent::Stopping => "stopping",
            PhaseEvent::Stopped(_) => "stopped",
        }
    }

    pub fn cue(&self) -> IndicatorCue {
        let (color, beeps, beep_ms) = match self {
            PhaseEvent::Start => (LedColor::Yellow, 1, 300),
            PhaseEvent::Ready => (LedColor::Green, 1, 100),
            PhaseEvent::Armed => (LedColor::Blue, 3, 300),
            PhaseEvent::Running(_) => (LedColor::Blue, 0, 0),
            PhaseEvent::Stopping => (LedColor::Red, 3, 500),
            PhaseEvent::Stopped(_) => (LedColor::Green, 3, 1000),
        };
        IndicatorCue {
            color,
            beeps,
            beep_ms,
        }
    }

    /// Text shown on the screen for this phase, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            PhaseEvent::Start => Some("Lower the controls!!"),
            PhaseEvent::Ready => Some("Ready? Press the button!!"),
            PhaseEvent::Armed => Some("Starting!!"),
            PhaseEvent::Stopping => Some("Stopping!!"),
            PhaseEvent::Running(_) | PhaseEvent::Stopped(_) => None,
        }
    }
}

pub trait Indicator {
    fn notify(&mut self, event: &PhaseEvent);
}

pub trait Screen {
    fn show(&mut self, content: DisplayContent);
}

impl<T: Indicator + ?Sized> Indicator for Box<T> {
    fn notify(&mut self, event: &PhaseEvent) {
        (**self).notify(event)
    }
}

impl<T: Screen + ?Sized> Screen for Box<T> {
    fn show(&mut self, content: DisplayContent) {
        (**self).show(content)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayContent {
    Message(String),
    Frame(DisplayFrame),
}

/// Speed, distance and elapsed time as the panel renders them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFrame {
    pub speed: Speed,
    pub distance_m: f32,
    pub duration_s: u64,
}

impl DisplayFrame {
    pub fn from_tick(t: &TickSnapshot) -> Self {
        Self {
            speed: t.speed,
            distance_m: t.distance_m,
            duration_s: t.duration.as_secs(),
        }
    }

    pub fn from_summary(s: &SessionSummary) -> Self {
        Self {
            speed: Speed::new(s.avg_speed_kmh, s.avg_speed_kmh),
            distance_m: s.distance_m,
            duration_s: s.duration.as_secs(),
        }
    }

    /// `"[ref] < act"` while off target by more than 0.2 km/h.
    pub fn speed_text(&self) -> String {
        if self.speed.delta().abs() > 0.2 {
            format!("[{:.1}] < {:.1}", self.speed.reference, self.speed.actual)
        } else {
            format!("{:.1} Km/h", self.speed.reference)
        }
    }

    /// Metres below one kilometre, tenths of a kilometre (truncated) above.
    pub fn distance_text(&self) -> String {
        let metres = self.distance_m.max(0.0) as u64;
        if metres >= 1000 {
            format!("{:.1} Km", (metres / 100) as f32 / 10.0)
        } else {
            format!("{metres:3} m")
        }
    }

    /// `mm:ss` under an hour, `Hh:mm` above.
    pub fn duration_text(&self) -> String {
        let h = self.duration_s / 3600;
        let m = (self.duration_s % 3600) / 60;
        let s = self.duration_s % 60;
        if h == 0 {
            format!("{m:02}:{s:02}")
        } else {
            format!("{h}h:{m:02}")
        }
    }
}

impl core::fmt::Display for DisplayFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} | {} | {}",
            self.speed_text(),
            self.distance_text(),
            self.duration_text()
        )
    }
}

/// Screen that hands the latest content to a renderer on another thread.
///
/// The channel holds one item. A newer item replaces one the renderer has
/// not picked up yet, so a slow renderer only ever sees fresh content.
#[derive(Debug, Clone)]
pub struct DisplayFeed {
    tx: Sender<DisplayContent>,
    drain: Receiver<DisplayContent>,
}

#[derive(Debug, Clone)]
pub struct DisplayReceiver {
    rx: Receiver<DisplayContent>,
}

impl DisplayFeed {
    pub fn new() -> (Self, DisplayReceiver) {
        let (tx, rx) = bounded(1);
        (
            Self {
                tx,
                drain: rx.clone(),
            },
            DisplayReceiver { rx },
        )
    }
}

impl Screen for DisplayFeed {
    fn show(&mut self, content: DisplayContent) {
        let mut item = content;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.drain.try_recv();
                    item = back;
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::trace!("display renderer gone; dropping content");
                    return;
                }
            }
        }
    }
}

impl DisplayReceiver {
    /// Most recent pending content, if any.
    pub fn latest(&self) -> Option<DisplayContent> {
        self.rx.try_iter().last()
    }

    /// Wait up to `timeout` for new content.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<DisplayContent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Indicator that reports cues through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingIndicator;

impl Indicator for TracingIndicator {
    fn notify(&mut self, event: &PhaseEvent) {
        let cue = event.cue();
        match event {
            PhaseEvent::Running(tick) => tracing::trace!(
                reference = tick.speed.reference,
                actual = tick.speed.actual,
                slope = tick.slope_ratio,
                distance_m = tick.distance_m,
                "tick"
            ),
            _ => tracing::info!(
                event = event.name(),
                color = ?cue.color,
                beeps = cue.beeps,
                beep_ms = cue.beep_ms,
                "indicator"
            ),
        }
    }
}
