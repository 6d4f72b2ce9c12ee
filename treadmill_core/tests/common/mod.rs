#![allow(dead_code)]
//! Spy hardware shared by the integration tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use treadmill_core::panel::{DisplayContent, Indicator, PhaseEvent, Screen};
use treadmill_traits::clock::test_clock::TestClock;
use treadmill_traits::{AnalogInput, Button, Relay};

/// `(relay, on, virtual ms)` in the order the relays were driven.
pub type Journal = Arc<Mutex<Vec<(&'static str, bool, u64)>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(j: &Journal) -> Vec<(&'static str, bool, u64)> {
    j.lock().unwrap().clone()
}

/// Names of relays energized, in order.
pub fn energized(j: &Journal) -> Vec<&'static str> {
    entries(j)
        .into_iter()
        .filter(|(_, on, _)| *on)
        .map(|(n, _, _)| n)
        .collect()
}

pub struct SpyRelay {
    name: &'static str,
    journal: Journal,
    clock: TestClock,
    fail_on: bool,
}

impl SpyRelay {
    pub fn new(name: &'static str, journal: &Journal, clock: &TestClock) -> Self {
        Self {
            name,
            journal: journal.clone(),
            clock: clock.clone(),
            fail_on: false,
        }
    }

    /// Energizing this relay fails with an I/O error; releasing works.
    pub fn failing(name: &'static str, journal: &Journal, clock: &TestClock) -> Self {
        Self {
            fail_on: true,
            ..Self::new(name, journal, clock)
        }
    }
}

impl Relay for SpyRelay {
    fn set(&mut self, on: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
        if on && self.fail_on {
            return Err(Box::new(std::io::Error::other("relay driver fault")));
        }
        let ms = self.clock.elapsed().as_millis() as u64;
        self.journal.lock().unwrap().push((self.name, on, ms));
        Ok(())
    }
}

/// Potentiometer whose 8-bit level the test turns directly.
#[derive(Clone, Default)]
pub struct FakeKnob {
    level: Arc<AtomicU8>,
    fail: Arc<AtomicBool>,
}

impl FakeKnob {
    pub fn at(level: u8) -> Self {
        let k = Self::default();
        k.set(level);
        k
    }

    pub fn set(&self, level: u8) {
        self.level.store(level, Ordering::SeqCst);
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl AnalogInput for FakeKnob {
    fn read_timed(
        &mut self,
        buf: &mut [u8],
        _sample_hz: u32,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Box::new(std::io::Error::other("adc timeout")));
        }
        buf.fill(self.level.load(Ordering::SeqCst));
        Ok(())
    }
}

/// Latch the test flips by hand; `reset` clears it like the real one.
#[derive(Clone, Default)]
pub struct FakeButton {
    on: Arc<AtomicBool>,
    resets: Arc<AtomicU32>,
}

impl FakeButton {
    pub fn press(&self) {
        self.on.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.on.store(false, Ordering::SeqCst);
    }

    pub fn resets(&self) -> u32 {
        self.resets.load(Ordering::SeqCst)
    }
}

impl Button for FakeButton {
    fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    fn reset(&mut self) {
        self.on.store(false, Ordering::SeqCst);
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Answers `is_on` from a script; once it runs dry it raises `shutdown`
/// (if given) and keeps answering `hold`.
pub struct ScriptedButton {
    script: RefCell<VecDeque<bool>>,
    hold: bool,
    shutdown: Option<Arc<AtomicBool>>,
    calls: Cell<u32>,
}

impl ScriptedButton {
    pub fn new(script: &[bool], hold: bool, shutdown: Option<Arc<AtomicBool>>) -> Self {
        Self {
            script: RefCell::new(script.iter().copied().collect()),
            hold,
            shutdown,
            calls: Cell::new(0),
        }
    }
}

impl Button for ScriptedButton {
    fn is_on(&self) -> bool {
        self.calls.set(self.calls.get() + 1);
        match self.script.borrow_mut().pop_front() {
            Some(v) => v,
            None => {
                if let Some(flag) = &self.shutdown {
                    flag.store(true, Ordering::SeqCst);
                }
                self.hold
            }
        }
    }

    fn reset(&mut self) {}
}

pub type Events = Arc<Mutex<Vec<&'static str>>>;

#[derive(Clone, Default)]
pub struct RecordingIndicator {
    pub events: Events,
}

impl Indicator for RecordingIndicator {
    fn notify(&mut self, event: &PhaseEvent) {
        self.events.lock().unwrap().push(event.name());
    }
}

#[derive(Clone, Default)]
pub struct RecordingScreen {
    pub shown: Arc<Mutex<Vec<DisplayContent>>>,
}

impl Screen for RecordingScreen {
    fn show(&mut self, content: DisplayContent) {
        self.shown.lock().unwrap().push(content);
    }
}
