//! MIDI-clock-to-step division and step fan-out.
//!
//! The sequencer advances in sixteenth steps, but the transport clock
//! delivers 24-PPQN ticks; `StepClock` divides six ticks into one step and
//! notifies a bounded set of observers at each boundary.

use alloc::boxed::Box;

/// MIDI clock ticks per sixteenth step (24 PPQN, 4 steps per beat).
pub const TICKS_PER_STEP: u32 = 6;

/// Maximum number of registered step observers.
pub const MAX_STEP_OBSERVERS: usize = 4;

/// Tempo used when a set tempo is implausible.
pub const DEFAULT_BPM: f32 = 120.0;

const MIN_BPM: f32 = 0.5;

/// Where the clock ticks originate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClockSource {
    #[default]
    Internal,
    External,
}

/// Metadata delivered once per step boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockStepInfo {
    /// Absolute step counter since transport start.
    pub step_idx_abs: u32,
    /// Tempo at this boundary.
    pub bpm: f32,
    /// Caller-supplied monotonic timestamp, microseconds.
    pub now_us: u64,
    pub source: ClockSource,
}

/// Observer notified once per step, synchronously, in registration order.
pub trait StepObserver: Send {
    fn on_step(&mut self, info: &ClockStepInfo);
}

/// Handle returned by [`StepClock::subscribe`], used to unsubscribe.
pub type ObserverHandle = usize;

/// Divides incoming MIDI clock ticks into steps.
///
/// `start` primes the divider so the first tick after starting fires step
/// 0 immediately rather than a full step late. The absolute step index is
/// incremented after observers run, so every observer of one boundary
/// sees the same index.
pub struct StepClock {
    bpm: f32,
    source: ClockSource,
    running: bool,
    tick_count: u32,
    step_idx_abs: u32,
    observers: [Option<Box<dyn StepObserver>>; MAX_STEP_OBSERVERS],
}

impl StepClock {
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm: guard_bpm(bpm),
            source: ClockSource::Internal,
            running: false,
            tick_count: 0,
            step_idx_abs: 0,
            observers: [None, None, None, None],
        }
    }

    /// Set the tempo. Values below 0.5 fall back to the default.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = guard_bpm(bpm);
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn set_source(&mut self, source: ClockSource) {
        self.source = source;
    }

    pub fn source(&self) -> ClockSource {
        self.source
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start the transport clock at step 0.
    pub fn start(&mut self) {
        self.tick_count = TICKS_PER_STEP - 1;
        self.step_idx_abs = 0;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Absolute index of the next step boundary to fire.
    pub fn next_step(&self) -> u32 {
        self.step_idx_abs
    }

    /// Feed one MIDI clock tick.
    ///
    /// Returns the step info when this tick crossed a step boundary,
    /// after all observers have been notified; `None` between boundaries
    /// or while stopped.
    pub fn on_midi_tick(&mut self, now_us: u64) -> Option<ClockStepInfo> {
        if !self.running {
            return None;
        }

        self.tick_count += 1;
        if self.tick_count < TICKS_PER_STEP {
            return None;
        }
        self.tick_count = 0;

        let info = ClockStepInfo {
            step_idx_abs: self.step_idx_abs,
            bpm: self.bpm,
            now_us,
            source: self.source,
        };

        for slot in self.observers.iter_mut() {
            if let Some(observer) = slot {
                observer.on_step(&info);
            }
        }

        self.step_idx_abs = self.step_idx_abs.wrapping_add(1);
        Some(info)
    }

    /// Register an observer in the first free slot.
    ///
    /// Returns `None` when all observer slots are taken.
    pub fn subscribe(&mut self, observer: Box<dyn StepObserver>) -> Option<ObserverHandle> {
        let slot = self.observers.iter().position(Option::is_none)?;
        self.observers[slot] = Some(observer);
        Some(slot)
    }

    /// Remove a previously registered observer. Returns whether the
    /// handle was occupied.
    pub fn unsubscribe(&mut self, handle: ObserverHandle) -> bool {
        match self.observers.get_mut(handle) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Duration of one MIDI clock tick at the current tempo, microseconds.
    pub fn tick_period_us(&self) -> u64 {
        libm::roundf(60_000_000.0 / (self.bpm * 24.0)) as u64
    }

    /// Duration of one step at the current tempo, microseconds.
    pub fn step_period_us(&self) -> u64 {
        self.tick_period_us() * TICKS_PER_STEP as u64
    }
}

fn guard_bpm(bpm: f32) -> f32 {
    if bpm < MIN_BPM {
        DEFAULT_BPM
    } else {
        bpm
    }
}
