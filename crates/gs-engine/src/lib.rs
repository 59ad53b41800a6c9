//! Real-time sequencer core for gridstep.
//!
//! Turns transport clock ticks into MIDI note events: [`StepClock`]
//! divides the 24-PPQN tick stream into sixteenth steps, [`Runner`]
//! schedules per-track note on/offs with in-flight countdowns, and the
//! quickstep/capture caches stage live edits for at-most-once
//! consumption. Everything the tick path touches is fixed-size and
//! allocation-free; [`runtime`] carries the hot/cold accounting that
//! keeps it that way.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod capture;
mod clock;
mod pending;
mod quickstep;
mod runner;
pub mod runtime;

pub use capture::{CaptureCache, CaptureEntry};
pub use clock::{
    ClockSource, ClockStepInfo, ObserverHandle, StepClock, StepObserver, DEFAULT_BPM,
    MAX_STEP_OBSERVERS, TICKS_PER_STEP,
};
pub use pending::{PendingNote, PendingTable};
pub use quickstep::{QuickstepCache, QuickstepEntry};
pub use runner::{Runner, Transport};
