//! Core model types for the gridstep sequencer.
//!
//! This crate defines the fixed sequencer geometry (tracks, steps, voice
//! slots), the pattern storage the reader serves views from, and the
//! collaborator traits the engine is written against. The engine consumes
//! these types; the host and device backends implement the traits.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bank;
mod ids;
mod mute;
mod pattern;
mod step;
mod traits;

pub use bank::{PatternBank, PatternRef};
pub use ids::{SlotId, StepId, TrackId, SLOTS_PER_STEP, STEPS_PER_TRACK, TRACK_COUNT};
pub use mute::{MuteMask, SharedMuteMask};
pub use pattern::{Pattern, PatternStep, StepVoice};
pub use step::{StepView, DEFAULT_NOTE, DEFAULT_VELOCITY};
pub use traits::{MidiSink, MuteQuery, PatternReader};
