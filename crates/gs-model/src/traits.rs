//! Collaborator traits the engine is written against.

use crate::bank::PatternRef;
use crate::ids::{StepId, TrackId};
use crate::step::StepView;

/// Read-only access to stored pattern steps.
pub trait PatternReader {
    /// Primary-voice view of one step, or `None` when the addressed
    /// pattern does not exist. Absence is a normal negative result, not
    /// an error.
    fn step(&self, pattern: PatternRef, track: TrackId, step: StepId) -> Option<StepView>;
}

/// Track mute state, queried once per track per tick.
pub trait MuteQuery {
    fn is_muted(&self, track: TrackId) -> bool;
}

/// Destination for scheduled note events.
///
/// Channels are 1-based (1..=16). Implementations must not block: the
/// scheduler calls these from the tick path.
pub trait MidiSink {
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
    fn all_notes_off(&mut self, channel: u8);
}
