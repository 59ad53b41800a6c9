//! Pattern storage: per-track step grids with fixed voice slots.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::ids::{SlotId, StepId, TrackId, SLOTS_PER_STEP, STEPS_PER_TRACK, TRACK_COUNT};
use crate::step::StepView;

/// One playable voice within a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepVoice {
    /// MIDI note number (0-127).
    pub note: u8,
    /// Velocity. Zero means "explicit note-off" when the step fires.
    pub velocity: u8,
    /// Gate length in steps.
    pub length: u16,
}

impl StepVoice {
    pub const fn new(note: u8, velocity: u8, length: u16) -> Self {
        Self { note, velocity, length }
    }
}

/// One step: up to four voice slots, slot 0 being the primary voice.
///
/// Slots are positional — a voice in slot 2 does not imply slots 0 and 1
/// are occupied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternStep {
    voices: [Option<StepVoice>; SLOTS_PER_STEP],
}

impl PatternStep {
    pub const EMPTY: PatternStep = PatternStep { voices: [None; SLOTS_PER_STEP] };

    pub const fn voice(&self, slot: SlotId) -> Option<StepVoice> {
        self.voices[slot.index()]
    }

    pub fn set_voice(&mut self, slot: SlotId, voice: Option<StepVoice>) {
        self.voices[slot.index()] = voice;
    }

    /// The slot-0 voice, the one the reader view exposes.
    pub const fn primary(&self) -> Option<StepVoice> {
        self.voices[0]
    }

    pub fn is_empty(&self) -> bool {
        self.voices.iter().all(Option::is_none)
    }
}

/// A named 16-track by 64-step grid.
#[derive(Clone, Debug)]
pub struct Pattern {
    /// Display name shown by editors.
    pub name: ArrayString<16>,
    /// Steps, stored track-major: `data[track * STEPS_PER_TRACK + step]`.
    data: Vec<PatternStep>,
}

impl Pattern {
    /// Create an empty pattern.
    pub fn new(name: &str) -> Self {
        let mut pattern_name = ArrayString::new();
        let _ = pattern_name.try_push_str(name);
        Self {
            name: pattern_name,
            data: alloc::vec![PatternStep::EMPTY; TRACK_COUNT * STEPS_PER_TRACK],
        }
    }

    pub fn step(&self, track: TrackId, step: StepId) -> &PatternStep {
        &self.data[track.index() * STEPS_PER_TRACK + step.index()]
    }

    pub fn step_mut(&mut self, track: TrackId, step: StepId) -> &mut PatternStep {
        &mut self.data[track.index() * STEPS_PER_TRACK + step.index()]
    }

    /// Place (or clear) a voice at a step slot.
    pub fn set_voice(&mut self, track: TrackId, step: StepId, slot: SlotId, voice: Option<StepVoice>) {
        self.step_mut(track, step).set_voice(slot, voice);
    }

    /// Primary-voice view of a step, as the reader trait serves it.
    pub fn view(&self, track: TrackId, step: StepId) -> StepView {
        match self.step(track, step).primary() {
            Some(v) => StepView::voice(v.note, v.velocity, v.length),
            None => StepView::empty(),
        }
    }

    /// Number of steps with at least one voice on a track.
    pub fn hit_count(&self, track: TrackId) -> usize {
        StepId::all().filter(|s| !self.step(track, *s).is_empty()).count()
    }

    /// Heap footprint of the step grid, for cold accounting.
    pub fn data_bytes(&self) -> usize {
        self.data.len() * core::mem::size_of::<PatternStep>()
    }
}
