//! Validated index newtypes for the fixed sequencer geometry.
//!
//! Every table in the tick path is a fixed array indexed by one of these.
//! Raw integers coming in over an external surface are validated once at
//! the boundary; past that point an id is known to be in range.

/// Number of sequencer tracks (one MIDI channel each).
pub const TRACK_COUNT: usize = 16;

/// Steps per track (one bar of sixteenths at the default zoom).
pub const STEPS_PER_TRACK: usize = 64;

/// Voice slots per step.
pub const SLOTS_PER_STEP: usize = 4;

/// A track index in `0..TRACK_COUNT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrackId(u8);

impl TrackId {
    /// Validate a raw index. Out-of-range values yield `None`.
    pub const fn new(raw: u8) -> Option<Self> {
        if (raw as usize) < TRACK_COUNT {
            Some(Self(raw))
        } else {
            None
        }
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The MIDI channel this track emits on (1-based, `track + 1`).
    pub const fn channel(self) -> u8 {
        self.0 + 1
    }

    /// All tracks in index order.
    pub fn all() -> impl Iterator<Item = TrackId> {
        (0..TRACK_COUNT as u8).map(TrackId)
    }
}

/// A step index in `0..STEPS_PER_TRACK`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StepId(u8);

impl StepId {
    /// Validate a raw index. Out-of-range values yield `None`.
    pub const fn new(raw: u8) -> Option<Self> {
        if (raw as usize) < STEPS_PER_TRACK {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Wrap an absolute step counter onto the track, always in range.
    pub const fn from_abs(step_idx_abs: u32) -> Self {
        Self((step_idx_abs % STEPS_PER_TRACK as u32) as u8)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// All steps in index order.
    pub fn all() -> impl Iterator<Item = StepId> {
        (0..STEPS_PER_TRACK as u8).map(StepId)
    }
}

/// A voice slot index in `0..SLOTS_PER_STEP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(u8);

impl SlotId {
    /// Slot 0 — the voice the reader view and the runner overlay use.
    pub const PRIMARY: SlotId = SlotId(0);

    /// Validate a raw index. Out-of-range values yield `None`.
    pub const fn new(raw: u8) -> Option<Self> {
        if (raw as usize) < SLOTS_PER_STEP {
            Some(Self(raw))
        } else {
            None
        }
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// All slots in index order.
    pub fn all() -> impl Iterator<Item = SlotId> {
        (0..SLOTS_PER_STEP as u8).map(SlotId)
    }
}
