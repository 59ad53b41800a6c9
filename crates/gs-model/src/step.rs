//! Read-only step views served by pattern readers.

/// Note number used when a captured voice carries none (middle C).
pub const DEFAULT_NOTE: u8 = 60;

/// Velocity substituted for zero at capture time.
pub const DEFAULT_VELOCITY: u8 = 100;

/// A transient view of one step's primary voice.
///
/// Produced per reader query and consumed in the same tick; never stored.
/// `velocity == 0` with `has_voice == true` is meaningful: it instructs the
/// scheduler to silence the track rather than trigger a note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepView {
    pub has_voice: bool,
    pub note: u8,
    pub velocity: u8,
    /// Gate length in steps. The scheduler clamps this to `1..=64`.
    pub length: u16,
}

impl StepView {
    /// A view with no voice present.
    pub const fn empty() -> Self {
        Self { has_voice: false, note: 0, velocity: 0, length: 0 }
    }

    /// A view carrying a sounding voice.
    pub const fn voice(note: u8, velocity: u8, length: u16) -> Self {
        Self { has_voice: true, note, velocity, length }
    }
}
