//! Per-track in-flight note bookkeeping.

use gs_model::{TrackId, TRACK_COUNT};

/// One in-flight note on a track.
///
/// Invariant: `remaining_steps > 0` exactly when `active` is set. The
/// table below is the only writer and keeps that invariant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingNote {
    pub active: bool,
    pub note: u8,
    pub remaining_steps: u8,
}

impl PendingNote {
    pub const fn idle() -> Self {
        Self { active: false, note: 0, remaining_steps: 0 }
    }
}

/// Fixed table of pending notes, one slot per track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTable {
    slots: [PendingNote; TRACK_COUNT],
}

impl PendingTable {
    pub const fn new() -> Self {
        Self { slots: [PendingNote::idle(); TRACK_COUNT] }
    }

    /// Arm a note with its countdown. Replaces whatever was pending.
    pub fn arm(&mut self, track: TrackId, note: u8, remaining_steps: u8) {
        debug_assert!(remaining_steps > 0);
        self.slots[track.index()] = PendingNote { active: true, note, remaining_steps };
    }

    /// Clear the slot, returning the note that was pending (for its
    /// note-off). Idempotent: a second take yields `None`.
    pub fn take(&mut self, track: TrackId) -> Option<u8> {
        let slot = &mut self.slots[track.index()];
        if !slot.active {
            return None;
        }
        let note = slot.note;
        *slot = PendingNote::idle();
        Some(note)
    }

    /// Advance the countdown by one step.
    ///
    /// Returns the note whose countdown just reached zero (its note-off
    /// is due now), clearing the slot; `None` while still counting or
    /// idle.
    pub fn step_down(&mut self, track: TrackId) -> Option<u8> {
        let slot = &mut self.slots[track.index()];
        if !slot.active {
            return None;
        }
        slot.remaining_steps -= 1;
        if slot.remaining_steps > 0 {
            return None;
        }
        let note = slot.note;
        *slot = PendingNote::idle();
        Some(note)
    }

    pub fn get(&self, track: TrackId) -> PendingNote {
        self.slots[track.index()]
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(raw: u8) -> TrackId {
        TrackId::new(raw).unwrap()
    }

    #[test]
    fn countdown_fires_after_exactly_n_steps() {
        let mut table = PendingTable::new();
        table.arm(track(0), 60, 4);

        for _ in 0..3 {
            assert_eq!(table.step_down(track(0)), None);
            assert!(table.get(track(0)).active);
        }
        assert_eq!(table.step_down(track(0)), Some(60));
        assert_eq!(table.get(track(0)), PendingNote::idle());

        // Fires once only.
        assert_eq!(table.step_down(track(0)), None);
    }

    #[test]
    fn take_returns_note_once() {
        let mut table = PendingTable::new();
        table.arm(track(5), 72, 2);

        assert_eq!(table.take(track(5)), Some(72));
        assert_eq!(table.take(track(5)), None);
        assert_eq!(table.active_count(), 0);
    }

    #[test]
    fn arm_replaces_pending() {
        let mut table = PendingTable::new();
        table.arm(track(1), 60, 8);
        table.arm(track(1), 64, 1);

        assert_eq!(table.step_down(track(1)), Some(64));
    }

    #[test]
    fn tracks_are_independent() {
        let mut table = PendingTable::new();
        table.arm(track(0), 60, 1);
        table.arm(track(15), 61, 2);

        assert_eq!(table.step_down(track(0)), Some(60));
        assert_eq!(table.step_down(track(15)), None);
        assert_eq!(table.active_count(), 1);
    }
}
