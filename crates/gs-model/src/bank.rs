//! Pattern bank: patterns stored under (bank, pattern) coordinates.

use alloc::vec::Vec;

use crate::ids::{StepId, TrackId};
use crate::pattern::Pattern;
use crate::step::StepView;
use crate::traits::PatternReader;

/// Two-level pattern address: which stored sequence is selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PatternRef {
    pub bank: u8,
    pub pattern: u8,
}

impl PatternRef {
    pub const fn new(bank: u8, pattern: u8) -> Self {
        Self { bank, pattern }
    }
}

/// All stored patterns, addressable by `PatternRef`.
///
/// Backing storage is a flat list with linear lookup — banks hold a
/// handful of patterns, and lookups stay allocation-free for the reader
/// path.
#[derive(Clone, Debug, Default)]
pub struct PatternBank {
    slots: Vec<(PatternRef, Pattern)>,
}

impl PatternBank {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Store a pattern, replacing any existing one at the same address.
    pub fn insert(&mut self, at: PatternRef, pattern: Pattern) {
        match self.slots.iter_mut().find(|(r, _)| *r == at) {
            Some((_, existing)) => *existing = pattern,
            None => self.slots.push((at, pattern)),
        }
    }

    pub fn remove(&mut self, at: PatternRef) -> Option<Pattern> {
        let idx = self.slots.iter().position(|(r, _)| *r == at)?;
        Some(self.slots.remove(idx).1)
    }

    pub fn get(&self, at: PatternRef) -> Option<&Pattern> {
        self.slots.iter().find(|(r, _)| *r == at).map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, at: PatternRef) -> Option<&mut Pattern> {
        self.slots.iter_mut().find(|(r, _)| *r == at).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Addresses of all stored patterns.
    pub fn refs(&self) -> impl Iterator<Item = PatternRef> + '_ {
        self.slots.iter().map(|(r, _)| *r)
    }

    /// Total heap footprint of stored patterns, for cold accounting.
    pub fn bytes(&self) -> usize {
        self.slots
            .iter()
            .map(|(_, p)| core::mem::size_of::<(PatternRef, Pattern)>() + p.data_bytes())
            .sum()
    }
}

impl PatternReader for PatternBank {
    fn step(&self, pattern: PatternRef, track: TrackId, step: StepId) -> Option<StepView> {
        self.get(pattern).map(|p| p.view(track, step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SlotId;
    use crate::pattern::StepVoice;

    #[test]
    fn insert_get_remove() {
        let mut bank = PatternBank::new();
        let at = PatternRef::new(1, 2);
        bank.insert(at, Pattern::new("one"));

        assert_eq!(bank.len(), 1);
        assert!(bank.get(at).is_some());
        assert!(bank.get(PatternRef::new(1, 3)).is_none());

        let removed = bank.remove(at).unwrap();
        assert_eq!(removed.name.as_str(), "one");
        assert!(bank.is_empty());
    }

    #[test]
    fn insert_replaces_existing() {
        let mut bank = PatternBank::new();
        let at = PatternRef::new(0, 0);
        bank.insert(at, Pattern::new("old"));
        bank.insert(at, Pattern::new("new"));

        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get(at).unwrap().name.as_str(), "new");
    }

    #[test]
    fn reader_absence_vs_empty_step() {
        let mut bank = PatternBank::new();
        let at = PatternRef::new(0, 0);
        let track = TrackId::new(0).unwrap();
        let step = StepId::new(0).unwrap();

        // Missing pattern: absence.
        assert!(bank.step(at, track, step).is_none());

        // Present pattern, empty step: a view without a voice.
        bank.insert(at, Pattern::new(""));
        let view = bank.step(at, track, step).unwrap();
        assert!(!view.has_voice);
    }

    #[test]
    fn reader_serves_primary_voice() {
        let mut bank = PatternBank::new();
        let at = PatternRef::new(2, 7);
        let track = TrackId::new(3).unwrap();
        let step = StepId::new(16).unwrap();

        let mut pattern = Pattern::new("lead");
        pattern.set_voice(track, step, SlotId::PRIMARY, Some(StepVoice::new(72, 110, 8)));
        bank.insert(at, pattern);

        let view = bank.step(at, track, step).unwrap();
        assert_eq!((view.note, view.velocity, view.length), (72, 110, 8));
    }
}
