//! Scoped quickstep staging cache with at-most-once delivery.
//!
//! Live capture stages a note edit for a `(bank, pattern, track, step,
//! slot)` coordinate; the step engine or editor consumes it exactly once.
//! Entries are meaningful only for the pattern being edited, so switching
//! the active identity clears the whole store.
//!
//! Marks come from the control context and fetches from the tick context.
//! Each cell is one atomic word: a mark is a single store, a fetch clears
//! the armed bit with a single read-modify-write, so a cell can never be
//! observed torn and delivery stays exactly-once under the race.

use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use gs_model::{PatternRef, SlotId, StepId, TrackId, DEFAULT_VELOCITY, SLOTS_PER_STEP, STEPS_PER_TRACK, TRACK_COUNT};

/// A staged note edit, delivered at most once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuickstepEntry {
    pub note: u8,
    pub velocity: u8,
    /// Gate length in steps. Never zero once stored.
    pub length: u8,
}

const ARMED_BIT: u32 = 1 << 24;

/// Identity sentinel: no active pattern. Bank/pattern (255, 255) is
/// reserved and cannot be an active identity.
const IDENT_NONE: u16 = 0xFFFF;

/// Pack an entry plus the armed flag into one cell word.
fn pack_entry(entry: QuickstepEntry) -> u32 {
    entry.note as u32 | (entry.velocity as u32) << 8 | (entry.length as u32) << 16 | ARMED_BIT
}

/// Unpack a cell word (the armed bit is ignored here).
fn unpack_entry(raw: u32) -> QuickstepEntry {
    QuickstepEntry {
        note: raw as u8,
        velocity: (raw >> 8) as u8,
        length: (raw >> 16) as u8,
    }
}

fn pack_ident(at: PatternRef) -> u16 {
    (at.bank as u16) << 8 | at.pattern as u16
}

/// The scoped staging store: 16 tracks x 64 steps x 4 slots.
///
/// All operations take `&self`; the type is `Sync` and is shared between
/// the capture side and the tick side without locks. Identity changes
/// (`set_active`, and `mark`'s implicit switch) must come from a single
/// control context.
pub struct QuickstepCache {
    active: AtomicU16,
    cells: [[[AtomicU32; SLOTS_PER_STEP]; STEPS_PER_TRACK]; TRACK_COUNT],
}

impl QuickstepCache {
    pub const fn new() -> Self {
        const CELL: AtomicU32 = AtomicU32::new(0);
        const SLOTS: [AtomicU32; SLOTS_PER_STEP] = [CELL; SLOTS_PER_STEP];
        const STEPS: [[AtomicU32; SLOTS_PER_STEP]; STEPS_PER_TRACK] = [SLOTS; STEPS_PER_TRACK];
        Self {
            active: AtomicU16::new(IDENT_NONE),
            cells: [STEPS; TRACK_COUNT],
        }
    }

    /// Drop every entry and forget the active identity.
    pub fn reset(&self) {
        self.clear_entries();
        self.active.store(IDENT_NONE, Ordering::Release);
    }

    /// The identity entries are currently scoped to, if any.
    pub fn active_pattern(&self) -> Option<PatternRef> {
        let raw = self.active.load(Ordering::Acquire);
        if raw == IDENT_NONE {
            return None;
        }
        Some(PatternRef::new((raw >> 8) as u8, raw as u8))
    }

    /// Switch the active identity. A no-op when unchanged; otherwise all
    /// entries are cleared before the new identity becomes visible, so a
    /// concurrent fetch under the new identity can never see a stale
    /// entry.
    pub fn set_active(&self, at: PatternRef) {
        let packed = pack_ident(at);
        if self.active.load(Ordering::Acquire) == packed {
            return;
        }
        self.clear_entries();
        self.active.store(packed, Ordering::Release);
    }

    /// Stage an edit. Out-of-range indices are silently ignored. Marking
    /// under a new identity switches to it first (clearing older
    /// entries). `velocity == 0` is stored as the default velocity and
    /// `length == 0` as 1 — zero is never a valid stored value.
    pub fn mark(&self, at: PatternRef, track: u8, step: u8, slot: u8, note: u8, velocity: u8, length: u8) {
        let Some(cell) = self.cell(track, step, slot) else {
            return;
        };
        self.set_active(at);

        let entry = QuickstepEntry {
            note,
            velocity: if velocity == 0 { DEFAULT_VELOCITY } else { velocity },
            length: if length == 0 { 1 } else { length },
        };
        cell.store(pack_entry(entry), Ordering::Relaxed);
    }

    /// Consume a staged edit — exactly-once delivery.
    ///
    /// `None` when the supplied identity is not the active one, the
    /// indices are out of range, or the entry is not armed. On success
    /// the armed flag is cleared in the same atomic operation that reads
    /// the value.
    pub fn fetch(&self, at: PatternRef, track: u8, step: u8, slot: u8) -> Option<QuickstepEntry> {
        if self.active.load(Ordering::Acquire) != pack_ident(at) {
            return None;
        }
        let cell = self.cell(track, step, slot)?;
        let raw = cell.fetch_and(!ARMED_BIT, Ordering::Relaxed);
        if raw & ARMED_BIT == 0 {
            return None;
        }
        Some(unpack_entry(raw))
    }

    /// Disarm every slot of one track/step. Ignored when the identity
    /// does not match or the indices are out of range.
    pub fn disarm_step(&self, at: PatternRef, track: u8, step: u8) {
        if self.active.load(Ordering::Acquire) != pack_ident(at) {
            return;
        }
        let (Some(track), Some(step)) = (TrackId::new(track), StepId::new(step)) else {
            return;
        };
        for slot in SlotId::all() {
            self.cells[track.index()][step.index()][slot.index()]
                .fetch_and(!ARMED_BIT, Ordering::Relaxed);
        }
    }

    /// Number of armed entries (diagnostic; racy by nature).
    pub fn armed_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .filter(|cell| cell.load(Ordering::Relaxed) & ARMED_BIT != 0)
            .count()
    }

    fn cell(&self, track: u8, step: u8, slot: u8) -> Option<&AtomicU32> {
        let track = TrackId::new(track)?;
        let step = StepId::new(step)?;
        let slot = SlotId::new(slot)?;
        Some(&self.cells[track.index()][step.index()][slot.index()])
    }

    fn clear_entries(&self) {
        for cell in self.cells.iter().flatten().flatten() {
            cell.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for QuickstepCache {
    fn default() -> Self {
        Self::new()
    }
}
