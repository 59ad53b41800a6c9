//! Unscoped capture cache for the recorder path.
//!
//! Same at-most-once contract as the quickstep store, minus the pattern
//! identity: entries are keyed by (track, step, slot) alone and survive
//! pattern switches. Values are stored verbatim — the recorder decides
//! what a zero means before it marks. Single-context, `&mut self`
//! discipline; the cross-context variant lives in [`crate::quickstep`].

use gs_model::{SLOTS_PER_STEP, STEPS_PER_TRACK, TRACK_COUNT};

/// One captured voice, exactly as marked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureEntry {
    pub note: u8,
    pub velocity: u8,
    pub length: u8,
}

#[derive(Clone, Copy)]
struct Cell {
    entry: CaptureEntry,
    armed: bool,
}

impl Cell {
    const EMPTY: Self = Self {
        entry: CaptureEntry {
            note: 0,
            velocity: 0,
            length: 0,
        },
        armed: false,
    };
}

/// Fixed grid of capture cells covering every (track, step, slot).
pub struct CaptureCache {
    cells: [[[Cell; SLOTS_PER_STEP]; STEPS_PER_TRACK]; TRACK_COUNT],
}

impl CaptureCache {
    pub const fn new() -> Self {
        const SLOTS: [Cell; SLOTS_PER_STEP] = [Cell::EMPTY; SLOTS_PER_STEP];
        const STEPS: [[Cell; SLOTS_PER_STEP]; STEPS_PER_TRACK] = [SLOTS; STEPS_PER_TRACK];
        Self {
            cells: [STEPS; TRACK_COUNT],
        }
    }

    /// Stage a voice at the addressed cell, overwriting whatever was
    /// there. Out-of-range coordinates are ignored.
    pub fn mark(&mut self, track: u8, step: u8, slot: u8, note: u8, velocity: u8, length: u8) {
        if let Some(cell) = self.cell_mut(track, step, slot) {
            cell.entry = CaptureEntry {
                note,
                velocity,
                length,
            };
            cell.armed = true;
        }
    }

    /// Drop a staged entry without consuming it.
    pub fn invalidate(&mut self, track: u8, step: u8, slot: u8) {
        if let Some(cell) = self.cell_mut(track, step, slot) {
            cell.armed = false;
        }
    }

    /// Take the staged entry, if one is armed. A second consume of the
    /// same cell returns `None` until the next mark.
    pub fn consume(&mut self, track: u8, step: u8, slot: u8) -> Option<CaptureEntry> {
        let cell = self.cell_mut(track, step, slot)?;
        if !cell.armed {
            return None;
        }
        cell.armed = false;
        Some(cell.entry)
    }

    /// Whether the addressed cell is currently armed.
    pub fn is_armed(&self, track: u8, step: u8, slot: u8) -> bool {
        self.cell(track, step, slot).is_some_and(|c| c.armed)
    }

    /// Number of armed cells, for diagnostics.
    pub fn armed_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .filter(|c| c.armed)
            .count()
    }

    /// Disarm everything.
    pub fn reset(&mut self) {
        for cell in self.cells.iter_mut().flatten().flatten() {
            cell.armed = false;
        }
    }

    fn cell(&self, track: u8, step: u8, slot: u8) -> Option<&Cell> {
        if !Self::in_range(track, step, slot) {
            return None;
        }
        Some(&self.cells[track as usize][step as usize][slot as usize])
    }

    fn cell_mut(&mut self, track: u8, step: u8, slot: u8) -> Option<&mut Cell> {
        if !Self::in_range(track, step, slot) {
            return None;
        }
        Some(&mut self.cells[track as usize][step as usize][slot as usize])
    }

    fn in_range(track: u8, step: u8, slot: u8) -> bool {
        (track as usize) < TRACK_COUNT
            && (step as usize) < STEPS_PER_TRACK
            && (slot as usize) < SLOTS_PER_STEP
    }
}

impl Default for CaptureCache {
    fn default() -> Self {
        Self::new()
    }
}
