//! Track mute state: a plain bitmask and a shared atomic variant.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU16, Ordering};

use crate::ids::TrackId;
use crate::traits::MuteQuery;

/// Mute flags for all 16 tracks, one bit per track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MuteMask(u16);

impl MuteMask {
    pub const fn none() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn set(&mut self, track: TrackId, muted: bool) {
        let bit = 1u16 << track.index();
        if muted {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    pub const fn is_muted(self, track: TrackId) -> bool {
        self.0 & (1u16 << track.index()) != 0
    }

    pub fn clear_all(&mut self) {
        self.0 = 0;
    }

    pub const fn muted_count(self) -> u32 {
        self.0.count_ones()
    }
}

impl MuteQuery for MuteMask {
    fn is_muted(&self, track: TrackId) -> bool {
        MuteMask::is_muted(*self, track)
    }
}

/// A mute mask shared between the control context and the tick context.
///
/// The control side writes with read-modify-write atomics; the tick side
/// reads one relaxed load per query. Clones share the same mask.
#[derive(Clone, Debug, Default)]
pub struct SharedMuteMask {
    bits: Arc<AtomicU16>,
}

impl SharedMuteMask {
    pub fn new() -> Self {
        Self { bits: Arc::new(AtomicU16::new(0)) }
    }

    pub fn set(&self, track: TrackId, muted: bool) {
        let bit = 1u16 << track.index();
        if muted {
            self.bits.fetch_or(bit, Ordering::Relaxed);
        } else {
            self.bits.fetch_and(!bit, Ordering::Relaxed);
        }
    }

    /// Point-in-time copy of the whole mask.
    pub fn snapshot(&self) -> MuteMask {
        MuteMask::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl MuteQuery for SharedMuteMask {
    fn is_muted(&self, track: TrackId) -> bool {
        self.bits.load(Ordering::Relaxed) & (1u16 << track.index()) != 0
    }
}
