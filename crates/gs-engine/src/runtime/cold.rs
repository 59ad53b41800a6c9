//! Cold-partition accounting and the guarded accessor.
//!
//! Cold data is everything the tick never needs: the stored project,
//! bank bookkeeping, hold buffers, UI mirrors. [`Cold`] wraps such a
//! value; in checked builds every access while the phase word reads
//! `Tick` bumps a process-wide counter that tests assert on. Production
//! builds compile the check out entirely.

#[cfg(any(test, feature = "rt-checks"))]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(any(test, feature = "rt-checks"))]
use super::phase::{self, RtPhase};

/// Advisory ceiling for the cold partition, in bytes. Reporting only —
/// nothing enforces it.
pub const COLD_BUDGET_HINT: usize = 96 * 1024;

#[cfg(any(test, feature = "rt-checks"))]
static COLD_CALLS_IN_TICK: AtomicU32 = AtomicU32::new(0);

/// How many cold accesses happened while the phase was `Tick`.
#[cfg(any(test, feature = "rt-checks"))]
pub fn cold_calls_in_tick() -> u32 {
    COLD_CALLS_IN_TICK.load(Ordering::Relaxed)
}

#[cfg(any(test, feature = "rt-checks"))]
pub fn reset_cold_calls() {
    COLD_CALLS_IN_TICK.store(0, Ordering::Relaxed);
}

/// A value that must only be touched outside the tick.
pub struct Cold<T> {
    value: T,
}

impl<T> Cold<T> {
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    pub fn view(&self) -> &T {
        Self::note_access();
        &self.value
    }

    pub fn view_mut(&mut self) -> &mut T {
        Self::note_access();
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    #[cfg(any(test, feature = "rt-checks"))]
    fn note_access() {
        if phase::get() == RtPhase::Tick {
            COLD_CALLS_IN_TICK.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[cfg(not(any(test, feature = "rt-checks")))]
    #[inline(always)]
    fn note_access() {}
}

/// Byte footprint of each cold domain. Diagnostic only: the host fills
/// this from whatever it currently owns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColdStats {
    /// Step data of every stored pattern.
    pub bytes_project: usize,
    /// Bank slot bookkeeping: refs, names, per-slot headers.
    pub bytes_bank_meta: usize,
    /// Hold (clipboard) buffers.
    pub bytes_hold_slots: usize,
    /// State mirrored for front ends.
    pub bytes_ui_shadow: usize,
}

impl ColdStats {
    pub fn total(&self) -> usize {
        self.bytes_project + self.bytes_bank_meta + self.bytes_hold_slots + self.bytes_ui_shadow
    }

    pub fn over_hint(&self) -> bool {
        self.total() > COLD_BUDGET_HINT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::phase::{test_guard, TickGuard};

    #[test]
    fn view_outside_tick_is_not_counted() {
        let _serial = test_guard();
        phase::set(RtPhase::Idle);
        reset_cold_calls();

        let cold = Cold::new(42u32);
        assert_eq!(*cold.view(), 42);
        assert_eq!(cold_calls_in_tick(), 0);
    }

    #[test]
    fn view_during_tick_is_counted() {
        let _serial = test_guard();
        phase::set(RtPhase::Idle);
        reset_cold_calls();

        let mut cold = Cold::new([0u8; 16]);
        {
            let _tick = TickGuard::enter();
            let _ = cold.view();
            let _ = cold.view_mut();
        }
        assert_eq!(cold_calls_in_tick(), 2);

        // Back out of the tick, accesses are free again.
        let _ = cold.view();
        assert_eq!(cold_calls_in_tick(), 2);
    }

    #[test]
    fn into_inner_returns_value() {
        let cold = Cold::new(String::from("bank"));
        assert_eq!(cold.into_inner(), "bank");
    }

    #[test]
    fn stats_total_sums_domains() {
        let stats = ColdStats {
            bytes_project: 1000,
            bytes_bank_meta: 200,
            bytes_hold_slots: 50,
            bytes_ui_shadow: 8,
        };
        assert_eq!(stats.total(), 1258);
        assert!(!stats.over_hint());
    }

    #[test]
    fn over_hint_flags_large_partitions() {
        let stats = ColdStats {
            bytes_project: COLD_BUDGET_HINT + 1,
            ..ColdStats::default()
        };
        assert!(stats.over_hint());
    }
}
