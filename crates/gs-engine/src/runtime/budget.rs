//! Hot-partition size accounting.
//!
//! Everything the tick path touches every step must fit a fixed byte
//! budget. [`HotSnapshot`] itemizes those footprints from `size_of`, so
//! the numbers can never drift from the actual types, and a const
//! assertion refuses to compile the crate once the total crosses
//! [`HOT_BUDGET_MAX`].

use core::mem::size_of;
use core::sync::atomic::AtomicU8;

use gs_model::{StepView, TRACK_COUNT};

use crate::clock::{ClockStepInfo, StepClock};
use crate::quickstep::QuickstepCache;
use crate::runner::Runner;

/// Hard ceiling for the hot partition, in bytes.
pub const HOT_BUDGET_MAX: usize = 64 * 1024;

/// Byte footprint of each hot component, captured from the live types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HotSnapshot {
    /// Per-track step views staged while the runner queries the reader.
    pub reader_scratch: usize,
    /// The runner: transport, pending-note table, trace ring when compiled in.
    pub scheduler_core: usize,
    /// The step clock: divider state and observer registry.
    pub player_core: usize,
    /// The quickstep cell store the tick drains.
    pub rt_queues: usize,
    /// Per-tick step info plus the phase word.
    pub rt_scratch: usize,
}

impl HotSnapshot {
    pub const fn capture() -> Self {
        Self {
            reader_scratch: size_of::<StepView>() * TRACK_COUNT,
            scheduler_core: size_of::<Runner>(),
            player_core: size_of::<StepClock>(),
            rt_queues: size_of::<QuickstepCache>(),
            rt_scratch: size_of::<ClockStepInfo>() + size_of::<AtomicU8>(),
        }
    }

    pub const fn total(&self) -> usize {
        self.reader_scratch
            + self.scheduler_core
            + self.player_core
            + self.rt_queues
            + self.rt_scratch
    }
}

// Build gate: growing any hot type past the budget is a compile error.
const _: () = assert!(
    HotSnapshot::capture().total() <= HOT_BUDGET_MAX,
    "hot runtime footprint exceeds its budget"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_components() {
        let snap = HotSnapshot::capture();
        assert_eq!(
            snap.total(),
            snap.reader_scratch
                + snap.scheduler_core
                + snap.player_core
                + snap.rt_queues
                + snap.rt_scratch
        );
    }

    #[test]
    fn total_within_budget() {
        let snap = HotSnapshot::capture();
        assert!(
            snap.total() <= HOT_BUDGET_MAX,
            "hot total {} exceeds {}",
            snap.total(),
            HOT_BUDGET_MAX
        );
    }

    #[test]
    fn every_component_is_accounted() {
        let snap = HotSnapshot::capture();
        assert!(snap.reader_scratch > 0);
        assert!(snap.scheduler_core > 0);
        assert!(snap.player_core > 0);
        assert!(snap.rt_queues > 0);
        assert!(snap.rt_scratch > 0);
    }

    #[test]
    fn quickstep_store_dominates() {
        // The cell store is by far the largest hot component; if that
        // ever stops being true something grew unexpectedly.
        let snap = HotSnapshot::capture();
        assert!(snap.rt_queues > snap.scheduler_core);
        assert!(snap.rt_queues > snap.player_core);
    }
}
