//! Real-time phase tracking.
//!
//! One process-wide phase word records where execution currently is
//! relative to the tick path. The tick context is the only writer: it
//! enters [`RtPhase::Tick`] through a [`TickGuard`] and restores the
//! previous phase when the guard drops. Everything else only reads —
//! the cold-data accessor consults the phase to flag tick-path touches
//! of tick-exempt memory in checked builds.

use core::sync::atomic::{AtomicU8, Ordering};

/// Execution phase relative to the clock-driven tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RtPhase {
    /// Host setup still in progress; nothing is ticking yet.
    Boot = 0,
    /// Between ticks.
    Idle = 1,
    /// Inside the step-processing body.
    Tick = 2,
}

static PHASE: AtomicU8 = AtomicU8::new(RtPhase::Boot as u8);

/// Current phase.
pub fn get() -> RtPhase {
    match PHASE.load(Ordering::Relaxed) {
        0 => RtPhase::Boot,
        1 => RtPhase::Idle,
        _ => RtPhase::Tick,
    }
}

/// Set the phase. Single-writer: the tick context (or the host, before
/// the first tick) owns this word; concurrent writers violate the
/// contract and make the checked-build diagnostics meaningless.
pub fn set(phase: RtPhase) {
    PHASE.store(phase as u8, Ordering::Relaxed);
}

/// RAII marker for the tick body: enters `Tick` on construction and
/// restores the previous phase on drop, so early returns and panics
/// cannot leave the word stuck.
pub struct TickGuard {
    previous: RtPhase,
}

impl TickGuard {
    pub fn enter() -> Self {
        let previous = get();
        set(RtPhase::Tick);
        Self { previous }
    }
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        set(self.previous);
    }
}

/// Serializes unit tests that manipulate the process-wide phase word.
#[cfg(test)]
pub(crate) fn test_guard() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
