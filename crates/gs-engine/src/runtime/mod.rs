//! Hot/cold runtime discipline: phase tracking, size budgets, tracing.
//!
//! The tick path owns a small, fixed hot partition whose byte total is
//! checked at compile time; everything else is cold and only touched
//! between ticks, with a debug-only counter to catch violations.

pub mod budget;
pub mod cold;
pub mod phase;
pub mod trace;

pub use budget::{HotSnapshot, HOT_BUDGET_MAX};
pub use cold::{Cold, ColdStats, COLD_BUDGET_HINT};
pub use phase::{RtPhase, TickGuard};
pub use trace::{TraceEvent, TraceKind, TraceRing, TRACE_CAPACITY};
