//! Diagnostic trace ring for tick-path events.
//!
//! A fixed-capacity ring that records what the runner emitted and why,
//! overwriting the oldest entry once full. Pure observability: nothing
//! in the control path ever reads it back.

use heapless::HistoryBuffer;

/// Entries the ring holds before it starts overwriting the oldest.
pub const TRACE_CAPACITY: usize = 256;

/// What a trace entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TraceKind {
    /// A pending note's countdown reached zero.
    Expiry = 1,
    /// A note-off was emitted.
    NoteOff = 2,
    /// A note-on was emitted.
    NoteOn = 3,
    /// A track was force-silenced while a note was pending.
    Abort = 4,
}

/// One tick-path event: where it happened and what it was.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    pub step_abs: u32,
    pub track: u8,
    pub slot: u8,
    pub note: u8,
    pub kind: TraceKind,
}

/// Fixed-capacity event ring, oldest entry overwritten first.
pub struct TraceRing {
    buf: HistoryBuffer<TraceEvent, TRACE_CAPACITY>,
}

impl TraceRing {
    pub fn new() -> Self {
        Self {
            buf: HistoryBuffer::new(),
        }
    }

    pub fn record(&mut self, event: TraceEvent) {
        self.buf.write(event);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.len() == 0
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TraceEvent> {
        self.buf.oldest_ordered()
    }

    /// The most recently recorded entry.
    pub fn recent(&self) -> Option<&TraceEvent> {
        self.buf.recent()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for TraceRing {
    fn default() -> Self {
        Self::new()
    }
}
