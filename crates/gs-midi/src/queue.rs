//! Lock-free event queue between the tick context and the device side.
//!
//! The scheduler owns the producer half through the [`MidiSink`] trait
//! and never blocks: a full queue drops the event and counts it. The
//! device side drains the consumer half at its own pace.

use gs_model::MidiSink;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::traits::{MidiBackend, MidiError};

/// One scheduled MIDI event. Channels are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    AllNotesOff { channel: u8 },
}

/// Create a bounded queue pair: the sink half for the scheduler, the
/// drain half for the device thread. Capacity is fixed at creation; all
/// allocation happens here, none on push or pop.
pub fn midi_queue(capacity: usize) -> (QueueSink, QueueDrain) {
    let (producer, consumer) = HeapRb::<MidiEvent>::new(capacity).split();
    (
        QueueSink {
            producer,
            overruns: 0,
        },
        QueueDrain { consumer },
    )
}

/// Producer half; implements [`MidiSink`] for the tick path.
pub struct QueueSink {
    producer: HeapProd<MidiEvent>,
    overruns: u64,
}

impl QueueSink {
    /// Events dropped because the queue was full.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    fn push(&mut self, event: MidiEvent) {
        // Full queue: drop and count. The tick must not wait.
        if self.producer.try_push(event).is_err() {
            self.overruns += 1;
        }
    }
}

impl MidiSink for QueueSink {
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.push(MidiEvent::NoteOn {
            channel,
            note,
            velocity,
        });
    }

    fn note_off(&mut self, channel: u8, note: u8) {
        self.push(MidiEvent::NoteOff { channel, note });
    }

    fn all_notes_off(&mut self, channel: u8) {
        self.push(MidiEvent::AllNotesOff { channel });
    }
}

/// Consumer half, drained on the device side.
pub struct QueueDrain {
    consumer: HeapCons<MidiEvent>,
}

impl QueueDrain {
    /// Next queued event, if any.
    pub fn pop(&mut self) -> Option<MidiEvent> {
        self.consumer.try_pop()
    }

    /// Forward every queued event into a backend. Returns how many were
    /// sent; stops at the first device error, leaving later events
    /// queued.
    pub fn drain_into(&mut self, backend: &mut impl MidiBackend) -> Result<usize, MidiError> {
        let mut sent = 0;
        while let Some(event) = self.consumer.try_pop() {
            backend.send(event)?;
            sent += 1;
        }
        Ok(sent)
    }
}
