//! MIDI output path for gridstep.
//!
//! The scheduler pushes events into a lock-free queue from the tick
//! context; the device side drains them into a midir port, or whatever
//! other [`MidiBackend`] the host wires up.

mod midir_backend;
mod queue;
mod traits;

pub use midir_backend::MidirOutput;
pub use queue::{midi_queue, MidiEvent, QueueDrain, QueueSink};
pub use traits::{MidiBackend, MidiError};
