//! Backend trait and error type for MIDI output devices.

use std::error::Error;
use std::fmt;

use crate::queue::MidiEvent;

/// Error type for MIDI device operations.
#[derive(Debug)]
pub enum MidiError {
    /// Failed to initialize the MIDI client
    PortInit(String),
    /// Failed to connect to an output port
    Connect(String),
    /// Failed to send a message
    Send(String),
    /// No matching output port
    NoPort,
}

impl fmt::Display for MidiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiError::PortInit(msg) => write!(f, "MIDI init failed: {}", msg),
            MidiError::Connect(msg) => write!(f, "MIDI connect failed: {}", msg),
            MidiError::Send(msg) => write!(f, "MIDI send failed: {}", msg),
            MidiError::NoPort => write!(f, "no matching MIDI output port"),
        }
    }
}

impl Error for MidiError {}

/// An output device events are forwarded to, one at a time, in order.
pub trait MidiBackend {
    fn send(&mut self, event: MidiEvent) -> Result<(), MidiError>;
}
