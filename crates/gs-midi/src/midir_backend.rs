//! midir-based MIDI output backend.

use midir::{MidiOutput, MidiOutputConnection};

use crate::queue::MidiEvent;
use crate::traits::{MidiBackend, MidiError};

const CLIENT_NAME: &str = "gridstep";

/// All Notes Off controller number.
const CC_ALL_NOTES_OFF: u8 = 123;

/// A connected MIDI output port.
pub struct MidirOutput {
    conn: MidiOutputConnection,
    port_name: String,
}

impl MidirOutput {
    /// Names of every available output port, in index order.
    pub fn list_ports() -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(out) = MidiOutput::new(CLIENT_NAME) {
            for port in out.ports() {
                if let Ok(name) = out.port_name(&port) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Connect to the output port at `index`, as listed by
    /// [`MidirOutput::list_ports`].
    pub fn connect_by_index(index: usize) -> Result<Self, MidiError> {
        let out = MidiOutput::new(CLIENT_NAME).map_err(|e| MidiError::PortInit(e.to_string()))?;
        let ports = out.ports();
        let port = ports.get(index).ok_or(MidiError::NoPort)?;
        let port_name = out
            .port_name(port)
            .unwrap_or_else(|_| format!("port {}", index));
        let conn = out
            .connect(port, CLIENT_NAME)
            .map_err(|e| MidiError::Connect(e.to_string()))?;
        Ok(Self { conn, port_name })
    }

    /// Connect to the first output port whose name contains `needle`.
    pub fn connect_by_name(needle: &str) -> Result<Self, MidiError> {
        let out = MidiOutput::new(CLIENT_NAME).map_err(|e| MidiError::PortInit(e.to_string()))?;
        let ports = out.ports();
        let found = ports.iter().find_map(|port| {
            out.port_name(port)
                .ok()
                .filter(|name| name.contains(needle))
                .map(|name| (port, name))
        });
        let (port, port_name) = found.ok_or(MidiError::NoPort)?;
        let conn = out
            .connect(port, CLIENT_NAME)
            .map_err(|e| MidiError::Connect(e.to_string()))?;
        Ok(Self { conn, port_name })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiBackend for MidirOutput {
    fn send(&mut self, event: MidiEvent) -> Result<(), MidiError> {
        self.conn
            .send(&message_bytes(event))
            .map_err(|e| MidiError::Send(e.to_string()))
    }
}

/// Encode an event as a 3-byte channel message. The 1-based channel
/// maps onto the status byte's 0-based nibble.
fn message_bytes(event: MidiEvent) -> [u8; 3] {
    match event {
        MidiEvent::NoteOn {
            channel,
            note,
            velocity,
        } => [0x90 | channel_nibble(channel), note & 0x7F, velocity & 0x7F],
        MidiEvent::NoteOff { channel, note } => [0x80 | channel_nibble(channel), note & 0x7F, 0],
        MidiEvent::AllNotesOff { channel } => {
            [0xB0 | channel_nibble(channel), CC_ALL_NOTES_OFF, 0]
        }
    }
}

fn channel_nibble(channel: u8) -> u8 {
    channel.clamp(1, 16) - 1
}
