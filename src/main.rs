//! gridstep CLI — a demo sequencer project played headless.
//!
//! Usage:
//!   gridstep [--steps N] [--bpm F] [--trace]
//!   gridstep --midi [PORT] [--steps N] [--bpm F]
//!   gridstep --list-ports
//!
//! Without `--midi` the run is offline and every event prints to stdout;
//! with it, the event queue drains into the named (or first) output port.

use gs_host::{Controller, MidiEvent};
use gs_midi::MidirOutput;
use gs_model::{Pattern, PatternRef, SlotId, StepId, StepVoice, TrackId};
use std::io::Write;
use std::{env, time::Duration};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--list-ports") {
        list_ports();
        return;
    }

    let steps: u32 = args
        .iter()
        .position(|a| a == "--steps")
        .and_then(|i| args.get(i + 1))
        .map(|v| {
            v.parse().unwrap_or_else(|_| {
                eprintln!("--steps expects a number, got '{}'", v);
                std::process::exit(1);
            })
        })
        .unwrap_or(32);

    let bpm: f32 = args
        .iter()
        .position(|a| a == "--bpm")
        .and_then(|i| args.get(i + 1))
        .map(|v| {
            v.parse().unwrap_or_else(|_| {
                eprintln!("--bpm expects a number, got '{}'", v);
                std::process::exit(1);
            })
        })
        .unwrap_or(120.0);

    let midi = args.iter().position(|a| a == "--midi");
    let port = midi
        .and_then(|i| args.get(i + 1))
        .filter(|v| !v.starts_with("--"))
        .cloned();

    let mut ctrl = Controller::new();
    ctrl.set_bpm(bpm);
    build_demo_project(&mut ctrl);

    if let Some(pattern) = ctrl.bank().get(ctrl.active_pattern()) {
        let busy_tracks = TrackId::all().filter(|t| pattern.hit_count(*t) > 0).count();
        println!("Pattern:  {}", pattern.name.as_str());
        println!("Tracks:   {} with voices", busy_tracks);
    }
    println!("Tempo:    {:.0} BPM", bpm);
    println!("Steps:    {}", steps);
    println!();

    match midi {
        Some(_) => play_live(&mut ctrl, steps, port.as_deref()),
        None => run_offline(&mut ctrl, steps, args.iter().any(|a| a == "--trace")),
    }
}

/// Four-on-the-floor kick, offbeat hats, a sparse bass figure.
fn build_demo_project(ctrl: &mut Controller) {
    let at = PatternRef::new(0, 0);
    let mut pattern = Pattern::new("demo");

    for step in (0..64).step_by(4) {
        put(&mut pattern, 0, step as u8, StepVoice::new(36, 110, 1));
    }
    for step in (2..64).step_by(4) {
        put(&mut pattern, 1, step as u8, StepVoice::new(42, 70, 1));
    }
    for bar in 0..4u8 {
        for (step, note) in [(0u8, 40u8), (6, 43), (10, 45), (12, 40)] {
            put(&mut pattern, 2, bar * 16 + step, StepVoice::new(note, 90, 2));
        }
    }

    ctrl.insert_pattern(at, pattern);
    ctrl.set_active_pattern(at);
}

fn put(pattern: &mut Pattern, track: u8, step: u8, voice: StepVoice) {
    let (Some(track), Some(step)) = (TrackId::new(track), StepId::new(step)) else {
        return;
    };
    pattern.set_voice(track, step, SlotId::PRIMARY, Some(voice));
}

fn list_ports() {
    let ports = MidirOutput::list_ports();
    if ports.is_empty() {
        println!("No MIDI output ports.");
        return;
    }
    for (index, name) in ports.iter().enumerate() {
        println!("{}: {}", index, name);
    }
}

fn run_offline(ctrl: &mut Controller, steps: u32, trace: bool) {
    let events = ctrl.run_offline(steps);
    for (step, event) in &events {
        println!("{:4}  {}", step, describe(*event));
    }
    println!();
    println!("{} events.", events.len());

    if trace {
        print_trace(ctrl);
    }
}

fn describe(event: MidiEvent) -> String {
    match event {
        MidiEvent::NoteOn {
            channel,
            note,
            velocity,
        } => format!("on   ch{:02} note {:3} vel {:3}", channel, note, velocity),
        MidiEvent::NoteOff { channel, note } => {
            format!("off  ch{:02} note {:3}", channel, note)
        }
        MidiEvent::AllNotesOff { channel } => format!("all-off ch{:02}", channel),
    }
}

#[cfg(feature = "rt-trace")]
fn print_trace(ctrl: &Controller) {
    println!();
    println!("trace ring ({} entries):", ctrl.last_trace().len());
    for entry in ctrl.last_trace() {
        println!(
            "  step {:4} trk {:2} note {:3} {:?}",
            entry.step_abs, entry.track, entry.note, entry.kind
        );
    }
}

#[cfg(not(feature = "rt-trace"))]
fn print_trace(_ctrl: &Controller) {
    eprintln!("--trace needs the rt-trace feature (cargo run --features rt-trace)");
}

fn play_live(ctrl: &mut Controller, steps: u32, port: Option<&str>) {
    let mut backend = match port {
        Some(needle) => MidirOutput::connect_by_name(needle),
        None => MidirOutput::connect_by_index(0),
    }
    .unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    println!("Playing to '{}'...", backend.port_name());
    let mut drain = ctrl.play();

    while ctrl.is_playing() && ctrl.step_position() + 1 < steps {
        if let Err(e) = drain.drain_into(&mut backend) {
            eprintln!("\n{}", e);
            break;
        }
        print!("\rStep: {:4}", ctrl.step_position());
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(10));
    }

    ctrl.stop();
    let _ = drain.drain_into(&mut backend);
    println!("\rDone.      ");
}
