//! Headless controller for the gridstep sequencer.
//!
//! Owns the pattern bank, mute state, quickstep cache and tempo, and
//! drives the playback rig (runner plus step clock) either from a
//! spawned clock thread or synchronously for offline runs. The CLI and
//! the integration tests share this layer.

use std::mem::size_of;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use gs_engine::runtime::{phase, Cold, RtPhase};
use gs_engine::{QuickstepCache, Runner, StepClock};
use gs_midi::midi_queue;
use gs_model::{Pattern, PatternBank, PatternRef, SharedMuteMask, TrackId};

// Re-export common types so callers don't need the lower crates directly.
pub use gs_engine::runtime::{ColdStats, HotSnapshot};
#[cfg(feature = "rt-trace")]
pub use gs_engine::runtime::TraceEvent;
pub use gs_midi::{MidiEvent, QueueDrain};

/// Queue depth for live playback. The caller drains it; overruns are
/// counted on the sink side, never blocked on.
const LIVE_QUEUE_CAPACITY: usize = 1024;

/// Queue depth for offline runs, drained after every step.
const OFFLINE_QUEUE_CAPACITY: usize = 256;

/// Headless sequencer controller — owns a project and manages playback.
pub struct Controller {
    bank: Cold<PatternBank>,
    hold: Cold<Option<Pattern>>,
    mutes: SharedMuteMask,
    quickstep: Arc<QuickstepCache>,
    active: PatternRef,
    bpm: f32,
    playback: Option<PlaybackHandle>,
    #[cfg(feature = "rt-trace")]
    last_trace: Vec<TraceEvent>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    step: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
    active: Arc<AtomicU16>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            bank: Cold::new(PatternBank::new()),
            hold: Cold::new(None),
            mutes: SharedMuteMask::new(),
            quickstep: Arc::new(QuickstepCache::new()),
            active: PatternRef::default(),
            bpm: gs_engine::DEFAULT_BPM,
            playback: None,
            #[cfg(feature = "rt-trace")]
            last_trace: Vec::new(),
        }
    }

    // --- Project management ---

    pub fn bank(&self) -> &PatternBank {
        self.bank.view()
    }

    pub fn bank_mut(&mut self) -> &mut PatternBank {
        self.bank.view_mut()
    }

    pub fn insert_pattern(&mut self, at: PatternRef, pattern: Pattern) {
        self.bank.view_mut().insert(at, pattern);
    }

    /// Copy the active pattern into the hold slot. Returns false when
    /// the active ref addresses nothing.
    pub fn hold_active(&mut self) -> bool {
        let held = self.bank.view().get(self.active).cloned();
        let ok = held.is_some();
        *self.hold.view_mut() = held;
        ok
    }

    /// Take the held pattern out of the hold slot.
    pub fn take_held(&mut self) -> Option<Pattern> {
        self.hold.view_mut().take()
    }

    // --- Live controls ---

    /// Select the pattern to play. Applied by a running rig at its next
    /// step boundary; pending notes finish their countdowns unchanged.
    pub fn set_active_pattern(&mut self, at: PatternRef) {
        self.active = at;
        if let Some(pb) = &self.playback {
            pb.active.store(pack_ref(at), Ordering::Relaxed);
        }
    }

    pub fn active_pattern(&self) -> PatternRef {
        self.active
    }

    pub fn set_muted(&self, track: TrackId, muted: bool) {
        self.mutes.set(track, muted);
    }

    /// Capture-side handle to the quickstep cache; a running rig sees
    /// marks made through this immediately.
    pub fn quickstep(&self) -> &QuickstepCache {
        &self.quickstep
    }

    /// Tempo for the next run; a running rig keeps the tempo it started
    /// with.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm;
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    // --- Real-time playback ---

    /// Start the clock thread, stopping any previous run first. Returns
    /// the queue drain the caller feeds into a device backend; the
    /// transport-stop flush lands in the same queue when [`stop`] is
    /// called, so keep draining after stopping.
    ///
    /// [`stop`]: Controller::stop
    pub fn play(&mut self) -> QueueDrain {
        self.stop();

        let (sink, drain) = midi_queue(LIVE_QUEUE_CAPACITY);
        let stop_signal = Arc::new(AtomicBool::new(false));
        let step = Arc::new(AtomicU32::new(0));
        let running = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicU16::new(pack_ref(self.active)));

        let rig = Rig {
            bank: self.bank.view().clone(),
            mutes: self.mutes.clone(),
            quickstep: Arc::clone(&self.quickstep),
            runner: Runner::new(),
            clock: StepClock::new(self.bpm),
            sink,
        };

        let stop = stop_signal.clone();
        let step_out = step.clone();
        let running_out = running.clone();
        let active_in = active.clone();

        let thread = std::thread::spawn(move || {
            clock_thread(rig, stop, step_out, running_out, active_in);
        });

        self.playback = Some(PlaybackHandle {
            stop_signal,
            step,
            running,
            active,
            thread: Some(thread),
        });
        drain
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.running.load(Ordering::Relaxed))
    }

    /// Last step boundary the rig processed.
    pub fn step_position(&self) -> u32 {
        self.playback
            .as_ref()
            .map(|p| p.step.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    // --- Offline rendering ---

    /// Drive a fresh rig synchronously for `steps` step boundaries,
    /// without threads or timers, and return every emitted event tagged
    /// with its step index. The transport-stop flush is included at the
    /// end, tagged `steps`.
    pub fn run_offline(&mut self, steps: u32) -> Vec<(u32, MidiEvent)> {
        let (mut sink, mut drain) = midi_queue(OFFLINE_QUEUE_CAPACITY);
        let bank = self.bank.view().clone();
        let mut runner = Runner::new();
        runner.set_active_pattern(self.active);
        let mut clock = StepClock::new(self.bpm);
        let mut events = Vec::new();

        phase::set(RtPhase::Idle);
        runner.on_transport_play(&mut sink);
        clock.start();

        let mut now_us = 0u64;
        while clock.next_step() < steps {
            if let Some(info) = clock.on_midi_tick(now_us) {
                runner.on_clock_step(&info, &bank, &self.mutes, &self.quickstep, &mut sink);
                while let Some(event) = drain.pop() {
                    events.push((info.step_idx_abs, event));
                }
            }
            now_us += clock.tick_period_us();
        }

        runner.on_transport_stop(&mut sink);
        while let Some(event) = drain.pop() {
            events.push((steps, event));
        }

        #[cfg(feature = "rt-trace")]
        {
            self.last_trace = runner.trace().iter().copied().collect();
        }

        events
    }

    /// Tick-path trace ring of the last offline run.
    #[cfg(feature = "rt-trace")]
    pub fn last_trace(&self) -> &[TraceEvent] {
        &self.last_trace
    }

    // --- Memory accounting ---

    /// Hot-partition snapshot; its total is budget-checked at compile
    /// time in the engine.
    pub fn hot_snapshot(&self) -> HotSnapshot {
        HotSnapshot::capture()
    }

    /// Cold-partition footprint of everything this controller owns.
    pub fn cold_stats(&self) -> ColdStats {
        let bank = self.bank.view();
        let bytes_project = bank
            .refs()
            .filter_map(|at| bank.get(at))
            .map(|p| p.data_bytes())
            .sum();
        let bytes_bank_meta = bank.len() * size_of::<(PatternRef, Pattern)>();
        let bytes_hold_slots = self
            .hold
            .view()
            .as_ref()
            .map(|p| size_of::<Pattern>() + p.data_bytes())
            .unwrap_or(0);
        let bytes_ui_shadow =
            size_of::<AtomicU32>() + size_of::<AtomicU16>() + size_of::<AtomicBool>();

        ColdStats {
            bytes_project,
            bytes_bank_meta,
            bytes_hold_slots,
            bytes_ui_shadow,
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        // The clock thread loops until signalled; never leak it.
        self.stop();
    }
}

/// Everything one run needs, moved into the clock thread.
struct Rig {
    bank: PatternBank,
    mutes: SharedMuteMask,
    quickstep: Arc<QuickstepCache>,
    runner: Runner,
    clock: StepClock,
    sink: gs_midi::QueueSink,
}

fn clock_thread(
    mut rig: Rig,
    stop_signal: Arc<AtomicBool>,
    step: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
    active: Arc<AtomicU16>,
) {
    phase::set(RtPhase::Idle);
    rig.runner.on_transport_play(&mut rig.sink);
    rig.clock.start();
    running.store(true, Ordering::Relaxed);

    let tick_period = Duration::from_micros(rig.clock.tick_period_us());
    let mut now_us = 0u64;

    while !stop_signal.load(Ordering::Relaxed) {
        rig.runner
            .set_active_pattern(unpack_ref(active.load(Ordering::Relaxed)));
        if let Some(info) = rig.clock.on_midi_tick(now_us) {
            rig.runner
                .on_clock_step(&info, &rig.bank, &rig.mutes, &rig.quickstep, &mut rig.sink);
            step.store(info.step_idx_abs, Ordering::Relaxed);
        }
        now_us += rig.clock.tick_period_us();
        std::thread::sleep(tick_period);
    }

    rig.runner.on_transport_stop(&mut rig.sink);
    running.store(false, Ordering::Relaxed);
}

fn pack_ref(at: PatternRef) -> u16 {
    (at.bank as u16) << 8 | at.pattern as u16
}

fn unpack_ref(raw: u16) -> PatternRef {
    PatternRef::new((raw >> 8) as u8, raw as u8)
}
