//! The sequencer runner: step scheduling and MIDI emission.
//!
//! Converts absolute step positions from the clock into per-track
//! note-on/note-off pairs, tracking each in-flight note and its
//! remaining length in step units. Mute, missing pattern data, explicit
//! zero-velocity steps and transport stops all funnel into a single
//! cancellation primitive — abort — which silences a track's pending
//! note once and clears it, so no path can double-emit or leak a note.

use gs_model::{
    MidiSink, MuteQuery, PatternReader, PatternRef, SlotId, StepId, TrackId, STEPS_PER_TRACK,
};

use crate::clock::ClockStepInfo;
use crate::pending::PendingTable;
use crate::quickstep::QuickstepCache;
use crate::runtime::phase::TickGuard;
use crate::runtime::trace::TraceKind;
#[cfg(any(test, feature = "rt-trace"))]
use crate::runtime::trace::{TraceEvent, TraceRing};

/// MIDI channels swept by the stop safety net.
const MIDI_CHANNEL_COUNT: u8 = 16;

/// Transport state: whether clock steps advance the runner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transport {
    #[default]
    Stopped,
    Running,
}

/// Per-run scheduling state. Owns no collaborators: the reader, mute
/// query, quickstep cache and MIDI sink are passed into each call, so
/// the same runner can be driven live or offline.
pub struct Runner {
    transport: Transport,
    active: PatternRef,
    pending: PendingTable,
    #[cfg(any(test, feature = "rt-trace"))]
    trace: TraceRing,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            transport: Transport::Stopped,
            active: PatternRef::default(),
            pending: PendingTable::new(),
            #[cfg(any(test, feature = "rt-trace"))]
            trace: TraceRing::new(),
        }
    }

    /// Select the pattern played from the next step boundary on. Pure
    /// assignment: pending notes keep counting down unchanged.
    pub fn set_active_pattern(&mut self, at: PatternRef) {
        self.active = at;
    }

    pub fn active_pattern(&self) -> PatternRef {
        self.active
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_running(&self) -> bool {
        self.transport == Transport::Running
    }

    /// Read-only view of the in-flight note table.
    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// Enter `Running`, flushing any notes left over from a previous run
    /// first so a restart never inherits stale countdowns.
    pub fn on_transport_play(&mut self, midi: &mut impl MidiSink) {
        self.flush_pending(midi);
        self.transport = Transport::Running;
    }

    /// Enter `Stopped`. Flushes pending notes, then sweeps every channel
    /// with all-notes-off: the flush trusts the pending table, the sweep
    /// does not, so a note the bookkeeping lost still gets silenced.
    pub fn on_transport_stop(&mut self, midi: &mut impl MidiSink) {
        self.flush_pending(midi);
        self.transport = Transport::Stopped;
        for channel in 1..=MIDI_CHANNEL_COUNT {
            midi.all_notes_off(channel);
        }
    }

    /// Process one step boundary. No-op while stopped.
    pub fn on_clock_step(
        &mut self,
        info: &ClockStepInfo,
        reader: &impl PatternReader,
        mutes: &impl MuteQuery,
        quickstep: &QuickstepCache,
        midi: &mut impl MidiSink,
    ) {
        if self.transport != Transport::Running {
            return;
        }
        let _phase = TickGuard::enter();
        self.tick(info, reader, mutes, quickstep, midi);
    }

    fn tick(
        &mut self,
        info: &ClockStepInfo,
        reader: &impl PatternReader,
        mutes: &impl MuteQuery,
        quickstep: &QuickstepCache,
        midi: &mut impl MidiSink,
    ) {
        let step_abs = info.step_idx_abs;

        // Countdown pass for every track before any track's step pass:
        // a note ending on this boundary must be off before its
        // successor starts, whichever track it is on.
        for track in TrackId::all() {
            if let Some(note) = self.pending.step_down(track) {
                self.record(step_abs, track, note, TraceKind::Expiry);
                midi.note_off(track.channel(), note);
                self.record(step_abs, track, note, TraceKind::NoteOff);
            }
        }

        let step = StepId::from_abs(step_abs);
        for track in TrackId::all() {
            if mutes.is_muted(track) {
                // Muted tracks do not consume quickstep entries; the
                // staged edit stays armed for when the track comes back.
                self.abort(step_abs, track, midi);
                continue;
            }

            if let Some(entry) =
                quickstep.fetch(self.active, track.raw(), step.raw(), SlotId::PRIMARY.raw())
            {
                let length = entry.length as u16;
                self.trigger(step_abs, track, entry.note, entry.velocity, length, midi);
                continue;
            }

            match reader.step(self.active, track, step) {
                None => self.abort(step_abs, track, midi),
                Some(view) if !view.has_voice => {}
                Some(view) if view.velocity == 0 => self.abort(step_abs, track, midi),
                Some(view) => self.trigger(step_abs, track, view.note, view.velocity, view.length, midi),
            }
        }
    }

    /// Emit a note-on and arm its countdown, cutting whatever is still
    /// pending on the track first so one channel never carries two open
    /// notes.
    fn trigger(
        &mut self,
        step_abs: u32,
        track: TrackId,
        note: u8,
        velocity: u8,
        length: u16,
        midi: &mut impl MidiSink,
    ) {
        if let Some(old) = self.pending.take(track) {
            midi.note_off(track.channel(), old);
            self.record(step_abs, track, old, TraceKind::NoteOff);
        }
        midi.note_on(track.channel(), note, velocity);
        self.record(step_abs, track, note, TraceKind::NoteOn);

        let steps = length.clamp(1, STEPS_PER_TRACK as u16) as u8;
        self.pending.arm(track, note, steps);
    }

    /// Force-silence a track: one note-off for the pending note if there
    /// is one, then clear. Idempotent when nothing is pending.
    fn abort(&mut self, step_abs: u32, track: TrackId, midi: &mut impl MidiSink) {
        if let Some(note) = self.pending.take(track) {
            self.record(step_abs, track, note, TraceKind::Abort);
            midi.note_off(track.channel(), note);
            self.record(step_abs, track, note, TraceKind::NoteOff);
        }
    }

    fn flush_pending(&mut self, midi: &mut impl MidiSink) {
        for track in TrackId::all() {
            if let Some(note) = self.pending.take(track) {
                midi.note_off(track.channel(), note);
            }
        }
    }

    /// Tick-path event ring of this runner.
    #[cfg(any(test, feature = "rt-trace"))]
    pub fn trace(&self) -> &TraceRing {
        &self.trace
    }

    #[cfg(any(test, feature = "rt-trace"))]
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    #[cfg(any(test, feature = "rt-trace"))]
    fn record(&mut self, step_abs: u32, track: TrackId, note: u8, kind: TraceKind) {
        self.trace.record(TraceEvent {
            step_abs,
            track: track.raw(),
            slot: SlotId::PRIMARY.raw(),
            note,
            kind,
        });
    }

    #[cfg(not(any(test, feature = "rt-trace")))]
    #[inline(always)]
    fn record(&mut self, _step_abs: u32, _track: TrackId, _note: u8, _kind: TraceKind) {}
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockSource;
    use crate::runtime::phase;
    use gs_model::{MuteMask, Pattern, PatternBank, StepVoice};

    /// Recorded MIDI calls, in emission order.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Ev {
        On(u8, u8, u8),
        Off(u8, u8),
        AllOff(u8),
    }

    #[derive(Default)]
    struct Capture {
        events: Vec<Ev>,
    }

    impl MidiSink for Capture {
        fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
            self.events.push(Ev::On(channel, note, velocity));
        }
        fn note_off(&mut self, channel: u8, note: u8) {
            self.events.push(Ev::Off(channel, note));
        }
        fn all_notes_off(&mut self, channel: u8) {
            self.events.push(Ev::AllOff(channel));
        }
    }

    const AT: PatternRef = PatternRef::new(0, 0);

    fn track(raw: u8) -> TrackId {
        TrackId::new(raw).unwrap()
    }

    fn step(raw: u8) -> StepId {
        StepId::new(raw).unwrap()
    }

    fn info(step_abs: u32) -> ClockStepInfo {
        ClockStepInfo {
            step_idx_abs: step_abs,
            bpm: 120.0,
            now_us: 0,
            source: ClockSource::Internal,
        }
    }

    /// Bank holding one pattern with the given voices on one track.
    fn bank_with(track_raw: u8, voices: &[(u8, StepVoice)]) -> PatternBank {
        let mut pattern = Pattern::new("t");
        for (step_raw, voice) in voices {
            pattern.set_voice(track(track_raw), step(*step_raw), SlotId::PRIMARY, Some(*voice));
        }
        let mut bank = PatternBank::new();
        bank.insert(AT, pattern);
        bank
    }

    fn running_runner() -> (Runner, Capture) {
        let mut runner = Runner::new();
        runner.set_active_pattern(AT);
        let mut midi = Capture::default();
        runner.on_transport_play(&mut midi);
        (runner, midi)
    }

    fn drive(
        runner: &mut Runner,
        bank: &PatternBank,
        mutes: &MuteMask,
        cache: &QuickstepCache,
        midi: &mut Capture,
        steps: core::ops::Range<u32>,
    ) {
        for s in steps {
            runner.on_clock_step(&info(s), bank, mutes, cache, midi);
        }
    }

    #[test]
    fn note_off_follows_after_length_steps() {
        let _serial = phase::test_guard();
        let bank = bank_with(0, &[(0, StepVoice::new(60, 100, 4))]);
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..4);
        assert_eq!(midi.events, vec![Ev::On(1, 60, 100)], "no off before step 4");

        runner.on_clock_step(&info(4), &bank, &mutes, &cache, &mut midi);
        assert_eq!(midi.events, vec![Ev::On(1, 60, 100), Ev::Off(1, 60)]);
        assert_eq!(runner.pending().active_count(), 0);
    }

    #[test]
    fn stopped_runner_ignores_steps() {
        let _serial = phase::test_guard();
        let bank = bank_with(0, &[(0, StepVoice::new(60, 100, 1))]);
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let mut runner = Runner::new();
        runner.set_active_pattern(AT);
        let mut midi = Capture::default();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..8);
        assert!(midi.events.is_empty());
    }

    #[test]
    fn countdown_runs_before_step_pass() {
        let _serial = phase::test_guard();
        // Same note on consecutive steps, length 1: each boundary must
        // order the expiry off before the new on.
        let bank = bank_with(
            0,
            &[(0, StepVoice::new(60, 100, 1)), (1, StepVoice::new(60, 100, 1))],
        );
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..3);
        assert_eq!(
            midi.events,
            vec![
                Ev::On(1, 60, 100),
                Ev::Off(1, 60),
                Ev::On(1, 60, 100),
                Ev::Off(1, 60),
            ]
        );
    }

    #[test]
    fn retrigger_cuts_pending_note_first() {
        let _serial = phase::test_guard();
        // Step 0 rings for 2 steps; step 1 hits again, so the step pass
        // itself must cut the old note before the new on.
        let bank = bank_with(
            0,
            &[(0, StepVoice::new(60, 100, 2)), (1, StepVoice::new(62, 90, 1))],
        );
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..3);
        assert_eq!(
            midi.events,
            vec![
                Ev::On(1, 60, 100),
                Ev::Off(1, 60),
                Ev::On(1, 62, 90),
                Ev::Off(1, 62),
            ]
        );
    }

    #[test]
    fn mute_aborts_pending_note_once() {
        let _serial = phase::test_guard();
        let bank = bank_with(2, &[(0, StepVoice::new(60, 100, 8))]);
        let mut mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        runner.on_clock_step(&info(0), &bank, &mutes, &cache, &mut midi);
        assert_eq!(midi.events, vec![Ev::On(3, 60, 100)]);

        mutes.set(track(2), true);
        runner.on_clock_step(&info(1), &bank, &mutes, &cache, &mut midi);
        assert_eq!(
            midi.events,
            vec![Ev::On(3, 60, 100), Ev::Off(3, 60)],
            "mute cuts the note on the very next boundary"
        );
        assert_eq!(runner.pending().active_count(), 0);

        // Staying muted emits nothing further.
        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 2..6);
        assert_eq!(midi.events.len(), 2);
    }

    #[test]
    fn zero_velocity_step_aborts_instead_of_triggering() {
        let _serial = phase::test_guard();
        let bank = bank_with(
            0,
            &[(0, StepVoice::new(60, 100, 8)), (1, StepVoice::new(60, 0, 4))],
        );
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..4);
        assert_eq!(
            midi.events,
            vec![Ev::On(1, 60, 100), Ev::Off(1, 60)],
            "a zero-velocity step silences the track, it does not retrigger"
        );
        assert_eq!(runner.pending().active_count(), 0);
    }

    #[test]
    fn missing_pattern_aborts_pending_note() {
        let _serial = phase::test_guard();
        let bank = bank_with(1, &[(0, StepVoice::new(72, 100, 16))]);
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        runner.on_clock_step(&info(0), &bank, &mutes, &cache, &mut midi);
        runner.set_active_pattern(PatternRef::new(7, 7));
        runner.on_clock_step(&info(1), &bank, &mutes, &cache, &mut midi);

        assert_eq!(midi.events, vec![Ev::On(2, 72, 100), Ev::Off(2, 72)]);

        // Reader stays absent: nothing more, no repeat offs.
        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 2..5);
        assert_eq!(midi.events.len(), 2);
    }

    #[test]
    fn zero_length_is_clamped_to_one_step() {
        let _serial = phase::test_guard();
        let bank = bank_with(0, &[(0, StepVoice::new(60, 100, 0))]);
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..2);
        assert_eq!(midi.events, vec![Ev::On(1, 60, 100), Ev::Off(1, 60)]);
    }

    #[test]
    fn oversized_length_is_clamped_to_track_span() {
        let _serial = phase::test_guard();
        let bank = bank_with(0, &[(0, StepVoice::new(60, 100, 1000))]);
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..64);
        assert_eq!(midi.events.len(), 1, "still ringing through step 63");

        runner.on_clock_step(&info(64), &bank, &mutes, &cache, &mut midi);
        // Step 64 wraps to local step 0, so the expiry off lands right
        // before the retrigger of the same voice.
        assert_eq!(
            midi.events,
            vec![Ev::On(1, 60, 100), Ev::Off(1, 60), Ev::On(1, 60, 100)]
        );
    }

    #[test]
    fn transport_stop_flushes_then_sweeps_every_channel() {
        let _serial = phase::test_guard();
        let bank = bank_with(5, &[(0, StepVoice::new(70, 100, 32))]);
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        runner.on_clock_step(&info(0), &bank, &mutes, &cache, &mut midi);
        midi.events.clear();
        runner.on_transport_stop(&mut midi);

        let mut expected = vec![Ev::Off(6, 70)];
        expected.extend((1..=16).map(Ev::AllOff));
        assert_eq!(midi.events, expected);
        assert!(!runner.is_running());
        assert_eq!(runner.pending().active_count(), 0);

        // Stopping again only sweeps; there is nothing left to flush.
        midi.events.clear();
        runner.on_transport_stop(&mut midi);
        assert_eq!(midi.events.len(), 16);
    }

    #[test]
    fn play_flushes_stale_notes_from_previous_run() {
        let _serial = phase::test_guard();
        let bank = bank_with(0, &[(0, StepVoice::new(60, 100, 32))]);
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        runner.on_clock_step(&info(0), &bank, &mutes, &cache, &mut midi);
        midi.events.clear();

        runner.on_transport_play(&mut midi);
        assert_eq!(midi.events, vec![Ev::Off(1, 60)]);
        assert!(runner.is_running());
    }

    #[test]
    fn quickstep_entry_overrides_reader_for_one_lap() {
        let _serial = phase::test_guard();
        let bank = bank_with(3, &[(2, StepVoice::new(60, 100, 1))]);
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        cache.mark(AT, 3, 2, 0, 64, 120, 1);
        let (mut runner, mut midi) = running_runner();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..4);
        assert_eq!(
            midi.events,
            vec![Ev::On(4, 64, 120), Ev::Off(4, 64)],
            "the staged edit plays instead of the stored voice"
        );
        assert_eq!(cache.armed_count(), 0);

        // Next lap over the same step falls back to the reader.
        midi.events.clear();
        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 64..68);
        assert_eq!(midi.events, vec![Ev::On(4, 60, 100), Ev::Off(4, 60)]);
    }

    #[test]
    fn muted_track_leaves_quickstep_entry_armed() {
        let _serial = phase::test_guard();
        let bank = bank_with(0, &[]);
        let mut mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        cache.mark(AT, 0, 0, 0, 65, 100, 1);
        let (mut runner, mut midi) = running_runner();

        mutes.set(track(0), true);
        runner.on_clock_step(&info(0), &bank, &mutes, &cache, &mut midi);
        assert!(midi.events.is_empty());
        assert_eq!(cache.armed_count(), 1, "mute must not consume the edit");

        mutes.set(track(0), false);
        runner.on_clock_step(&info(64), &bank, &mutes, &cache, &mut midi);
        assert_eq!(midi.events, vec![Ev::On(1, 65, 100)]);
        assert_eq!(cache.armed_count(), 0);
    }

    #[test]
    fn trace_records_expiry_off_on_sequence() {
        let _serial = phase::test_guard();
        let bank = bank_with(
            0,
            &[(0, StepVoice::new(60, 100, 1)), (1, StepVoice::new(60, 100, 1))],
        );
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..3);

        let kinds: Vec<(u32, TraceKind)> =
            runner.trace().iter().map(|e| (e.step_abs, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (0, TraceKind::NoteOn),
                (1, TraceKind::Expiry),
                (1, TraceKind::NoteOff),
                (1, TraceKind::NoteOn),
                (2, TraceKind::Expiry),
                (2, TraceKind::NoteOff),
            ]
        );
    }

    #[test]
    fn trace_records_retrigger_off_without_expiry() {
        let _serial = phase::test_guard();
        let bank = bank_with(
            0,
            &[(0, StepVoice::new(60, 100, 2)), (1, StepVoice::new(62, 90, 1))],
        );
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        drive(&mut runner, &bank, &mutes, &cache, &mut midi, 0..2);

        let kinds: Vec<TraceKind> = runner.trace().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![TraceKind::NoteOn, TraceKind::NoteOff, TraceKind::NoteOn],
            "a retrigger cut is an off without a preceding expiry"
        );
    }

    #[test]
    fn trace_records_abort_on_mute() {
        let _serial = phase::test_guard();
        let bank = bank_with(4, &[(0, StepVoice::new(60, 100, 8))]);
        let mut mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        runner.on_clock_step(&info(0), &bank, &mutes, &cache, &mut midi);
        mutes.set(track(4), true);
        runner.on_clock_step(&info(1), &bank, &mutes, &cache, &mut midi);

        let kinds: Vec<TraceKind> = runner.trace().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![TraceKind::NoteOn, TraceKind::Abort, TraceKind::NoteOff]
        );
        assert_eq!(runner.trace().recent().unwrap().track, 4);
    }

    #[test]
    fn tick_path_touches_no_cold_data() {
        let _serial = phase::test_guard();
        phase::set(crate::runtime::RtPhase::Idle);
        crate::runtime::cold::reset_cold_calls();

        let cold_bank =
            crate::runtime::Cold::new(bank_with(0, &[(0, StepVoice::new(60, 100, 2))]));
        let mutes = MuteMask::none();
        let cache = QuickstepCache::new();
        let (mut runner, mut midi) = running_runner();

        // Viewed once between ticks; the tick loop works off the borrow
        // without going back through the cold accessor.
        let bank = cold_bank.view();
        drive(&mut runner, bank, &mutes, &cache, &mut midi, 0..16);

        assert_eq!(crate::runtime::cold::cold_calls_in_tick(), 0);
        assert!(!midi.events.is_empty());
    }
}
