//! Allocation-free tick path tests.
//!
//! These tests verify that the runner's per-step work does not allocate
//! once playback is set up: a dense worst-case pattern is driven for a
//! full lap with every tick inside the no-alloc scope.
//!
//! Just run `cargo test` — no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use gs_engine::{QuickstepCache, Runner, StepClock};
use gs_midi::midi_queue;
use gs_model::{MuteMask, Pattern, PatternBank, PatternRef, SlotId, StepId, StepVoice, TrackId};

const AT: PatternRef = PatternRef::new(0, 0);

/// A voice on the primary slot of every step of every track, the worst
/// case the tick loop can meet.
fn dense_bank() -> PatternBank {
    let mut pattern = Pattern::new("dense");
    for track in TrackId::all() {
        for step in StepId::all() {
            pattern.set_voice(track, step, SlotId::PRIMARY, Some(StepVoice::new(60, 100, 2)));
        }
    }
    let mut bank = PatternBank::new();
    bank.insert(AT, pattern);
    bank
}

#[test]
fn tick_loop_is_alloc_free() {
    let bank = dense_bank();
    let mutes = MuteMask::none();
    let cache = QuickstepCache::new();
    cache.set_active(AT);
    let (mut sink, mut drain) = midi_queue(8192);

    let mut runner = Runner::new();
    runner.set_active_pattern(AT);
    let mut clock = StepClock::new(250.0);

    runner.on_transport_play(&mut sink);
    clock.start();

    let tick_us = clock.tick_period_us();
    let mut now_us = 0u64;

    assert_no_alloc(|| {
        for _ in 0..(64 * 6) {
            if let Some(info) = clock.on_midi_tick(now_us) {
                runner.on_clock_step(&info, &bank, &mutes, &cache, &mut sink);
            }
            now_us += tick_us;
        }
    });

    runner.on_transport_stop(&mut sink);

    let mut forwarded = 0usize;
    while drain.pop().is_some() {
        forwarded += 1;
    }
    assert!(forwarded > 64, "dense pattern should emit a full stream");
    assert_eq!(sink.overruns(), 0);
}

#[test]
fn quickstep_mark_and_fetch_are_alloc_free() {
    let cache = QuickstepCache::new();
    cache.set_active(AT);

    assert_no_alloc(|| {
        for step in 0..64u8 {
            cache.mark(AT, 0, step, 0, 60, 100, 1);
        }
        for step in 0..64u8 {
            assert!(cache.fetch(AT, 0, step, 0).is_some());
        }
        assert_eq!(cache.armed_count(), 0);
    });
}
