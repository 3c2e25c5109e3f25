//! Integration tests for the soundgen-io engine channel.

use soundgen_config::get_factory_preset;
use soundgen_io::{EngineConfig, engine_channel};
use soundgen_synth::{Instrument, Note};
use std::thread;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Render `blocks` blocks of `len` frames and return the concatenated output.
fn render(engine: &mut soundgen_io::SynthEngine, blocks: usize, len: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(blocks * len);
    let mut block = [vec![0.0f32; len]];
    for _ in 0..blocks {
        engine.process(&mut block);
        out.extend_from_slice(&block[0]);
    }
    out
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0, |m, s| m.max(s.abs()))
}

// ---------------------------------------------------------------------------
// Cross-thread control
// ---------------------------------------------------------------------------

#[test]
fn controller_on_another_thread() {
    let (controller, mut engine) = engine_channel(&EngineConfig::default());

    let handle = thread::spawn(move || {
        controller
            .set_instrument(0, get_factory_preset("organ").unwrap())
            .unwrap();
        for (uid, note) in [60.0, 64.0, 67.0].into_iter().enumerate() {
            controller.note_down(Note::new(note, 0, uid as u32)).unwrap();
        }
        controller
    });
    let controller = handle.join().unwrap();

    let out = render(&mut engine, 40, 256);
    assert_eq!(engine.voice_count(), 3);
    assert!(peak(&out) > 0.05);
    assert!(out.iter().all(|s| s.is_finite()));

    controller.all_notes_off().unwrap();
    render(&mut engine, 400, 256);
    assert_eq!(engine.voice_count(), 0);
    assert_eq!(controller.dropped_events(), 0);
}

#[test]
fn messages_apply_in_order() {
    let (controller, mut engine) = engine_channel(&EngineConfig::default());

    // Note-down before the slot is assigned is dropped even though the
    // assignment arrives in the same block.
    controller.note_down(Note::new(60.0, 0, 1)).unwrap();
    controller.set_instrument(0, Instrument::sine_wave(1)).unwrap();
    controller.note_down(Note::new(60.0, 0, 2)).unwrap();

    render(&mut engine, 1, 64);
    assert_eq!(controller.dropped_events(), 1);
    assert_eq!(engine.voice_count(), 1);

    // Release then retrigger the same uid within one block.
    controller.note_up(2).unwrap();
    controller.note_down(Note::new(62.0, 0, 2)).unwrap();
    render(&mut engine, 1, 64);
    assert_eq!(controller.dropped_events(), 1);
    assert!(engine.voice_count() >= 1);
}

#[test]
fn clones_share_the_queue() {
    let (controller, mut engine) = engine_channel(&EngineConfig::default());
    let other = controller.clone();

    controller.set_instrument(1, Instrument::sine_wave(2)).unwrap();
    other.note_down(Note::new(72.0, 1, 9)).unwrap();
    render(&mut engine, 1, 64);
    assert_eq!(engine.voice_count(), 1);

    other.note_up(10).unwrap();
    render(&mut engine, 1, 64);
    assert_eq!(controller.dropped_events(), 1);
}

#[test]
fn sample_rate_change_between_blocks() {
    let config = EngineConfig {
        sample_rate: 44100,
        ..EngineConfig::default()
    };
    let (mut controller, mut engine) = engine_channel(&config);
    assert_eq!(engine.sample_rate(), 44100.0);

    controller.set_instrument(0, get_factory_preset("sine").unwrap()).unwrap();
    controller.note_down(Note::new(69.0, 0, 1)).unwrap();
    render(&mut engine, 10, 128);

    controller.set_sample_rate(96000).unwrap();
    let out = render(&mut engine, 10, 128);
    assert_eq!(engine.sample_rate(), 96000.0);
    assert_eq!(engine.voice_count(), 1);
    assert!(out.iter().all(|s| s.is_finite()));
}
