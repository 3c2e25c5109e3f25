//! Integration tests for soundgen-config.
//!
//! These tests verify documents end to end: files on disk, factory
//! instruments played through the engine, and round trips.

use soundgen_config::{
    ConfigError, InstrumentDocument, factory_presets, get_factory_preset, load_instrument,
};
use soundgen_synth::{
    EnvelopePoint, EnvelopeSpec, Instrument, Mixer, Note, PitchFraction, PointEnvelope, WaveShape,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Saving then loading reproduces the instrument exactly.
#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("lead.json");

    let mut inst = Instrument::sine_wave(3);
    inst.title = "Lead".to_string();
    inst.oscillators[0].wave = WaveShape::PulseSine;
    inst.oscillators[1].pitch_fraction = PitchFraction(5, 4);
    inst.oscillators[2].modulation = vec![12.5, 70.0];
    inst.oscillators[2].envelope = EnvelopeSpec::Points(PointEnvelope {
        points: vec![
            EnvelopePoint::new(0.0, 0.0),
            EnvelopePoint::new(0.01, 1.0),
            EnvelopePoint::new(0.3, 0.4),
        ],
        sustain_point: 3,
        release: 2.5,
    });

    InstrumentDocument::new(inst.clone()).save(&path).unwrap();
    let loaded = InstrumentDocument::load(&path).unwrap();

    assert_eq!(loaded.version, "0.4.0");
    assert_eq!(loaded.instrument, inst);
}

/// Missing files surface as read errors with the path attached.
#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    match InstrumentDocument::load(&path) {
        Err(ConfigError::ReadFile { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected ReadFile, got {other:?}"),
    }
}

/// Names resolve to factory instruments, anything else to a file path.
#[test]
fn test_load_instrument_by_name_or_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.json");
    let mut custom = Instrument::sine_wave(1);
    custom.title = "Custom".to_string();
    InstrumentDocument::new(custom).save(&path).unwrap();

    assert_eq!(load_instrument("organ").unwrap().title, "Organ");
    assert_eq!(load_instrument(path.to_str().unwrap()).unwrap().title, "Custom");
    assert!(matches!(
        load_instrument("no-such-instrument"),
        Err(ConfigError::PresetNotFound(_))
    ));
}

/// Every factory instrument sounds and then falls silent after release.
#[test]
fn test_factory_presets_play() {
    let mut mixer = Mixer::new(48000.0);
    for (slot, inst) in factory_presets().into_iter().enumerate() {
        mixer.set_instrument(slot, Arc::new(inst)).unwrap();
        mixer.note_down(Note::new(60.0, slot, slot as u32)).unwrap();
    }

    let mut block = [vec![0.0f32; 4800]];
    mixer.write_wave(&mut block);
    assert!(block[0].iter().all(|s| s.is_finite()));
    assert!(block[0].iter().any(|s| s.abs() > 0.01));

    mixer.release_all();
    for _ in 0..100 {
        mixer.write_wave(&mut block);
    }
    assert_eq!(mixer.voice_count(), 0);
}

/// Legacy documents without fractions still load.
#[test]
fn test_legacy_pitch_ratio_document() {
    let json = r#"{
        "version": "0.4.0",
        "title": "Old",
        "basePitch": 440,
        "oscs": [
            { "wave": "sine", "pitchRatio": 1, "modulation": [], "volume": 0,
              "envelope": { "tag": "adsr", "attack": 10, "decay": 1, "sustain": 1, "release": 1 } },
            { "wave": "saw", "pitchRatio": 2.5, "modulation": [10], "volume": -6,
              "envelope": { "tag": "adsr", "attack": 10, "decay": 1, "sustain": 1, "release": 1 } }
        ]
    }"#;
    let doc = InstrumentDocument::from_json(json).unwrap();
    assert_eq!(doc.instrument.oscillators[0].pitch_fraction, PitchFraction(1, 1));
    assert_eq!(doc.instrument.oscillators[1].pitch_fraction, PitchFraction(5, 2));
    assert!(!doc.to_json().unwrap().contains("pitchRatio"));
}

/// Factory JSON uses the documented field names.
#[test]
fn test_factory_json_shape() {
    let bell = get_factory_preset("bell").unwrap();
    let json = InstrumentDocument::new(bell).to_json().unwrap();
    for key in ["\"version\"", "\"basePitch\"", "\"oscs\"", "\"sustainPoint\"", "\"tag\": \"points\""] {
        assert!(json.contains(key), "missing {key} in {json}");
    }
}
