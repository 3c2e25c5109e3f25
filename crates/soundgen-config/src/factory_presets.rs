//! Factory instruments bundled with soundgen.
//!
//! These are embedded at compile time as instrument documents and are always
//! available without external files. They double as worked examples of the
//! document format: plain additive stacks (`sine`, `organ`), phase
//! modulation from silent oscillators (`bell`, `bass`, `pluck`), and
//! one-shot breakpoint envelopes.

use soundgen_synth::Instrument;

use crate::document::InstrumentDocument;

/// Array of factory instrument names for external access.
pub static FACTORY_PRESET_NAMES: &[&str] = &["sine", "organ", "bell", "bass", "pluck", "brass"];

static FACTORY_PRESETS_JSON: &[(&str, &str)] = &[
    ("sine", SINE_PRESET),
    ("organ", ORGAN_PRESET),
    ("bell", BELL_PRESET),
    ("bass", BASS_PRESET),
    ("pluck", PLUCK_PRESET),
    ("brass", BRASS_PRESET),
];

const SINE_PRESET: &str = r#"{
  "version": "0.4.0",
  "title": "Sine",
  "basePitch": 440,
  "oscs": [
    {
      "wave": "sine",
      "pitchFraction": [1, 1],
      "modulation": [],
      "volume": -3,
      "envelope": { "tag": "adsr", "attack": 50, "decay": 5, "sustain": 0.8, "release": 8 }
    }
  ]
}"#;

/// Drawbar organ: four sines at sub, unison, octave and twelfth.
const ORGAN_PRESET: &str = r#"{
  "version": "0.4.0",
  "title": "Organ",
  "basePitch": 440,
  "oscs": [
    {
      "wave": "sine",
      "pitchFraction": [1, 2],
      "modulation": [],
      "volume": -9,
      "envelope": { "tag": "adsr", "attack": 100, "decay": 10, "sustain": 1.0, "release": 20 }
    },
    {
      "wave": "sine",
      "pitchFraction": [1, 1],
      "modulation": [0],
      "volume": -6,
      "envelope": { "tag": "adsr", "attack": 100, "decay": 10, "sustain": 1.0, "release": 20 }
    },
    {
      "wave": "sine",
      "pitchFraction": [2, 1],
      "modulation": [0, 0],
      "volume": -12,
      "envelope": { "tag": "adsr", "attack": 100, "decay": 10, "sustain": 1.0, "release": 20 }
    },
    {
      "wave": "halfSine",
      "pitchFraction": [3, 1],
      "modulation": [0, 0, 0],
      "volume": -18,
      "envelope": { "tag": "adsr", "attack": 100, "decay": 10, "sustain": 1.0, "release": 20 }
    }
  ]
}"#;

/// Inharmonic modulator into a decaying sine.
const BELL_PRESET: &str = r#"{
  "version": "0.4.0",
  "title": "Bell",
  "basePitch": 440,
  "oscs": [
    {
      "wave": "sine",
      "pitchFraction": [7, 2],
      "modulation": [],
      "volume": -72,
      "envelope": {
        "tag": "points",
        "points": [{ "dx": 0, "y": 0 }, { "dx": 0.002, "y": 1 }, { "dx": 1.2, "y": 0.1 }],
        "sustainPoint": 3,
        "release": 1
      }
    },
    {
      "wave": "sine",
      "pitchFraction": [1, 1],
      "modulation": [45],
      "volume": -3,
      "envelope": {
        "tag": "points",
        "points": [{ "dx": 0, "y": 0 }, { "dx": 0.003, "y": 1 }, { "dx": 2.5, "y": 0 }],
        "sustainPoint": 0,
        "release": 2
      }
    },
    {
      "wave": "sine",
      "pitchFraction": [5, 1],
      "modulation": [0, 0],
      "volume": -18,
      "envelope": {
        "tag": "points",
        "points": [{ "dx": 0, "y": 0 }, { "dx": 0.002, "y": 1 }, { "dx": 0.6, "y": 0 }],
        "sustainPoint": 0,
        "release": 4
      }
    }
  ]
}"#;

const BASS_PRESET: &str = r#"{
  "version": "0.4.0",
  "title": "Bass",
  "basePitch": 220,
  "oscs": [
    {
      "wave": "square",
      "pitchFraction": [1, 1],
      "modulation": [],
      "volume": -72,
      "envelope": { "tag": "adsr", "attack": 300, "decay": 4, "sustain": 0.3, "release": 10 }
    },
    {
      "wave": "saw",
      "pitchFraction": [1, 1],
      "modulation": [25],
      "volume": -3,
      "envelope": { "tag": "adsr", "attack": 200, "decay": 3, "sustain": 0.6, "release": 10 }
    }
  ]
}"#;

/// Plucked string: everything decays on its own, gate only shortens it.
const PLUCK_PRESET: &str = r#"{
  "version": "0.4.0",
  "title": "Pluck",
  "basePitch": 440,
  "oscs": [
    {
      "wave": "absSine",
      "pitchFraction": [2, 1],
      "modulation": [],
      "volume": -72,
      "envelope": {
        "tag": "points",
        "points": [{ "dx": 0, "y": 1 }, { "dx": 0.15, "y": 0 }],
        "sustainPoint": 0,
        "release": 10
      }
    },
    {
      "wave": "halfSine",
      "pitchFraction": [1, 1],
      "modulation": [30],
      "volume": 0,
      "envelope": {
        "tag": "points",
        "points": [{ "dx": 0, "y": 0 }, { "dx": 0.002, "y": 1 }, { "dx": 0.8, "y": 0 }],
        "sustainPoint": 0,
        "release": 5
      }
    }
  ]
}"#;

const BRASS_PRESET: &str = r#"{
  "version": "0.4.0",
  "title": "Brass",
  "basePitch": 440,
  "oscs": [
    {
      "wave": "pulseSine",
      "pitchFraction": [1, 1],
      "modulation": [],
      "volume": -72,
      "envelope": { "tag": "adsr", "attack": 6, "decay": 2, "sustain": 0.7, "release": 6 }
    },
    {
      "wave": "quarterSine",
      "pitchFraction": [1, 1],
      "modulation": [35],
      "volume": -2,
      "envelope": { "tag": "adsr", "attack": 12, "decay": 4, "sustain": 0.7, "release": 6 }
    },
    {
      "wave": "saw",
      "pitchFraction": [2, 1],
      "modulation": [0, 10],
      "volume": -15,
      "envelope": { "tag": "adsr", "attack": 10, "decay": 4, "sustain": 0.5, "release": 6 }
    }
  ]
}"#;

/// Get all factory instruments.
///
/// # Example
///
/// ```rust
/// use soundgen_config::factory_presets;
///
/// for instrument in factory_presets() {
///     println!("{} ({} oscillators)", instrument.title, instrument.oscillators.len());
/// }
/// ```
pub fn factory_presets() -> Vec<Instrument> {
    FACTORY_PRESETS_JSON
        .iter()
        .filter_map(|(_, json)| parse(json))
        .collect()
}

/// Get a factory instrument by name or title, case-insensitively.
///
/// # Example
///
/// ```rust
/// use soundgen_config::get_factory_preset;
///
/// let bell = get_factory_preset("Bell").unwrap();
/// assert_eq!(bell.oscillators.len(), 3);
/// ```
pub fn get_factory_preset(name: &str) -> Option<Instrument> {
    let name_lower = name.to_lowercase();

    if let Some((_, json)) = FACTORY_PRESETS_JSON
        .iter()
        .find(|(preset_name, _)| *preset_name == name_lower)
    {
        return parse(json);
    }

    factory_presets()
        .into_iter()
        .find(|inst| inst.title.to_lowercase() == name_lower)
}

/// Get the names of all factory instruments.
pub fn factory_preset_names() -> Vec<&'static str> {
    FACTORY_PRESETS_JSON.iter().map(|(name, _)| *name).collect()
}

/// Check if a name refers to a factory instrument (case-insensitive).
pub fn is_factory_preset(name: &str) -> bool {
    get_factory_preset(name).is_some()
}

fn parse(json: &str) -> Option<Instrument> {
    match InstrumentDocument::from_json(json) {
        Ok(doc) => Some(doc.into_instrument()),
        Err(err) => {
            tracing::error!(%err, "factory instrument failed to load");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_factory_preset_loads() {
        assert_eq!(factory_presets().len(), FACTORY_PRESET_NAMES.len());
        for (name, json) in FACTORY_PRESETS_JSON {
            if let Err(err) = InstrumentDocument::from_json(json) {
                panic!("factory preset '{name}' failed: {err}");
            }
        }
    }

    #[test]
    fn names_match_table() {
        assert_eq!(factory_preset_names(), FACTORY_PRESET_NAMES.to_vec());
    }

    #[test]
    fn lookup_by_name_or_title() {
        assert_eq!(get_factory_preset("organ").unwrap().oscillators.len(), 4);
        assert_eq!(get_factory_preset("ORGAN").unwrap().title, "Organ");
        assert!(is_factory_preset("Brass"));
        assert!(!is_factory_preset("theremin"));
    }

    #[test]
    fn presets_are_audible() {
        for inst in factory_presets() {
            assert!(
                inst.oscillators.iter().any(|o| o.volume > soundgen_synth::MIN_VOLUME),
                "{} has no audible oscillator",
                inst.title
            );
        }
    }
}
