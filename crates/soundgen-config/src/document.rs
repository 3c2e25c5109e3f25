//! Instrument document format and operations.
//!
//! A document is an [`Instrument`] plus the schema version it was written
//! with, stored as JSON:
//!
//! ```json
//! {
//!   "version": "0.4.0",
//!   "title": "Organ",
//!   "basePitch": 440,
//!   "oscs": [
//!     {
//!       "wave": "sine",
//!       "pitchFraction": [1, 1],
//!       "modulation": [],
//!       "volume": 0,
//!       "envelope": { "tag": "adsr", "attack": 50, "decay": 5, "sustain": 0.8, "release": 8 }
//!     }
//!   ]
//! }
//! ```
//!
//! Only [`CURRENT_VERSION`] is read. Older documents must be migrated
//! before they get here. The one exception is an oscillator carrying a
//! float `pitchRatio` instead of `pitchFraction`, which is converted to
//! the nearest simple fraction on load.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use soundgen_synth::{Instrument, PitchFraction};
use std::path::Path;

use crate::error::ConfigError;
use crate::factory_presets::get_factory_preset;
use crate::validation::validate_instrument;

/// Schema version this build reads and writes.
pub const CURRENT_VERSION: &str = "0.4.0";

/// Largest acceptable error when turning a float ratio into a fraction.
pub const RATIO_TOLERANCE: f32 = 0.01;

/// A versioned instrument document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentDocument {
    /// Schema version.
    pub version: String,
    /// The instrument, flattened into the top-level object.
    #[serde(flatten)]
    pub instrument: Instrument,
}

impl From<Instrument> for InstrumentDocument {
    fn from(instrument: Instrument) -> Self {
        Self::new(instrument)
    }
}

impl InstrumentDocument {
    /// Wrap an instrument at the current version.
    pub fn new(instrument: Instrument) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            instrument,
        }
    }

    /// Parse, version-check and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut value: Value = serde_json::from_str(json).map_err(ConfigError::JsonParse)?;
        check_version(&value)?;
        upgrade_pitch_ratios(&mut value);
        let doc: Self = serde_json::from_value(value).map_err(ConfigError::JsonParse)?;
        validate_instrument(&doc.instrument)?;
        Ok(doc)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::JsonSerialize)
    }

    /// Load a document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_json(&content)
    }

    /// Save the document to a JSON file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_json()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::debug!(path = %path.display(), title = %self.instrument.title, "saved instrument");
        Ok(())
    }

    /// Drop the version and keep the instrument.
    pub fn into_instrument(self) -> Instrument {
        self.instrument
    }
}

/// Resolve a factory instrument name, or failing that, a document path.
pub fn load_instrument(name_or_path: &str) -> Result<Instrument, ConfigError> {
    if let Some(instrument) = get_factory_preset(name_or_path) {
        return Ok(instrument);
    }
    let path = Path::new(name_or_path);
    if path.exists() {
        return InstrumentDocument::load(path).map(InstrumentDocument::into_instrument);
    }
    Err(ConfigError::PresetNotFound(name_or_path.to_string()))
}

/// Closest fraction to `ratio` with numerator at most 12 and denominator
/// below 12, plus its absolute error.
///
/// A smaller denominator wins unless a larger one improves the error by more
/// than [`RATIO_TOLERANCE`].
pub fn estimate_fraction(ratio: f32) -> (PitchFraction, f32) {
    let mut best = (PitchFraction::UNISON, f32::INFINITY);
    for denominator in 1..12u32 {
        let numerator = (ratio * denominator as f32).round();
        if !(1.0..=12.0).contains(&numerator) {
            continue;
        }
        let error = (ratio - numerator / denominator as f32).abs();
        if best.1 - error > RATIO_TOLERANCE {
            best = (PitchFraction(numerator as u32, denominator), error);
        }
    }
    best
}

fn check_version(doc: &Value) -> Result<(), ConfigError> {
    match doc.get("version").and_then(Value::as_str) {
        Some(CURRENT_VERSION) => Ok(()),
        found => Err(ConfigError::UnsupportedVersion {
            found: found.unwrap_or("<missing>").to_string(),
            expected: CURRENT_VERSION,
        }),
    }
}

/// Replace legacy `pitchRatio` floats with `pitchFraction` pairs in place.
fn upgrade_pitch_ratios(doc: &mut Value) {
    let Some(oscs) = doc.get_mut("oscs").and_then(Value::as_array_mut) else {
        return;
    };
    for (index, osc) in oscs.iter_mut().enumerate() {
        let Some(fields) = osc.as_object_mut() else {
            continue;
        };
        let legacy = fields.remove("pitchRatio");
        if fields.contains_key("pitchFraction") {
            continue;
        }
        let Some(ratio) = legacy.as_ref().and_then(Value::as_f64) else {
            continue;
        };

        let ratio = ratio as f32;
        let (PitchFraction(numerator, denominator), error) = estimate_fraction(ratio);
        if error > RATIO_TOLERANCE {
            tracing::warn!(
                oscillator = index,
                ratio,
                numerator,
                denominator,
                "pitch ratio is not a simple fraction, using closest match"
            );
        } else {
            tracing::debug!(oscillator = index, ratio, numerator, denominator, "converted pitch ratio");
        }
        fields.insert("pitchFraction".to_string(), json!([numerator, denominator]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundgen_synth::{EnvelopeSpec, WaveShape};

    const MINIMAL: &str = r#"{
        "version": "0.4.0",
        "title": "Test",
        "basePitch": 220,
        "oscs": [
            {
                "wave": "square",
                "pitchFraction": [3, 2],
                "modulation": [],
                "volume": -6,
                "envelope": { "tag": "adsr", "attack": 10, "decay": 2, "sustain": 0.5, "release": 4 }
            }
        ]
    }"#;

    #[test]
    fn parses_minimal_document() {
        let doc = InstrumentDocument::from_json(MINIMAL).unwrap();
        assert_eq!(doc.version, CURRENT_VERSION);
        assert_eq!(doc.instrument.title, "Test");
        assert_eq!(doc.instrument.base_pitch, 220.0);
        let osc = &doc.instrument.oscillators[0];
        assert_eq!(osc.wave, WaveShape::Square);
        assert_eq!(osc.pitch_fraction, PitchFraction(3, 2));
        assert!(matches!(osc.envelope, EnvelopeSpec::Adsr(_)));
    }

    #[test]
    fn rejects_other_versions() {
        let old = MINIMAL.replace("0.4.0", "0.3.0");
        assert!(matches!(
            InstrumentDocument::from_json(&old),
            Err(ConfigError::UnsupportedVersion { ref found, .. }) if found == "0.3.0"
        ));

        let missing = r#"{"title": "x", "basePitch": 440, "oscs": []}"#;
        assert!(matches!(
            InstrumentDocument::from_json(missing),
            Err(ConfigError::UnsupportedVersion { ref found, .. }) if found == "<missing>"
        ));
    }

    #[test]
    fn rejects_unknown_wave() {
        let bad = MINIMAL.replace("\"square\"", "\"triangle\"");
        assert!(matches!(
            InstrumentDocument::from_json(&bad),
            Err(ConfigError::JsonParse(_))
        ));
    }

    #[test]
    fn rejects_invalid_instrument() {
        let bad = MINIMAL.replace("\"modulation\": []", "\"modulation\": [5]");
        assert!(matches!(
            InstrumentDocument::from_json(&bad),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn legacy_pitch_ratio_is_converted() {
        let legacy = MINIMAL.replace("\"pitchFraction\": [3, 2]", "\"pitchRatio\": 0.6667");
        let doc = InstrumentDocument::from_json(&legacy).unwrap();
        assert_eq!(doc.instrument.oscillators[0].pitch_fraction, PitchFraction(2, 3));
    }

    #[test]
    fn fraction_estimates() {
        assert_eq!(estimate_fraction(1.0), (PitchFraction(1, 1), 0.0));
        assert_eq!(estimate_fraction(1.5).0, PitchFraction(3, 2));
        assert_eq!(estimate_fraction(0.5).0, PitchFraction(1, 2));
        assert_eq!(estimate_fraction(4.0).0, PitchFraction(4, 1));
        assert_eq!(estimate_fraction(12.0).0, PitchFraction(12, 1));

        // Nothing within tolerance: best effort, error reported.
        let (_, error) = estimate_fraction(1.0 / 13.0);
        assert!(error > RATIO_TOLERANCE);
        let (fraction, error) = estimate_fraction(f32::NAN);
        assert_eq!(fraction, PitchFraction::UNISON);
        assert!(error.is_infinite());
    }

    #[test]
    fn json_round_trip() {
        let doc = InstrumentDocument::new(Instrument::sine_wave(3));
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"basePitch\""));
        assert!(json.contains("\"oscs\""));
        assert!(json.contains("\"pitchFraction\""));
        assert_eq!(InstrumentDocument::from_json(&json).unwrap(), doc);
    }
}
