//! Instrument descriptions: oscillator stacks, pitch ratios and modulation.
//!
//! An instrument is pure data. Voices are built from it and read it again
//! when it is replaced while notes are sounding.

use crate::envelope::{AdsrParams, EnvelopeError, EnvelopeSpec};
use crate::wavetable::WaveShape;
use rand::Rng;
use thiserror::Error;

/// Volumes at or below this many decibels are silent.
pub const MIN_VOLUME: f32 = -72.0;

/// Errors from instrument validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstrumentError {
    /// An instrument needs at least one oscillator.
    #[error("instrument has no oscillators")]
    NoOscillators,

    /// Base pitch must be a positive, finite frequency.
    #[error("base pitch must be a positive frequency, got {0}")]
    InvalidBasePitch(f32),

    /// Pitch fraction has a zero term.
    #[error("oscillator {index}: pitch fraction {numerator}/{denominator} is not a positive ratio")]
    InvalidPitchFraction {
        /// Oscillator index.
        index: usize,
        /// Numerator.
        numerator: u32,
        /// Denominator.
        denominator: u32,
    },

    /// Modulation row length must equal the oscillator's index.
    #[error("oscillator {index}: expected {expected} modulation depths, found {found}")]
    ModulationShape {
        /// Oscillator index.
        index: usize,
        /// Number of earlier oscillators.
        expected: usize,
        /// Length of the row supplied.
        found: usize,
    },

    /// Modulation depth must be finite and non-negative.
    #[error("oscillator {index}: invalid modulation depth {value}")]
    InvalidModulation {
        /// Oscillator index.
        index: usize,
        /// The offending depth.
        value: f32,
    },

    /// Volume must be finite.
    #[error("oscillator {index}: invalid volume {value} dB")]
    InvalidVolume {
        /// Oscillator index.
        index: usize,
        /// The offending volume.
        value: f32,
    },

    /// Envelope settings are invalid.
    #[error("oscillator {index}: {source}")]
    Envelope {
        /// Oscillator index.
        index: usize,
        /// What was wrong with the envelope.
        source: EnvelopeError,
    },
}

/// Frequency ratio `numerator / denominator` relative to the note pitch.
///
/// Serialized as a two-element array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchFraction(pub u32, pub u32);

impl Default for PitchFraction {
    fn default() -> Self {
        Self::UNISON
    }
}

impl PitchFraction {
    /// 1/1.
    pub const UNISON: PitchFraction = PitchFraction(1, 1);

    /// Numerator.
    pub fn numerator(self) -> u32 {
        self.0
    }

    /// Denominator.
    pub fn denominator(self) -> u32 {
        self.1
    }

    /// The ratio as a float. Zero denominators yield zero.
    pub fn ratio(self) -> f32 {
        if self.1 == 0 {
            0.0
        } else {
            self.0 as f32 / self.1 as f32
        }
    }
}

/// One oscillator of an instrument.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct OscillatorSpec {
    /// Waveform.
    pub wave: WaveShape,
    /// Frequency ratio against the note pitch.
    pub pitch_fraction: PitchFraction,
    /// Depth 0..=100 from each earlier oscillator, one entry per oscillator before this one.
    pub modulation: Vec<f32>,
    /// Output level in decibels; at or below [`MIN_VOLUME`] is silent.
    pub volume: f32,
    /// Amplitude envelope.
    pub envelope: EnvelopeSpec,
}

impl OscillatorSpec {
    /// Silent sine at unison for slot `index`, with zero modulation from
    /// every earlier oscillator.
    pub fn default_for(index: usize) -> Self {
        Self {
            wave: WaveShape::Sine,
            pitch_fraction: PitchFraction::UNISON,
            modulation: vec![0.0; index],
            volume: MIN_VOLUME,
            envelope: EnvelopeSpec::default(),
        }
    }

    /// Check this oscillator as if it sat at position `index`.
    pub fn validate(&self, index: usize) -> Result<(), InstrumentError> {
        let PitchFraction(numerator, denominator) = self.pitch_fraction;
        if numerator == 0 || denominator == 0 {
            return Err(InstrumentError::InvalidPitchFraction {
                index,
                numerator,
                denominator,
            });
        }
        if self.modulation.len() != index {
            return Err(InstrumentError::ModulationShape {
                index,
                expected: index,
                found: self.modulation.len(),
            });
        }
        if let Some(&value) = self
            .modulation
            .iter()
            .find(|d| !d.is_finite() || **d < 0.0)
        {
            return Err(InstrumentError::InvalidModulation { index, value });
        }
        if !self.volume.is_finite() {
            return Err(InstrumentError::InvalidVolume {
                index,
                value: self.volume,
            });
        }
        self.envelope
            .validate()
            .map_err(|source| InstrumentError::Envelope { index, source })
    }
}

/// A stack of oscillators sharing a base pitch.
///
/// # Example
///
/// ```rust
/// use soundgen_synth::Instrument;
///
/// let mut organ = Instrument::sine_wave(3);
/// organ.oscillators[1].pitch_fraction = soundgen_synth::PitchFraction(2, 1);
/// assert!(organ.validate().is_ok());
///
/// organ.add_oscillator(1);
/// assert_eq!(organ.oscillators.len(), 4);
/// assert_eq!(organ.oscillators[2].modulation.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Instrument {
    /// Display name.
    pub title: String,
    /// Frequency in Hz of note 69 at unison.
    pub base_pitch: f32,
    /// Oscillators in modulation order.
    #[cfg_attr(feature = "serde", serde(rename = "oscs"))]
    pub oscillators: Vec<OscillatorSpec>,
}

impl Default for Instrument {
    fn default() -> Self {
        Self::sine_wave(1)
    }
}

impl Instrument {
    /// `count` sines at unison: the last at 0 dB, the rest at -12 dB.
    pub fn sine_wave(count: usize) -> Self {
        let count = count.max(1);
        let oscillators = (0..count)
            .map(|i| OscillatorSpec {
                volume: if i + 1 == count { 0.0 } else { -12.0 },
                ..OscillatorSpec::default_for(i)
            })
            .collect();
        Self {
            title: "Sine Wave".to_string(),
            base_pitch: 440.0,
            oscillators,
        }
    }

    /// Check every oscillator and the base pitch, reporting the first problem.
    pub fn validate(&self) -> Result<(), InstrumentError> {
        if self.oscillators.is_empty() {
            return Err(InstrumentError::NoOscillators);
        }
        if !self.base_pitch.is_finite() || self.base_pitch <= 0.0 {
            return Err(InstrumentError::InvalidBasePitch(self.base_pitch));
        }
        for (index, osc) in self.oscillators.iter().enumerate() {
            osc.validate(index)?;
        }
        Ok(())
    }

    /// Frequency of oscillator `index` for a note ratio, in Hz.
    pub fn pitch_of(&self, index: usize, note_ratio: f32) -> f32 {
        self.oscillators
            .get(index)
            .map_or(0.0, |osc| self.base_pitch * osc.pitch_fraction.ratio() * note_ratio)
    }

    /// Insert a default oscillator before `index` (clamped to the end),
    /// keeping every modulation row aligned.
    pub fn add_oscillator(&mut self, index: usize) {
        let index = index.min(self.oscillators.len());
        for later in &mut self.oscillators[index..] {
            later.modulation.insert(index, 0.0);
        }
        self.oscillators
            .insert(index, OscillatorSpec::default_for(index));
    }

    /// A copy with every oscillator's shape, envelope, ratio and modulation
    /// rerolled. Title, base pitch, volumes and the oscillator count are kept,
    /// and the last oscillator always sits at unison.
    pub fn randomize<R: Rng + ?Sized>(&self, rng: &mut R) -> Instrument {
        const SHAPES: [WaveShape; 6] = [
            WaveShape::Sine,
            WaveShape::HalfSine,
            WaveShape::AbsSine,
            WaveShape::PulseSine,
            WaveShape::Square,
            WaveShape::Saw,
        ];
        let count = self.oscillators.len();
        let depth_curve = count.saturating_sub(1) as i32;
        let oscillators = self
            .oscillators
            .iter()
            .enumerate()
            .map(|(index, osc)| {
                let envelope = EnvelopeSpec::Adsr(AdsrParams {
                    attack: 0.01 + rng.r#gen::<f32>() * rng.r#gen::<f32>(),
                    decay: 0.01 + rng.r#gen::<f32>(),
                    sustain: (rng.r#gen::<f32>() + rng.r#gen::<f32>()) / 2.0,
                    release: 0.01 + rng.r#gen::<f32>(),
                });
                let wave = SHAPES[rng.gen_range(0..SHAPES.len())];
                let modulation = (0..index)
                    .map(|_| (rng.r#gen::<f32>().powi(depth_curve) * 100.0).floor())
                    .collect();
                let pitch_fraction = if index + 1 == count {
                    PitchFraction::UNISON
                } else {
                    PitchFraction(rng.gen_range(1..13), rng.gen_range(1..13))
                };
                OscillatorSpec {
                    wave,
                    pitch_fraction,
                    modulation,
                    volume: osc.volume,
                    envelope,
                }
            })
            .collect();
        Instrument {
            title: self.title.clone(),
            base_pitch: self.base_pitch,
            oscillators,
        }
    }

    /// Remove oscillator `index` and its column from later rows.
    ///
    /// Returns `false` without changing anything if `index` is out of range
    /// or it is the only oscillator.
    pub fn remove_oscillator(&mut self, index: usize) -> bool {
        if self.oscillators.len() <= 1 || index >= self.oscillators.len() {
            return false;
        }
        self.oscillators.remove(index);
        for later in &mut self.oscillators[index..] {
            later.modulation.remove(index);
        }
        true
    }
}

/// A note event.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Note {
    /// MIDI-style note number; 69 sounds at the base pitch. Fractions allowed.
    pub note: f32,
    /// Mixer slot holding the instrument to play.
    #[cfg_attr(feature = "serde", serde(rename = "instrumentIndex"))]
    pub instrument_slot: usize,
    /// Caller-chosen id used to release the note.
    pub uid: u32,
}

impl Note {
    /// Create a note.
    pub const fn new(note: f32, instrument_slot: usize, uid: u32) -> Self {
        Self {
            note,
            instrument_slot,
            uid,
        }
    }
}
