//! A sounding note: one oscillator per instrument oscillator, cross-modulated.
//!
//! Oscillators run in instrument order each sample. Oscillator `i` first
//! produces its output, then has its phase pushed by the outputs of
//! oscillators `0..i` from the same sample, then steps its envelope.
//!
//! ## Modulation depth
//!
//! Stored depths (0..=100) are shaped by [`scale_modulation`] and multiplied
//! by the note's frequency ratio, so a given depth keeps the same timbre
//! across the keyboard.

use crate::envelope::Envelope;
use crate::instrument::{Instrument, InstrumentError, MIN_VOLUME, Note};
use crate::oscillator::Oscillator;
use crate::wavetable::WaveTable;
use core::f32::consts::E;
use libm::powf;

/// Modulation depth at a stored value of 100.
pub const MAX_MODULATION: f32 = 500.0;

/// Exponent applied to normalized modulation depth.
pub const MODULATION_CURVE: f32 = E;

/// Frequency ratio of `note` against note 69.
#[inline]
pub fn note_to_ratio(note: f32) -> f32 {
    powf(2.0, (note - 69.0) / 12.0)
}

/// Linear gain for a volume in decibels; 6 dB per doubling.
#[inline]
pub fn decibels_to_gain(db: f32) -> f32 {
    if db <= MIN_VOLUME {
        0.0
    } else {
        powf(2.0, db / 6.0)
    }
}

/// Shape a stored depth (0..=100) into a modulation amount.
#[inline]
pub fn scale_modulation(depth: f32) -> f32 {
    powf(depth.max(0.0) / 100.0, MODULATION_CURVE) * MAX_MODULATION
}

/// One playing note.
#[derive(Debug, Clone)]
pub struct Voice {
    note: Note,
    gate: bool,
    sample_rate: f32,
    note_ratio: f32,
    oscillators: Vec<Oscillator>,
    /// Row `i` holds depths from oscillators `0..i`, note ratio applied.
    modulation: Vec<Vec<f32>>,
    gains: Vec<f32>,
    /// Per-oscillator output from the current sample.
    outputs: Vec<f32>,
}

impl Voice {
    /// Start `note` on `instrument`, gate on.
    pub fn new(instrument: &Instrument, note: Note, sample_rate: f32) -> Result<Self, InstrumentError> {
        let mut voice = Self {
            note,
            gate: true,
            sample_rate,
            note_ratio: note_to_ratio(note.note),
            oscillators: Vec::with_capacity(instrument.oscillators.len()),
            modulation: Vec::new(),
            gains: Vec::new(),
            outputs: Vec::new(),
        };
        voice.update_instrument(instrument)?;
        Ok(voice)
    }

    /// Apply a changed instrument without restarting phases or envelopes.
    ///
    /// Waveform is applied before pitch. Oscillators past the old count are
    /// appended with fresh envelopes (already releasing if the gate is off);
    /// extra ones are dropped. Existing envelopes keep their settings.
    ///
    /// On error the voice is left exactly as it was.
    pub fn update_instrument(&mut self, instrument: &Instrument) -> Result<(), InstrumentError> {
        instrument.validate()?;
        let count = instrument.oscillators.len();

        let mut fresh = Vec::with_capacity(count.saturating_sub(self.oscillators.len()));
        for index in self.oscillators.len()..count {
            let spec = &instrument.oscillators[index];
            let mut envelope = Envelope::new(&spec.envelope, self.sample_rate)
                .map_err(|source| InstrumentError::Envelope { index, source })?;
            if !self.gate {
                envelope.release();
            }
            fresh.push(Oscillator::new(
                spec.wave,
                instrument.pitch_of(index, self.note_ratio),
                envelope,
                self.sample_rate,
            ));
        }

        self.oscillators.truncate(count);
        for (osc, spec) in self.oscillators.iter_mut().zip(&instrument.oscillators) {
            osc.set_wave(spec.wave);
        }
        for (index, osc) in self.oscillators.iter_mut().enumerate() {
            osc.set_pitch(instrument.pitch_of(index, self.note_ratio));
        }
        self.oscillators.append(&mut fresh);

        self.modulation.resize_with(count, Vec::new);
        for (row, spec) in self.modulation.iter_mut().zip(&instrument.oscillators) {
            row.clear();
            row.extend(
                spec.modulation
                    .iter()
                    .map(|&depth| scale_modulation(depth) * self.note_ratio),
            );
        }

        self.gains.clear();
        self.gains
            .extend(instrument.oscillators.iter().map(|spec| decibels_to_gain(spec.volume)));
        self.outputs.resize(count, 0.0);
        Ok(())
    }

    /// Compute one mono sample.
    #[inline]
    pub fn next_sample(&mut self, table: &WaveTable) -> f32 {
        let Self {
            gate,
            oscillators,
            modulation,
            gains,
            outputs,
            ..
        } = self;

        let mut mixed = 0.0;
        for (i, osc) in oscillators.iter_mut().enumerate() {
            let sample = osc.advance(table);
            for (&source, &depth) in outputs[..i].iter().zip(&modulation[i]) {
                osc.modulate_with(source, depth);
            }
            osc.step_envelope(*gate);
            outputs[i] = sample;
            mixed += sample * gains[i];
        }
        mixed
    }

    /// Add this voice's output to every channel.
    ///
    /// Each frame is computed once and written to all channels; the frame
    /// count is the shortest channel's length.
    pub fn add_wave<C: AsMut<[f32]>>(&mut self, table: &WaveTable, channels: &mut [C]) {
        let frames = channels
            .iter_mut()
            .map(|channel| channel.as_mut().len())
            .min()
            .unwrap_or(0);
        for frame in 0..frames {
            let value = self.next_sample(table);
            for channel in channels.iter_mut() {
                channel.as_mut()[frame] += value;
            }
        }
    }

    /// Gate off; envelopes move to release.
    pub fn release(&mut self) {
        self.gate = false;
    }

    /// Whether the gate is still on.
    pub fn is_gated(&self) -> bool {
        self.gate
    }

    /// True once no audible oscillator has a running envelope.
    pub fn is_stopped(&self) -> bool {
        self.oscillators
            .iter()
            .zip(&self.gains)
            .all(|(osc, &gain)| gain <= 0.0 || osc.envelope().is_stopped())
    }

    /// Note this voice was started with.
    pub fn note(&self) -> Note {
        self.note
    }

    /// Note uid.
    pub fn uid(&self) -> u32 {
        self.note.uid
    }

    /// Mixer slot of the instrument playing.
    pub fn slot(&self) -> usize {
        self.note.instrument_slot
    }

    /// Oscillators in instrument order.
    pub fn oscillators(&self) -> &[Oscillator] {
        &self.oscillators
    }

    /// Effective modulation depths; row `i` lists sources `0..i`.
    pub fn modulation(&self) -> &[Vec<f32>] {
        &self.modulation
    }

    /// Linear gain per oscillator.
    pub fn gains(&self) -> &[f32] {
        &self.gains
    }

    /// Retune every oscillator and envelope.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for osc in &mut self.oscillators {
            osc.set_sample_rate(sample_rate);
        }
    }
}
