//! Wavetable oscillator with phase modulation input.
//!
//! The oscillator tracks its phase in cycles. Phase modulation nudges the
//! phase directly, so the frequency actually heard differs from the nominal
//! pitch. Each sample measures that realized frequency from the phase
//! movement and uses it for band selection, which keeps heavily modulated
//! oscillators from aliasing.
//!
//! The enveloped output then passes through a cascade of one-pole lowpass
//! stages that softens whatever harmonic content survives band selection.

use crate::envelope::Envelope;
use crate::wavetable::{WaveShape, WaveTable};
use core::f32::consts::TAU;
use libm::expf;

/// Phase offset in cycles per unit of `sample * depth / sample_rate`.
pub const MODULATION_INDEX_SCALE: f64 = 100.0;

/// Cutoff of the output lowpass in Hz, capped at Nyquist.
pub const LOWPASS_FREQ: f32 = 8000.0;

/// Number of one-pole stages in the output lowpass.
pub const LOWPASS_STAGES: usize = 4;

/// Feedback coefficient of one lowpass stage.
#[inline]
fn lowpass_coeff(sample_rate: f32) -> f32 {
    let cutoff = LOWPASS_FREQ.min(sample_rate * 0.5);
    expf(-TAU * cutoff / sample_rate)
}

/// Oscillator owned by a voice.
///
/// # Example
///
/// ```rust
/// use soundgen_synth::{Envelope, EnvelopeSpec, Oscillator, WaveShape, WaveTable};
///
/// let table = WaveTable::new(48000.0);
/// let env = Envelope::new(&EnvelopeSpec::default(), 48000.0).unwrap();
/// let mut osc = Oscillator::new(WaveShape::Saw, 220.0, env, 48000.0);
///
/// let sample = osc.advance(&table);
/// osc.step_envelope(true);
/// assert!(sample.abs() <= 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    wave: WaveShape,
    /// Nominal frequency in Hz
    pitch: f32,
    sample_rate: f32,
    /// Cycles per sample at the nominal pitch
    phase_inc: f64,
    /// Phase in cycles, including modulation
    phase: f64,
    /// Phase at the previous sample, for realized-frequency measurement
    last_phase: f64,
    realized: f32,
    envelope: Envelope,
    lowpass_coeff: f32,
    lowpass: [f32; LOWPASS_STAGES],
}

impl Oscillator {
    /// Create an oscillator at phase zero.
    pub fn new(wave: WaveShape, pitch: f32, envelope: Envelope, sample_rate: f32) -> Self {
        Self {
            wave,
            pitch,
            sample_rate,
            phase_inc: f64::from(pitch) / f64::from(sample_rate),
            phase: 0.0,
            last_phase: 0.0,
            realized: pitch,
            envelope,
            lowpass_coeff: lowpass_coeff(sample_rate),
            lowpass: [0.0; LOWPASS_STAGES],
        }
    }

    /// Change waveform without resetting phase.
    pub fn set_wave(&mut self, wave: WaveShape) {
        self.wave = wave;
    }

    /// Waveform.
    pub fn wave(&self) -> WaveShape {
        self.wave
    }

    /// Change nominal frequency without resetting phase.
    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
        self.phase_inc = f64::from(pitch) / f64::from(self.sample_rate);
    }

    /// Nominal frequency in Hz.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Frequency measured from the last phase step, in Hz.
    pub fn realized_frequency(&self) -> f32 {
        self.realized
    }

    /// Phase in cycles, in `[0, 1)` after each advance.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Retune to a new sample rate, keeping pitch in Hz.
    ///
    /// Filter state carries over; only its coefficient changes.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.phase_inc = f64::from(self.pitch) / f64::from(sample_rate);
        self.lowpass_coeff = lowpass_coeff(sample_rate);
        self.envelope.set_sample_rate(sample_rate);
    }

    /// Amplitude envelope.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Step the envelope one sample.
    #[inline]
    pub fn step_envelope(&mut self, gate: bool) {
        self.envelope.step(gate);
    }

    /// Advance one sample and return the enveloped, lowpassed output.
    #[inline]
    pub fn advance(&mut self, table: &WaveTable) -> f32 {
        self.phase += self.phase_inc;
        self.realized = ((self.phase - self.last_phase).abs() * f64::from(self.sample_rate)) as f32;
        self.last_phase = self.phase;

        // Rebase both together so the next measurement is unaffected.
        let whole = self.phase.floor();
        if whole != 0.0 {
            self.phase -= whole;
            self.last_phase -= whole;
        }

        let raw = table.sample(self.wave, self.realized, self.phase as f32) * self.envelope.position();
        self.filter(raw)
    }

    /// y[n] = x[n] + coeff * (y[n-1] - x[n]) per stage, denormals flushed.
    #[inline]
    fn filter(&mut self, input: f32) -> f32 {
        let coeff = self.lowpass_coeff;
        self.lowpass.iter_mut().fold(input, |x, state| {
            let y = x + coeff * (*state - x);
            *state = if y.abs() < 1e-20 { 0.0 } else { y };
            *state
        })
    }

    /// Offset phase by another oscillator's output scaled by `depth`.
    #[inline]
    pub fn modulate_with(&mut self, sample: f32, depth: f32) {
        self.phase += f64::from(sample * depth) / f64::from(self.sample_rate) * MODULATION_INDEX_SCALE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{EnvelopeSpec, PointEnvelope};
    use crate::wavetable::tests::table_48k;

    fn held(level: f32) -> Envelope {
        let spec = EnvelopeSpec::Points(PointEnvelope {
            points: vec![crate::envelope::EnvelopePoint::new(0.0, level)],
            sustain_point: 1,
            release: 1.0,
        });
        Envelope::new(&spec, 48000.0).unwrap()
    }

    #[test]
    fn phase_stays_wrapped() {
        let table = table_48k();
        let mut osc = Oscillator::new(WaveShape::Sine, 1000.0, held(1.0), 48000.0);
        for _ in 0..10_000 {
            osc.advance(&table);
            assert!((0.0..1.0).contains(&osc.phase()));
        }
    }

    #[test]
    fn unmodulated_realized_frequency_matches_pitch() {
        let table = table_48k();
        let mut osc = Oscillator::new(WaveShape::Square, 440.0, held(1.0), 48000.0);
        for _ in 0..1000 {
            osc.advance(&table);
            assert!((osc.realized_frequency() - 440.0).abs() < 0.01);
        }
    }

    #[test]
    fn modulation_raises_realized_frequency() {
        let table = table_48k();
        let mut osc = Oscillator::new(WaveShape::Sine, 100.0, held(1.0), 48000.0);
        osc.advance(&table);
        osc.modulate_with(1.0, 4.8);
        osc.advance(&table);
        // 1.0 * 4.8 / 48000 * 100 = 0.01 cycles on top of 100/48000.
        let expected = 100.0 + 0.01 * 48000.0;
        assert!((osc.realized_frequency() - expected).abs() < 0.5);
    }

    #[test]
    fn output_scaled_by_envelope() {
        let table = table_48k();
        let mut quiet = Oscillator::new(WaveShape::Sine, 440.0, held(0.25), 48000.0);
        let mut loud = Oscillator::new(WaveShape::Sine, 440.0, held(1.0), 48000.0);
        for _ in 0..64 {
            let q = quiet.advance(&table);
            let l = loud.advance(&table);
            assert!((q * 4.0 - l).abs() < 1e-5);
        }
    }

    fn settled_peak(pitch: f32) -> f32 {
        let table = table_48k();
        let mut osc = Oscillator::new(WaveShape::Sine, pitch, held(1.0), 48000.0);
        for _ in 0..2048 {
            osc.advance(&table);
        }
        (0..4800).fold(0.0f32, |m, _| m.max(osc.advance(&table).abs()))
    }

    #[test]
    fn lowpass_passes_low_and_cuts_high() {
        let low = settled_peak(500.0);
        let high = settled_peak(12_000.0);
        assert!(low > 0.95, "500 Hz peak {low}");
        assert!(high < 0.3, "12 kHz peak {high}");
    }

    #[test]
    fn lowpass_cutoff_capped_at_nyquist() {
        let coeff = lowpass_coeff(8000.0);
        assert!((coeff - expf(-TAU * 0.5)).abs() < 1e-6);
        assert!(lowpass_coeff(48000.0) < lowpass_coeff(96000.0));
    }

    #[test]
    fn pitch_change_keeps_phase() {
        let table = table_48k();
        let mut osc = Oscillator::new(WaveShape::Sine, 440.0, held(1.0), 48000.0);
        for _ in 0..37 {
            osc.advance(&table);
        }
        let before = osc.phase();
        osc.set_pitch(880.0);
        assert_eq!(osc.phase(), before);
        assert_eq!(osc.pitch(), 880.0);
    }
}
