//! Soundgen Synth - Additive wavetable synthesis engine
//!
//! This crate provides the render-side building blocks of soundgen:
//! band-limited wavetables, breakpoint envelopes, cross-modulating
//! oscillators, voices, and the polyphonic mixer that consumes control
//! messages.
//!
//! # Core Components
//!
//! ## Wavetables
//!
//! - [`WaveTable`] - Shared band-limited table cache, built once per band limit
//! - [`WaveShape`] - Sine, HalfSine, AbsSine, QuarterSine, PulseSine, Square, Saw
//!
//! ```rust
//! use soundgen_synth::{WaveShape, WaveTable};
//!
//! let table = WaveTable::new(48000.0);
//! let sample = table.sample(WaveShape::Saw, 440.0, 0.25);
//! ```
//!
//! ## Envelopes
//!
//! - [`EnvelopeSpec`] - ADSR rates or explicit breakpoints with a sustain point
//! - [`Envelope`] - Running instance, stepped per sample with a gate
//!
//! ## Instruments and voices
//!
//! - [`Instrument`] / [`OscillatorSpec`] - Oscillator stack with pitch ratios and modulation
//! - [`Voice`] - One sounding note
//! - [`Mixer`] - Instrument slots plus live voices, driven by [`Message`]s
//!
//! # Example: Render a chord
//!
//! ```rust
//! use soundgen_synth::{Instrument, Message, Mixer, Note};
//!
//! let mut mixer = Mixer::new(48000.0);
//! mixer.apply(Message::set_instrument(0, Instrument::sine_wave(3))).unwrap();
//! for (uid, note) in [60.0, 64.0, 67.0].into_iter().enumerate() {
//!     mixer.apply(Message::NoteDown(Note::new(note, 0, uid as u32))).unwrap();
//! }
//!
//! let mut block = [vec![0.0f32; 512]];
//! mixer.write_wave(&mut block);
//! ```
//!
//! # Features
//!
//! - `serde` - Serialize and deserialize instruments, envelopes and notes

pub mod envelope;
pub mod instrument;
pub mod message;
pub mod mixer;
pub mod oscillator;
pub mod voice;
pub mod wavetable;

pub use envelope::{
    AdsrParams, Envelope, EnvelopeError, EnvelopePoint, EnvelopeSpec, EnvelopeState, PointEnvelope,
};
pub use instrument::{Instrument, InstrumentError, MIN_VOLUME, Note, OscillatorSpec, PitchFraction};
pub use message::Message;
pub use mixer::{Mixer, MixerError};
pub use oscillator::{LOWPASS_FREQ, LOWPASS_STAGES, MODULATION_INDEX_SCALE, Oscillator};
pub use voice::{
    MAX_MODULATION, MODULATION_CURVE, Voice, decibels_to_gain, note_to_ratio, scale_modulation,
};
pub use wavetable::{MAX_BAND_LIMIT, MIN_FREQ, TABLE_SIZE, WaveShape, WaveTable};
