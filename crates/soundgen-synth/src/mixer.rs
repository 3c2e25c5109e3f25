//! Polyphonic mixer: instrument slots, live voices and block rendering.
//!
//! The mixer owns everything the render side touches. It allocates only
//! when a note starts or an instrument changes shape; rendering a block
//! writes into caller-provided channel buffers.

use crate::instrument::{Instrument, InstrumentError, Note};
use crate::message::Message;
use crate::voice::Voice;
use crate::wavetable::WaveTable;
use std::sync::Arc;
use thiserror::Error;

/// Non-fatal problems reported by mixer operations.
///
/// None of these leave the mixer in a bad state; callers log and carry on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixerError {
    /// Note-down names a slot with no instrument.
    #[error("note {uid} dropped: instrument slot {slot} is unassigned")]
    UnassignedSlot {
        /// Slot requested.
        slot: usize,
        /// Note uid.
        uid: u32,
    },

    /// Note-up for a uid no voice carries.
    #[error("no sounding note with uid {0}")]
    UnknownVoice(u32),

    /// Instrument could not be applied to a voice.
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
}

/// Polyphonic voice mixer.
///
/// # Example
///
/// ```rust
/// use soundgen_synth::{Instrument, Mixer, Note};
/// use std::sync::Arc;
///
/// let mut mixer = Mixer::new(48000.0);
/// mixer.set_instrument(0, Arc::new(Instrument::sine_wave(2))).unwrap();
/// mixer.note_down(Note::new(60.0, 0, 1)).unwrap();
///
/// let mut left = vec![0.0f32; 256];
/// let mut right = vec![0.0f32; 256];
/// mixer.write_wave(&mut [&mut left[..], &mut right[..]]);
/// assert_eq!(left, right);
///
/// mixer.note_up(1).unwrap();
/// ```
#[derive(Debug)]
pub struct Mixer {
    sample_rate: f32,
    wave_table: Arc<WaveTable>,
    instruments: Vec<Option<Arc<Instrument>>>,
    voices: Vec<Voice>,
}

impl Mixer {
    /// Create a mixer, building a wave table for `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_wave_table(sample_rate, Arc::new(WaveTable::new(sample_rate)))
    }

    /// Create a mixer around an existing table.
    pub fn with_wave_table(sample_rate: f32, wave_table: Arc<WaveTable>) -> Self {
        Self {
            sample_rate,
            wave_table,
            instruments: Vec::new(),
            voices: Vec::new(),
        }
    }

    /// Current sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Table in use.
    pub fn wave_table(&self) -> &Arc<WaveTable> {
        &self.wave_table
    }

    /// Number of live voices, including releasing ones.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Live voices in start order.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Instrument assigned to `slot`.
    pub fn instrument(&self, slot: usize) -> Option<&Arc<Instrument>> {
        self.instruments.get(slot).and_then(Option::as_ref)
    }

    /// Change sample rate, rebuilding the table only if its band limit changes.
    ///
    /// Rebuilding allocates; use [`Mixer::install_wave_table`] with a table
    /// built elsewhere when this runs on the audio thread.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if !self.wave_table.is_compatible(sample_rate) {
            self.wave_table = Arc::new(WaveTable::new(sample_rate));
        }
        self.retune(sample_rate);
    }

    /// Change sample rate using a table built for it.
    ///
    /// The previous table is released here. On the audio thread, hold
    /// another reference elsewhere so this is never the last one.
    pub fn install_wave_table(&mut self, sample_rate: f32, wave_table: Arc<WaveTable>) {
        self.wave_table = wave_table;
        self.retune(sample_rate);
    }

    fn retune(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for voice in &mut self.voices {
            voice.set_sample_rate(sample_rate);
        }
    }

    /// Assign `instrument` to `slot`, growing the slot list as needed.
    ///
    /// Voices already playing from that slot take the new settings at once.
    /// An invalid instrument is rejected before the slot or any voice changes.
    pub fn set_instrument(&mut self, slot: usize, instrument: Arc<Instrument>) -> Result<(), MixerError> {
        instrument.validate()?;
        for voice in self.voices.iter_mut().filter(|v| v.slot() == slot) {
            voice.update_instrument(&instrument)?;
        }
        if slot >= self.instruments.len() {
            self.instruments.resize(slot + 1, None);
        }
        self.instruments[slot] = Some(instrument);
        Ok(())
    }

    /// Start a voice for `note`.
    pub fn note_down(&mut self, note: Note) -> Result<(), MixerError> {
        let Some(instrument) = self.instrument(note.instrument_slot) else {
            return Err(MixerError::UnassignedSlot {
                slot: note.instrument_slot,
                uid: note.uid,
            });
        };
        let voice = Voice::new(instrument, note, self.sample_rate)?;
        self.voices.push(voice);
        Ok(())
    }

    /// Release the oldest gated voice with `uid`.
    ///
    /// A uid whose voices are all already releasing is a no-op.
    pub fn note_up(&mut self, uid: u32) -> Result<(), MixerError> {
        let mut known = false;
        for voice in self.voices.iter_mut().filter(|v| v.uid() == uid) {
            if voice.is_gated() {
                voice.release();
                return Ok(());
            }
            known = true;
        }
        if known {
            Ok(())
        } else {
            Err(MixerError::UnknownVoice(uid))
        }
    }

    /// Release every voice; they fade out through their envelopes.
    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            voice.release();
        }
    }

    /// Drop every voice immediately.
    pub fn clear(&mut self) {
        self.voices.clear();
    }

    /// Render one block: zero the channels, add every voice, then drop
    /// voices that have finished.
    pub fn write_wave<C: AsMut<[f32]>>(&mut self, channels: &mut [C]) {
        for channel in channels.iter_mut() {
            channel.as_mut().fill(0.0);
        }
        for voice in &mut self.voices {
            voice.add_wave(&self.wave_table, channels);
        }
        self.voices.retain(|voice| !voice.is_stopped());
    }

    /// Dispatch a control message.
    pub fn apply(&mut self, message: Message) -> Result<(), MixerError> {
        match message {
            Message::SetSampleRate {
                sample_rate,
                wave_table,
            } => {
                self.install_wave_table(sample_rate, wave_table);
                Ok(())
            }
            Message::SetInstrument { slot, instrument } => self.set_instrument(slot, instrument),
            Message::NoteDown(note) => self.note_down(note),
            Message::NoteUp(uid) => self.note_up(uid),
            Message::AllNotesOff => {
                self.release_all();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{AdsrParams, EnvelopeSpec};
    use crate::wavetable::tests::table_48k;

    const SR: f32 = 48000.0;

    fn mixer() -> Mixer {
        Mixer::with_wave_table(SR, table_48k())
    }

    fn quick(count: usize) -> Arc<Instrument> {
        let mut inst = Instrument::sine_wave(count);
        for osc in &mut inst.oscillators {
            osc.envelope = EnvelopeSpec::Adsr(AdsrParams {
                attack: 1000.0,
                decay: 1000.0,
                sustain: 0.8,
                release: 500.0,
            });
        }
        Arc::new(inst)
    }

    fn render(mixer: &mut Mixer, frames: usize) -> Vec<f32> {
        let mut out = [vec![0.0f32; frames]];
        mixer.write_wave(&mut out);
        let [mono] = out;
        mono
    }

    #[test]
    fn empty_mixer_writes_silence() {
        let mut mixer = mixer();
        let mut channels = [vec![1.0f32; 64], vec![-1.0f32; 64]];
        mixer.write_wave(&mut channels);
        assert!(channels.iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn note_lifecycle() {
        let mut mixer = mixer();
        mixer.set_instrument(0, quick(1)).unwrap();
        mixer.note_down(Note::new(69.0, 0, 3)).unwrap();
        assert_eq!(mixer.voice_count(), 1);

        let block = render(&mut mixer, 512);
        assert!(block.iter().any(|s| s.abs() > 0.1));

        mixer.note_up(3).unwrap();
        render(&mut mixer, 512);
        assert_eq!(mixer.voice_count(), 0);

        let block = render(&mut mixer, 64);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn rejected_edit_leaves_slot_and_voices_alone() {
        let mut mixer = mixer();
        let original = quick(1);
        mixer.set_instrument(0, Arc::clone(&original)).unwrap();
        mixer.note_down(Note::new(69.0, 0, 1)).unwrap();
        render(&mut mixer, 128);

        let mut bad = Instrument::sine_wave(3);
        bad.oscillators[2].envelope = EnvelopeSpec::Adsr(AdsrParams {
            release: 0.0,
            ..AdsrParams::default()
        });
        assert!(matches!(
            mixer.set_instrument(0, Arc::new(bad)),
            Err(MixerError::Instrument(InstrumentError::Envelope { index: 2, .. }))
        ));

        assert!(Arc::ptr_eq(mixer.instrument(0).unwrap(), &original));
        let voice = &mixer.voices()[0];
        assert_eq!(voice.oscillators().len(), 1);
        assert_eq!(voice.gains().len(), 1);
        assert_eq!(voice.modulation().len(), 1);

        let block = render(&mut mixer, 256);
        assert!(block.iter().all(|s| s.is_finite()));
        assert!(block.iter().any(|s| s.abs() > 0.1));

        // A rejected instrument for a fresh slot does not create it.
        let mut empty = Instrument::sine_wave(1);
        empty.oscillators.clear();
        assert!(mixer.set_instrument(4, Arc::new(empty)).is_err());
        assert!(mixer.instrument(4).is_none());
    }

    #[test]
    fn unassigned_slot_is_reported() {
        let mut mixer = mixer();
        mixer.set_instrument(2, quick(1)).unwrap();
        assert_eq!(
            mixer.note_down(Note::new(60.0, 1, 9)),
            Err(MixerError::UnassignedSlot { slot: 1, uid: 9 })
        );
        assert_eq!(
            mixer.note_down(Note::new(60.0, 5, 9)),
            Err(MixerError::UnassignedSlot { slot: 5, uid: 9 })
        );
        assert_eq!(mixer.voice_count(), 0);
        assert!(mixer.instrument(2).is_some());
    }

    #[test]
    fn note_up_for_unknown_uid() {
        let mut mixer = mixer();
        assert_eq!(mixer.note_up(42), Err(MixerError::UnknownVoice(42)));
    }

    #[test]
    fn duplicate_uids_release_oldest_first() {
        let mut mixer = mixer();
        mixer.set_instrument(0, quick(1)).unwrap();
        mixer.note_down(Note::new(60.0, 0, 1)).unwrap();
        mixer.note_down(Note::new(64.0, 0, 1)).unwrap();

        mixer.note_up(1).unwrap();
        assert!(!mixer.voices()[0].is_gated());
        assert!(mixer.voices()[1].is_gated());

        mixer.note_up(1).unwrap();
        assert!(!mixer.voices()[1].is_gated());

        // Everything with that uid is already releasing.
        assert_eq!(mixer.note_up(1), Ok(()));
        assert_eq!(mixer.voice_count(), 2);
    }

    #[test]
    fn instrument_swap_updates_sounding_voices() {
        let mut mixer = mixer();
        mixer.set_instrument(0, quick(1)).unwrap();
        mixer.set_instrument(1, quick(1)).unwrap();
        mixer.note_down(Note::new(69.0, 0, 1)).unwrap();
        mixer.note_down(Note::new(69.0, 1, 2)).unwrap();
        render(&mut mixer, 128);

        let mut louder = (*quick(2)).clone();
        louder.base_pitch = 220.0;
        mixer.set_instrument(0, Arc::new(louder)).unwrap();

        assert_eq!(mixer.voices()[0].oscillators().len(), 2);
        assert!((mixer.voices()[0].oscillators()[0].pitch() - 220.0).abs() < 1e-3);
        assert_eq!(mixer.voices()[1].oscillators().len(), 1);
        assert!((mixer.voices()[1].oscillators()[0].pitch() - 440.0).abs() < 1e-3);
    }

    #[test]
    fn all_notes_off_and_clear() {
        let mut mixer = mixer();
        mixer.set_instrument(0, quick(1)).unwrap();
        for uid in 0..4 {
            mixer.note_down(Note::new(60.0 + uid as f32, 0, uid)).unwrap();
        }
        mixer.apply(Message::AllNotesOff).unwrap();
        assert!(mixer.voices().iter().all(|v| !v.is_gated()));

        mixer.note_down(Note::new(72.0, 0, 10)).unwrap();
        mixer.clear();
        assert_eq!(mixer.voice_count(), 0);
    }

    #[test]
    fn compatible_sample_rate_keeps_table() {
        let mut mixer = mixer();
        let before = Arc::clone(mixer.wave_table());
        mixer.set_sample_rate(44100.0);
        assert!(Arc::ptr_eq(&before, mixer.wave_table()));
        assert_eq!(mixer.sample_rate(), 44100.0);
    }

    #[test]
    fn messages_dispatch() {
        let mut mixer = mixer();
        mixer.apply(Message::SetInstrument { slot: 0, instrument: quick(1) }).unwrap();
        mixer.apply(Message::NoteDown(Note::new(60.0, 0, 5))).unwrap();
        mixer.apply(Message::NoteUp(5)).unwrap();
        assert_eq!(mixer.apply(Message::NoteUp(6)), Err(MixerError::UnknownVoice(6)));
        mixer
            .apply(Message::SetSampleRate {
                sample_rate: 96000.0,
                wave_table: table_48k(),
            })
            .unwrap();
        assert_eq!(mixer.sample_rate(), 96000.0);
    }
}
