//! Control messages consumed by the mixer.
//!
//! Anything expensive (table generation, instrument parsing) happens on the
//! sending side; a message only hands over finished, shared data.

use crate::instrument::{Instrument, Note};
use crate::wavetable::WaveTable;
use std::sync::Arc;

/// A control-to-render command.
#[derive(Debug, Clone)]
pub enum Message {
    /// Switch sample rate and install a table built for it.
    SetSampleRate {
        /// New rate in Hz.
        sample_rate: f32,
        /// Table for that rate.
        wave_table: Arc<WaveTable>,
    },
    /// Assign an instrument to a slot; sounding voices in that slot follow it.
    SetInstrument {
        /// Slot index.
        slot: usize,
        /// The instrument.
        instrument: Arc<Instrument>,
    },
    /// Start a note.
    NoteDown(Note),
    /// Release the note with this uid.
    NoteUp(u32),
    /// Release every sounding note.
    AllNotesOff,
}

impl Message {
    /// Build a table for `sample_rate` and wrap it in a message.
    pub fn set_sample_rate(sample_rate: f32) -> Self {
        Message::SetSampleRate {
            sample_rate,
            wave_table: Arc::new(WaveTable::new(sample_rate)),
        }
    }

    /// Like [`Message::set_sample_rate`] but reuses `current` when its band
    /// limit already fits.
    pub fn set_sample_rate_reusing(sample_rate: f32, current: &Arc<WaveTable>) -> Self {
        if current.is_compatible(sample_rate) {
            Message::SetSampleRate {
                sample_rate,
                wave_table: Arc::clone(current),
            }
        } else {
            Self::set_sample_rate(sample_rate)
        }
    }

    /// Wrap an instrument for `slot`.
    pub fn set_instrument(slot: usize, instrument: Instrument) -> Self {
        Message::SetInstrument {
            slot,
            instrument: Arc::new(instrument),
        }
    }
}
