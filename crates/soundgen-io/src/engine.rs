//! Control/render split of the synthesizer.
//!
//! The [`Controller`] lives wherever edits and note events come from. The
//! [`SynthEngine`] lives in the audio callback and owns the [`Mixer`]. The
//! only link between them is an unbounded channel of [`Message`]s, drained
//! at the start of every block, so the audio thread never waits on a lock.
//!
//! Everything expensive happens on the controller side: instruments are
//! validated and wave tables are built before the message is queued. A
//! replaced wave table is also freed there, never in the audio callback.

use crossbeam_channel::{Receiver, Sender, unbounded};
use soundgen_config::{validate_instrument, validate_note};
use soundgen_synth::{Instrument, Message, Mixer, Note, WaveTable};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{Error, Result};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Expected block size in frames; scratch space is sized for it.
    pub block_size: usize,
    /// Channels per frame in the buffers passed to
    /// [`SynthEngine::process_interleaved`].
    pub channels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 256,
            channels: 2,
        }
    }
}

/// Create a connected controller and engine.
pub fn engine_channel(config: &EngineConfig) -> (Controller, SynthEngine) {
    let (tx, rx) = unbounded();
    let dropped = Arc::new(AtomicU32::new(0));
    let wave_table = Arc::new(WaveTable::new(config.sample_rate as f32));

    let controller = Controller {
        tx,
        sample_rate: config.sample_rate,
        wave_table: Arc::clone(&wave_table),
        retired: Vec::new(),
        dropped: Arc::clone(&dropped),
    };
    let engine = SynthEngine {
        mixer: Mixer::with_wave_table(config.sample_rate as f32, wave_table),
        rx,
        dropped,
        channels: config.channels.max(1),
        scratch: vec![0.0; config.block_size],
    };
    (controller, engine)
}

/// Sending half: validates and queues control messages.
#[derive(Clone)]
pub struct Controller {
    tx: Sender<Message>,
    sample_rate: u32,
    wave_table: Arc<WaveTable>,
    /// Replaced tables the engine may still hold. Each is dropped here once
    /// this is the only reference left.
    retired: Vec<Arc<WaveTable>>,
    dropped: Arc<AtomicU32>,
}

impl Controller {
    /// Sample rate most recently sent to the engine.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Switch the engine to `sample_rate`.
    ///
    /// The wave table is rebuilt here, off the audio thread, and only when
    /// the current one cannot serve the new rate. The old table is kept
    /// until the engine has let go of it.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        self.retired.retain(|table| Arc::strong_count(table) > 1);
        let message = Message::set_sample_rate_reusing(sample_rate as f32, &self.wave_table);
        if let Message::SetSampleRate { wave_table, .. } = &message {
            if !Arc::ptr_eq(wave_table, &self.wave_table) {
                tracing::debug!(
                    sample_rate,
                    band_limit = wave_table.band_limit(),
                    "rebuilt wave table"
                );
                let old = std::mem::replace(&mut self.wave_table, Arc::clone(wave_table));
                self.retired.push(old);
            }
        }
        self.sample_rate = sample_rate;
        tracing::info!(sample_rate, "sample rate changed");
        self.send(message)
    }

    /// Validate `instrument` and assign it to `slot`.
    pub fn set_instrument(&self, slot: usize, instrument: Instrument) -> Result<()> {
        validate_instrument(&instrument).map_err(Error::InvalidInstrument)?;
        tracing::debug!(slot, title = %instrument.title, "instrument assigned");
        self.send(Message::set_instrument(slot, instrument))
    }

    /// Start a note.
    pub fn note_down(&self, note: Note) -> Result<()> {
        validate_note(&note).map_err(Error::InvalidNote)?;
        self.send(Message::NoteDown(note))
    }

    /// Release the note with `uid`.
    pub fn note_up(&self, uid: u32) -> Result<()> {
        self.send(Message::NoteUp(uid))
    }

    /// Release every sounding note.
    pub fn all_notes_off(&self) -> Result<()> {
        self.send(Message::AllNotesOff)
    }

    /// Count of note events the engine has dropped so far.
    ///
    /// A note-down for an empty slot or a note-up for an unknown uid is
    /// logged and counted rather than reported back.
    pub fn dropped_events(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::Disconnected)
    }
}

/// Receiving half: applies queued messages and renders blocks.
pub struct SynthEngine {
    mixer: Mixer,
    rx: Receiver<Message>,
    dropped: Arc<AtomicU32>,
    channels: usize,
    /// One mono block, rendered before fanning out to the channels.
    scratch: Vec<f32>,
}

impl SynthEngine {
    /// Apply pending messages, then fill every channel with the next block.
    ///
    /// Prior contents of `channels` are replaced.
    pub fn process<C: AsMut<[f32]>>(&mut self, channels: &mut [C]) {
        self.drain();
        self.mixer.write_wave(channels);
    }

    /// Like [`SynthEngine::process`] for an interleaved device buffer of
    /// [`EngineConfig::channels`] channels.
    ///
    /// Trailing samples that do not make up a whole frame are zeroed.
    pub fn process_interleaved(&mut self, data: &mut [f32]) {
        let channels = self.channels;
        let frames = data.len() / channels;
        if self.scratch.len() < frames {
            self.scratch.resize(frames, 0.0);
        }

        self.drain();
        let mono = &mut self.scratch[..frames];
        self.mixer.write_wave(&mut [&mut *mono]);

        let (whole, rest) = data.split_at_mut(frames * channels);
        for (frame, &sample) in whole.chunks_exact_mut(channels).zip(mono.iter()) {
            frame.fill(sample);
        }
        rest.fill(0.0);
    }

    /// Number of voices currently sounding.
    pub fn voice_count(&self) -> usize {
        self.mixer.voice_count()
    }

    /// Current sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.mixer.sample_rate()
    }

    /// Channels per interleaved frame.
    pub fn channels(&self) -> usize {
        self.channels
    }

    fn drain(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            if let Err(err) = self.mixer.apply(message) {
                tracing::warn!(%err, "dropped control event");
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
