//! Real-time plumbing for soundgen.
//!
//! This crate provides:
//!
//! - **Engine channel**: [`engine_channel`] splits the synthesizer into a
//!   [`Controller`] for the UI/control thread and a [`SynthEngine`] owned by
//!   the audio callback, joined by a lock-free queue
//! - **Real-time streaming**: [`AudioStream`] for live output through cpal
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use soundgen_io::{AudioStream, EngineConfig, engine_channel};
//! use soundgen_config::get_factory_preset;
//! use soundgen_synth::Note;
//!
//! let mut stream = AudioStream::new(None)?;
//! let config = EngineConfig {
//!     sample_rate: stream.sample_rate(),
//!     channels: usize::from(stream.channels()),
//!     ..EngineConfig::default()
//! };
//! let (mut controller, mut engine) = engine_channel(&config);
//!
//! controller.set_instrument(0, get_factory_preset("organ").unwrap())?;
//! controller.note_down(Note::new(60.0, 0, 1))?;
//! stream.start_output(move |data| engine.process_interleaved(data))?;
//! ```

mod engine;
mod stream;

pub use engine::{Controller, EngineConfig, SynthEngine, engine_channel};
pub use stream::{AudioDevice, AudioStream, default_output_device, list_output_devices};

use soundgen_config::ValidationError;

/// Error types for the engine and audio I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Instrument rejected before it was sent to the engine.
    #[error("Invalid instrument: {0}")]
    InvalidInstrument(#[source] ValidationError),

    /// Note rejected before it was sent to the engine.
    #[error("Invalid note: {0}")]
    InvalidNote(#[source] ValidationError),

    /// The render side has been dropped.
    #[error("Engine is no longer running")]
    Disconnected,
}

/// Convenience result type for engine and audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
