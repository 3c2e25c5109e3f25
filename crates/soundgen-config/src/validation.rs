//! Instrument and note validation.
//!
//! Documents are checked at the control boundary, before anything reaches
//! the render side. Unlike [`Instrument::validate`], which stops at the first
//! problem, these functions collect every problem so an editor can report
//! them together.
//!
//! # Example
//!
//! ```rust
//! use soundgen_config::validate_instrument;
//! use soundgen_synth::Instrument;
//!
//! let mut inst = Instrument::sine_wave(2);
//! validate_instrument(&inst).expect("default instrument is valid");
//!
//! inst.base_pitch = -1.0;
//! inst.oscillators[1].modulation.clear();
//! assert!(validate_instrument(&inst).is_err());
//! ```

use soundgen_synth::{Instrument, InstrumentError, Note};
use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Instrument-level problem.
    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    /// Note number is not finite.
    #[error("note {uid} has invalid pitch {note}")]
    InvalidNote {
        /// Note uid.
        uid: u32,
        /// The offending note number.
        note: f32,
    },

    /// Title is empty.
    #[error("instrument title is empty")]
    EmptyTitle,

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check every oscillator of `instrument`, collecting all problems.
pub fn validate_instrument(instrument: &Instrument) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if instrument.title.trim().is_empty() {
        errors.push(ValidationError::EmptyTitle);
    }
    if instrument.oscillators.is_empty() {
        errors.push(InstrumentError::NoOscillators.into());
    }
    if !instrument.base_pitch.is_finite() || instrument.base_pitch <= 0.0 {
        errors.push(InstrumentError::InvalidBasePitch(instrument.base_pitch).into());
    }
    for (index, osc) in instrument.oscillators.iter().enumerate() {
        if let Err(err) = osc.validate(index) {
            errors.push(err.into());
        }
    }

    collect(errors)
}

/// Check a note's pitch is usable.
pub fn validate_note(note: &Note) -> ValidationResult<()> {
    if note.note.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidNote {
            uid: note.uid,
            note: note.note,
        })
    }
}

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
