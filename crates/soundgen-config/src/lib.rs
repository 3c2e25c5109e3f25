//! Instrument documents and factory instruments for soundgen.
//!
//! This crate sits at the control boundary: everything it hands to the
//! synthesis engine has been parsed, version-checked and validated.
//!
//! # Features
//!
//! - **Documents**: Load and save versioned instrument JSON
//! - **Legacy ratios**: Float `pitchRatio` values become simple fractions on load
//! - **Validation**: Every problem in an instrument reported together
//! - **Factory Presets**: Built-in instruments for common sounds
//!
//! # Example
//!
//! ```rust,no_run
//! use soundgen_config::{InstrumentDocument, get_factory_preset};
//!
//! let bell = get_factory_preset("bell").unwrap();
//! InstrumentDocument::new(bell).save("bell.json").unwrap();
//!
//! let loaded = InstrumentDocument::load("bell.json").unwrap();
//! println!("{} v{}", loaded.instrument.title, loaded.version);
//! ```

mod document;
mod error;

/// Instrument and note validation.
pub mod validation;

/// Factory instruments bundled with the library.
pub mod factory_presets;

pub use document::{
    CURRENT_VERSION, InstrumentDocument, RATIO_TOLERANCE, estimate_fraction, load_instrument,
};
pub use error::ConfigError;
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_preset_names, factory_presets, get_factory_preset,
    is_factory_preset,
};
pub use validation::{ValidationError, ValidationResult, validate_instrument, validate_note};
