//! Instrument document validation command.

use clap::Args;
use soundgen_config::{ConfigError, InstrumentDocument, ValidationError};
use std::path::PathBuf;

/// Check an instrument document.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the instrument JSON file
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

/// Run the validate command.
pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    match InstrumentDocument::load(&args.file) {
        Ok(doc) => {
            println!(
                "OK: {} (v{}, {} oscillators)",
                doc.instrument.title,
                doc.version,
                doc.instrument.oscillators.len()
            );
            Ok(())
        }
        Err(ConfigError::Validation(ValidationError::Multiple(errors))) => {
            println!("{}: {} problems", args.file.display(), errors.len());
            for err in &errors {
                println!("  - {err}");
            }
            anyhow::bail!("{} is not a valid instrument", args.file.display())
        }
        Err(err) => Err(err.into()),
    }
}
