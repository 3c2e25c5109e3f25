//! Factory instrument commands.

use clap::{Args, Subcommand};
use soundgen_config::{InstrumentDocument, factory_preset_names, get_factory_preset};

/// List and show factory instruments.
#[derive(Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    command: Option<PresetsCommand>,
}

#[derive(Subcommand)]
enum PresetsCommand {
    /// List factory instruments
    List,

    /// Print a factory instrument as a JSON document
    Show {
        /// Factory instrument name
        name: String,
    },
}

/// Run the presets command.
pub fn run(args: PresetsArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(PresetsCommand::List) {
        PresetsCommand::List => list_presets(),
        PresetsCommand::Show { name } => show_preset(&name),
    }
}

fn list_presets() -> anyhow::Result<()> {
    println!("Factory Instruments:");
    println!("====================");
    for name in factory_preset_names() {
        match get_factory_preset(name) {
            Some(inst) => println!(
                "  {:10} - {} ({} oscillators)",
                name,
                inst.title,
                inst.oscillators.len()
            ),
            None => println!("  {name:10} - (error loading)"),
        }
    }
    println!();
    println!("Use with: soundgen play --instrument <name> --notes 60,64,67");
    Ok(())
}

fn show_preset(name: &str) -> anyhow::Result<()> {
    let Some(inst) = get_factory_preset(name) else {
        anyhow::bail!(
            "unknown factory instrument '{name}' (available: {})",
            factory_preset_names().join(", ")
        );
    };
    println!("{}", InstrumentDocument::new(inst).to_json()?);
    Ok(())
}
