//! soundgen CLI - Command-line interface for the soundgen synthesizer.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soundgen")]
#[command(author, version, about = "soundgen additive synthesizer CLI", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an instrument document for problems
    Validate(commands::validate::ValidateArgs),

    /// Describe an instrument
    Info(commands::info::InfoArgs),

    /// List and show factory instruments
    Presets(commands::presets::PresetsArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// Play notes through an audio device
    Play(commands::play::PlayArgs),

    /// Render notes offline and print level statistics
    Render(commands::render::RenderArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Presets(args) => commands::presets::run(args),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Render(args) => commands::render::run(args),
    }
}
