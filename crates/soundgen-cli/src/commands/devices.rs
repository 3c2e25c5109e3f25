//! Audio output device listing.

use clap::Args;
use soundgen_io::{default_output_device, list_output_devices};

/// List audio output devices.
#[derive(Args)]
pub struct DevicesArgs {
    /// Only show the default output device
    #[arg(long)]
    default: bool,
}

/// Run the devices command.
pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    if args.default {
        match default_output_device()? {
            Some(device) => {
                println!("Default Output:");
                println!("  Name: {}", device.name);
                println!("  Channels: {}", device.channels);
                println!("  Sample Rate: {} Hz", device.default_sample_rate);
            }
            None => println!("Default Output: None"),
        }
        return Ok(());
    }

    let devices = list_output_devices()?;
    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }

    println!("Output Devices:");
    for (idx, device) in devices.iter().enumerate() {
        let marker = if device.is_default { " (default)" } else { "" };
        println!(
            "  [{}] {} ({} ch, {} Hz){}",
            idx, device.name, device.channels, device.default_sample_rate, marker
        );
    }
    println!();
    println!("Tip: Use device index or partial name with --output:");
    println!("  soundgen play --instrument organ --notes 60,64,67 --output 0");
    Ok(())
}
