//! Display an instrument's oscillators and envelopes.

use super::common::resolve_instrument;
use clap::Args;
use soundgen_synth::{EnvelopeSpec, Instrument, MIN_VOLUME};

/// Describe an instrument.
#[derive(Args)]
pub struct InfoArgs {
    /// Factory instrument name or path to an instrument JSON file
    #[arg(value_name = "NAME_OR_FILE")]
    pub instrument: String,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let instrument = resolve_instrument(&args.instrument)?;
    print_instrument(&instrument);
    Ok(())
}

fn print_instrument(instrument: &Instrument) {
    println!("Title:       {}", instrument.title);
    println!("Base Pitch:  {} Hz", instrument.base_pitch);
    println!("Oscillators: {}", instrument.oscillators.len());
    println!();

    for (index, osc) in instrument.oscillators.iter().enumerate() {
        let volume = if osc.volume <= MIN_VOLUME {
            "silent".to_string()
        } else {
            format!("{} dB", osc.volume)
        };
        println!(
            "  [{index}] {:12} x{}/{}  {}",
            osc.wave.name(),
            osc.pitch_fraction.numerator(),
            osc.pitch_fraction.denominator(),
            volume
        );
        println!("       envelope:   {}", describe_envelope(&osc.envelope));
        if osc.modulation.iter().any(|&depth| depth != 0.0) {
            let sources: Vec<String> = osc
                .modulation
                .iter()
                .enumerate()
                .filter(|&(_, &depth)| depth != 0.0)
                .map(|(source, depth)| format!("{source}:{depth}"))
                .collect();
            println!("       modulation: {}", sources.join(", "));
        }
    }
}

fn describe_envelope(envelope: &EnvelopeSpec) -> String {
    match envelope {
        EnvelopeSpec::Adsr(p) => format!(
            "adsr attack={} decay={} sustain={} release={}",
            p.attack, p.decay, p.sustain, p.release
        ),
        EnvelopeSpec::Points(p) => {
            let sustain = if p.sustain_point == 0 {
                "one-shot".to_string()
            } else {
                format!("sustain at {}", p.sustain_point)
            };
            format!(
                "{} points, {sustain}, release={}",
                p.points.len(),
                p.release
            )
        }
    }
}
