//! Offline rendering with level statistics.
//!
//! Notes are held together for `--hold` seconds, released, and the engine
//! keeps running until it falls silent or `--seconds` runs out. Nothing is
//! written to disk.

use super::common::{format_level, resolve_instrument};
use clap::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use soundgen_io::{EngineConfig, SynthEngine, engine_channel};
use soundgen_synth::Note;

/// Render notes offline.
#[derive(Args)]
pub struct RenderArgs {
    /// Factory instrument name or path to an instrument JSON file
    #[arg(short, long)]
    instrument: String,

    /// Comma-separated note numbers (69 = A440)
    #[arg(short, long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    notes: Vec<f32>,

    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Maximum rendered length in seconds
    #[arg(long, default_value = "4.0")]
    seconds: f32,

    /// How long notes are held before release, in seconds
    #[arg(long, default_value = "1.0")]
    hold: f32,

    /// Block size in frames
    #[arg(long, default_value = "256")]
    block_size: usize,

    /// Reroll the instrument's shapes, envelopes and ratios from this seed
    #[arg(long, value_name = "SEED")]
    randomize: Option<u64>,
}

/// Level statistics for a render.
#[derive(Debug, Default)]
struct Stats {
    peak: f32,
    sum_squares: f64,
    frames: usize,
    silent_at: Option<usize>,
}

impl Stats {
    fn add(&mut self, block: &[f32]) {
        for &sample in block {
            self.peak = self.peak.max(sample.abs());
            self.sum_squares += f64::from(sample) * f64::from(sample);
        }
        self.frames += block.len();
    }

    fn rms(&self) -> f32 {
        if self.frames == 0 {
            0.0
        } else {
            (self.sum_squares / self.frames as f64).sqrt() as f32
        }
    }
}

/// Run the render command.
pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.sample_rate > 0, "sample rate must be positive");
    anyhow::ensure!(args.block_size > 0, "block size must be positive");
    anyhow::ensure!(
        args.seconds.is_finite() && args.seconds > 0.0,
        "seconds must be positive"
    );

    let mut instrument = resolve_instrument(&args.instrument)?;
    if let Some(seed) = args.randomize {
        instrument = instrument.randomize(&mut StdRng::seed_from_u64(seed));
        tracing::debug!(seed, "randomized instrument");
    }
    let title = instrument.title.clone();

    let config = EngineConfig {
        sample_rate: args.sample_rate,
        block_size: args.block_size,
        channels: 1,
    };
    let (controller, mut engine) = engine_channel(&config);
    controller.set_instrument(0, instrument)?;
    for (uid, &note) in args.notes.iter().enumerate() {
        controller.note_down(Note::new(note, 0, uid as u32))?;
    }

    let sample_rate = args.sample_rate as f32;
    let total = (args.seconds * sample_rate) as usize;
    let hold = (args.hold.max(0.0) * sample_rate) as usize;
    let mut block = vec![0.0f32; args.block_size];
    let mut stats = Stats::default();
    let mut released = false;

    while stats.frames < total {
        if !released && stats.frames >= hold {
            controller.all_notes_off()?;
            released = true;
        }
        let len = args.block_size.min(total - stats.frames);
        render_block(&mut engine, &mut block[..len]);
        stats.add(&block[..len]);

        if engine.voice_count() == 0 {
            stats.silent_at = Some(stats.frames);
            break;
        }
    }

    let dropped = controller.dropped_events();
    tracing::debug!(frames = stats.frames, dropped, "render finished");

    let notes: Vec<String> = args.notes.iter().map(ToString::to_string).collect();
    println!("Instrument:  {title}");
    if let Some(seed) = args.randomize {
        println!("Randomized:  seed {seed}");
    }
    println!("Notes:       {}", notes.join(", "));
    println!("Sample Rate: {} Hz", args.sample_rate);
    println!("Peak:        {}", format_level(stats.peak));
    println!("RMS:         {}", format_level(stats.rms()));
    match stats.silent_at {
        Some(frames) => println!("Silent at:   {:.3}s", frames as f32 / sample_rate),
        None => println!(
            "Silent at:   still sounding after {:.3}s",
            stats.frames as f32 / sample_rate
        ),
    }
    Ok(())
}

fn render_block(engine: &mut SynthEngine, block: &mut [f32]) {
    engine.process(&mut [block]);
}
