//! Live note playback command.

use super::common::resolve_instrument;
use clap::Args;
use soundgen_io::{AudioStream, EngineConfig, engine_channel};
use soundgen_synth::Note;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Play notes through an audio device.
#[derive(Args)]
pub struct PlayArgs {
    /// Factory instrument name or path to an instrument JSON file
    #[arg(short, long)]
    instrument: String,

    /// Comma-separated note numbers (69 = A440)
    #[arg(short, long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    notes: Vec<f32>,

    /// Seconds each note (or the chord) is held
    #[arg(short, long, default_value = "0.5")]
    duration: f32,

    /// Play all notes at once instead of one after another
    #[arg(long)]
    chord: bool,

    /// Seconds to keep the stream open after the last release
    #[arg(long, default_value = "1.0")]
    tail: f32,

    /// Output device (index, exact name, or partial name)
    #[arg(short, long)]
    output: Option<String>,
}

/// Run the play command.
pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.duration.is_finite() && args.duration > 0.0,
        "duration must be positive"
    );
    let instrument = resolve_instrument(&args.instrument)?;
    println!(
        "Instrument: {} ({} oscillators)",
        instrument.title,
        instrument.oscillators.len()
    );

    let mut stream = AudioStream::new(args.output.as_deref())?;
    let channels = usize::from(stream.channels());
    let config = EngineConfig {
        sample_rate: stream.sample_rate(),
        channels,
        ..EngineConfig::default()
    };
    println!(
        "Output: {} ({} Hz, {} ch)",
        stream.device_name(),
        config.sample_rate,
        channels
    );

    let (controller, mut engine) = engine_channel(&config);
    controller.set_instrument(0, instrument)?;

    let running = stream.running();
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    stream.start_output(move |data: &mut [f32]| engine.process_interleaved(data))?;
    println!("\nPlaying... Press Ctrl+C to stop.\n");

    let hold = Duration::from_secs_f32(args.duration);
    if args.chord {
        for (uid, &note) in args.notes.iter().enumerate() {
            controller.note_down(Note::new(note, 0, uid as u32))?;
        }
        wait(&running, hold);
        controller.all_notes_off()?;
    } else {
        for (uid, &note) in args.notes.iter().enumerate() {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            let uid = uid as u32;
            controller.note_down(Note::new(note, 0, uid))?;
            wait(&running, hold);
            controller.note_up(uid)?;
        }
    }
    wait(&running, Duration::from_secs_f32(args.tail.max(0.0)));
    stream.stop();

    let dropped = controller.dropped_events();
    if dropped > 0 {
        tracing::warn!(dropped, "note events were dropped");
    }
    if stream.error_count() > 0 {
        tracing::warn!(errors = stream.error_count(), "output stream reported errors");
    }
    println!("Done!");
    Ok(())
}

/// Sleep for `duration` or until `running` goes false.
fn wait(running: &AtomicBool, duration: Duration) {
    let start = Instant::now();
    while running.load(Ordering::SeqCst) && start.elapsed() < duration {
        std::thread::sleep(Duration::from_millis(10));
    }
}
