//! # Pitch Monitor - Terminal Front-End
//!
//! Runs a live monitoring session and prints one line per processed block.
//!
//! ## Architecture
//! - **Main Thread**: CLI parsing, stdin command loop
//! - **Session Thread**: audio capture and the processing loop (`pitch-core`)
//! - **Communication**: crossbeam channels inside the core, a shared
//!   reference cell for note changes

mod console;

use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use console::{Command, Console, TerminalSink};
use pitch_core::{
    audio,
    config::MonitorConfig,
    reference::{ReferenceCell, ReferenceTone},
    session::{self, StreamRunner},
    tuning,
};

#[derive(Parser, Debug)]
#[command(name = "pitch-monitor", version, about = "Real-time microphone pitch monitor")]
struct Cli {
    /// Input device name (see --list-devices); defaults to the system input
    #[arg(short, long)]
    device: Option<String>,

    /// Reference note between F#2 and F4, e.g. "A3"
    #[arg(short, long)]
    reference: Option<String>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print available input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Emit display updates as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        for name in audio::list_input_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(note) = cli.reference {
        config.reference_note = note;
    }

    let console = Console::new(cli.json);
    let initial = ReferenceTone::resolve(Some(config.reference_note.as_str()));
    let reference = Arc::new(ReferenceCell::new(initial));
    console.status(&format!("Ref: {}", reference.snapshot().note_name));

    let runner = StreamRunner::new();
    start_listening(&runner, &console, cli.device, &config, &reference);

    for line in io::stdin().lock().lines() {
        let line = line?;
        match Command::parse(&line) {
            Some(Command::Quit) => break,
            Some(Command::Notes) => console.status(&tuning::build_reference_notes().join(" ")),
            Some(Command::Devices) => match audio::list_input_devices() {
                Ok(names) => names.iter().for_each(|n| console.status(n)),
                Err(e) => console.status(&format!("Error: {e:#}")),
            },
            Some(Command::Device(name)) => {
                start_listening(&runner, &console, Some(name), &config, &reference);
            }
            Some(Command::Reference(note)) => match reference.set_note(&note) {
                Ok(tone) => console.status(&format!("Ref: {}", tone.note_name)),
                Err(e) => {
                    warn!("{e}");
                    console.status(&format!("Unknown reference note {note:?}"));
                }
            },
            None => {}
        }
    }

    info!("Shutting down...");
    runner.shutdown();
    Ok(())
}

/// Stops any running session and starts a new one on `device`.
fn start_listening(
    runner: &StreamRunner,
    console: &Console,
    device: Option<String>,
    config: &MonitorConfig,
    reference: &Arc<ReferenceCell>,
) {
    console.status("Starting mic...");
    let sink = Box::new(TerminalSink::new(console.json()));
    match runner.restart(|| session::start_session(device, config, Arc::clone(reference), sink)) {
        Ok(label) => console.status(&format!("Listening on {label}")),
        Err(e) => console.status(&format!("Error: {e:#}")),
    }
}
