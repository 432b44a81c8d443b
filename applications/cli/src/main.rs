//! Onyx Player - play one file through the five-band equalizer
//!
//! Usage:
//!   onyx-player song.flac --gains 3,1.5,0,-2,4 --volume 0.6
//!
//! While playing, type `p` to pause or resume, `s <seconds>` to seek,
//! `g <band> <db>` to change a band, `v <0..1>` for volume and `q` to quit.

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{unbounded, Sender};
use onyx_audio_desktop::DesktopBackend;
use onyx_dsp::{GainVector, BAND_LABELS};
use onyx_player::{parse_command, Command, PlayerConfig};
use onyx_playback::{format_ms, AudioBackend, PlaybackEngine};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "onyx-player")]
#[command(about = "Play an audio file through the Onyx five-band equalizer", long_about = None)]
struct Cli {
    /// Audio file to play
    file: PathBuf,

    /// Start position in milliseconds
    #[arg(long, default_value_t = 0)]
    start_ms: u64,

    /// Band gains in dB for 60Hz,250Hz,1kHz,4kHz,16kHz
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    gains: Option<Vec<f64>>,

    /// Output volume, 0.0 - 1.0
    #[arg(long)]
    volume: Option<f64>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "ONYX_CONFIG")]
    config: Option<PathBuf>,
}

/// Everything the main loop reacts to
enum Event {
    Position { position_ms: u64, duration_ms: u64 },
    Finished,
    Failed(String),
    Input(Command),
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onyx=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = PlayerConfig::load(cli.config.as_deref())?;
    if let Some(gains) = &cli.gains {
        config.gains = GainVector::from_slice(gains).context("--gains needs five values")?;
    }

    let backend = DesktopBackend::with_config(config.sink.clone());
    if !backend.is_available() {
        anyhow::bail!("no audio output device available");
    }

    let engine = PlaybackEngine::with_config(Arc::new(backend), config.engine.clone())?;
    engine.set_gains(config.gains);
    if let Some(volume) = cli.volume {
        engine.set_volume(volume);
    }

    let (tx, rx) = unbounded();
    register_callbacks(&engine, &tx);
    spawn_input_reader(tx);

    tracing::info!(file = %cli.file.display(), "starting playback");
    engine.play(&cli.file, cli.start_ms)?;
    print_gains(engine.gains());

    let mut last_second = None;
    let result = loop {
        let Ok(event) = rx.recv() else {
            break Ok(());
        };

        match event {
            Event::Position {
                position_ms,
                duration_ms,
            } => {
                let second = position_ms / 1000;
                if last_second != Some(second) {
                    last_second = Some(second);
                    print!("\r{} / {}", format_ms(position_ms), format_ms(duration_ms));
                    std::io::stdout().flush()?;
                }
            }
            Event::Finished => {
                println!();
                break Ok(());
            }
            Event::Failed(message) => {
                println!();
                break Err(anyhow::anyhow!(message));
            }
            Event::Input(command) => {
                if !apply_command(&engine, command) {
                    println!();
                    break Ok(());
                }
            }
        }
    };

    engine.clear_callbacks();
    engine.stop();
    result
}

fn register_callbacks(engine: &PlaybackEngine, tx: &Sender<Event>) {
    let position_tx = tx.clone();
    engine.on_position(move |position_ms, duration_ms| {
        let _ = position_tx.send(Event::Position {
            position_ms,
            duration_ms,
        });
    });

    let finished_tx = tx.clone();
    engine.on_finished(move || {
        let _ = finished_tx.send(Event::Finished);
    });

    let error_tx = tx.clone();
    engine.on_error(move |e| {
        let _ = error_tx.send(Event::Failed(e.to_string()));
    });
}

/// Forward parsed stdin lines; runs until stdin closes
fn spawn_input_reader(tx: Sender<Event>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if tx.send(Event::Input(command)).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{e}"),
            }
        }
    });
}

/// Apply one command. Returns `false` when the player should exit.
fn apply_command(engine: &PlaybackEngine, command: Command) -> bool {
    match command {
        Command::TogglePause => {
            if engine.is_paused() {
                engine.resume();
            } else {
                engine.pause();
            }
        }
        Command::Seek { ms } => engine.seek(ms),
        Command::Gain { band, gain_db } => {
            engine.set_gains(engine.gains().with_band(band, gain_db));
            print_gains(engine.gains());
        }
        Command::Volume(volume) => engine.set_volume(volume),
        Command::Quit => return false,
    }
    true
}

fn print_gains(gains: GainVector) {
    let bands: Vec<String> = gains
        .as_array()
        .iter()
        .zip(BAND_LABELS)
        .map(|(gain, label)| format!("{label} {gain:+.1} dB"))
        .collect();
    println!("\rEQ: {}", bands.join("  "));
}
