//! chiptrack - pulse/noise sound-chip tracker
//!
//! Plays a song on the default audio device, renders it to WAV, or exports
//! its per-step pitch/gate/trigger tables for hardware. Without a song
//! file the built-in demo is used. `dump` writes a song back out with every
//! parameter spelled out, and `audition` renders held MIDI notes through
//! the song's pulse instrument.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ct_master::{Controller, Song};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(feature = "alloc_check")]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

#[derive(Parser)]
#[command(name = "chiptrack")]
#[command(about = "Pulse/noise sound-chip tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a song on the default audio device
    Play {
        /// Song file (TOML); the demo song if omitted
        song: Option<PathBuf>,

        /// Stop after this many seconds instead of looping forever
        #[arg(short, long)]
        seconds: Option<f64>,
    },

    /// Render a song to a 16-bit mono WAV file
    Render {
        /// Song file (TOML); the demo song if omitted
        song: Option<PathBuf>,

        /// Output WAV file
        #[arg(short, long, default_value = "out.wav")]
        output: PathBuf,

        /// Length to render
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
    },

    /// Export hex and PLA lookup tables for every track
    Export {
        /// Song file (TOML); the demo song if omitted
        song: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "tables")]
        output: PathBuf,
    },

    /// Write the song file with every parameter filled in
    Dump {
        /// Song file (TOML); the demo song if omitted
        song: Option<PathBuf>,

        /// Output file; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render MIDI notes played together on the first pulse instrument
    Audition {
        /// MIDI note numbers (60 = middle C)
        #[arg(required = true, value_parser = clap::value_parser!(u8).range(0..128))]
        notes: Vec<u8>,

        /// Song file (TOML) providing the instrument; the demo song if omitted
        #[arg(long)]
        song: Option<PathBuf>,

        /// Output WAV file
        #[arg(short, long, default_value = "audition.wav")]
        output: PathBuf,

        /// How long the notes are held before release
        #[arg(long, default_value_t = 1.0)]
        hold: f64,

        /// Total length to render
        #[arg(long, default_value_t = 2.0)]
        seconds: f64,
    },

    /// Show derived clock, tempo deviation and channels
    Info {
        /// Song file (TOML); the demo song if omitted
        song: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { song, seconds } => play(&mut load(song.as_deref())?, seconds),
        Commands::Render { song, output, seconds } => render(&load(song.as_deref())?, &output, seconds),
        Commands::Export { song, output } => export(&load(song.as_deref())?, &output),
        Commands::Dump { song, output } => dump(&load(song.as_deref())?, output.as_deref()),
        Commands::Audition { notes, song, output, hold, seconds } => {
            audition(&load(song.as_deref())?, &notes, &output, hold, seconds)
        }
        Commands::Info { song } => info(&load(song.as_deref())?),
    }
}

fn load(path: Option<&Path>) -> Result<Controller> {
    let mut ctrl = Controller::new();
    if let Some(path) = path {
        ctrl.load_song_file(path)
            .with_context(|| format!("Failed to load song: {}", path.display()))?;
    }
    Ok(ctrl)
}

fn play(ctrl: &mut Controller, seconds: Option<f64>) -> Result<()> {
    ctrl.play().context("Failed to start playback")?;
    println!("Playing {} (Ctrl-C to stop)", ctrl.song().title);

    let started = std::time::Instant::now();
    while ctrl.is_playing() {
        if seconds.is_some_and(|s| started.elapsed().as_secs_f64() >= s) {
            break;
        }
        if let Some(pos) = ctrl.position() {
            print!("\rStep: {:5} | Tick: {:2}", pos.step, pos.tick);
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    ctrl.stop();
    println!("\rDone.                    ");
    Ok(())
}

fn render(ctrl: &Controller, output: &Path, seconds: f64) -> Result<()> {
    let wav = ctrl.render_to_wav(seconds)?;
    std::fs::write(output, &wav)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} ({} bytes)", output.display(), wav.len());
    Ok(())
}

fn export(ctrl: &Controller, output: &Path) -> Result<()> {
    let written = ctrl
        .export_tables(output)
        .with_context(|| format!("Failed to export tables to {}", output.display()))?;
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}

fn dump(ctrl: &Controller, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => ctrl
            .save_song_file(path)
            .with_context(|| format!("Failed to save {}", path.display()))?,
        None => print!("{}", ctrl.song_toml()?),
    }
    Ok(())
}

fn audition(ctrl: &Controller, notes: &[u8], output: &Path, hold: f64, seconds: f64) -> Result<()> {
    let wav = ctrl.audition_to_wav(notes, hold, seconds)?;
    std::fs::write(output, &wav)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} ({} bytes)", output.display(), wav.len());
    Ok(())
}

fn info(ctrl: &Controller) -> Result<()> {
    let song: &Song = ctrl.song();
    let clock = ctrl.clock()?;

    println!("Title:       {}", song.title);
    println!("Sample rate: {} Hz", clock.sample_rate);
    println!("Tick:        {} samples ({:.2} Hz)", clock.samples_per_tick, clock.tick_rate());
    println!("Step:        {} ticks", clock.ticks_per_beat);
    println!(
        "Tempo:       {:.2} BPM (requested {}, {:+.2}%)",
        clock.actual_bpm,
        clock.requested_bpm,
        clock.tempo_error() * 100.0
    );
    println!("Channels:    {}", song.channels.len());
    for (i, ch) in song.channels.iter().enumerate() {
        let kind = match ch.instrument {
            ct_ir::Instrument::Pulse(_) => "pulse",
            ct_ir::Instrument::Noise(_) => "noise",
        };
        println!("  {:2} {:<5} {:<16} {} steps", i, kind, ch.track.name, ch.track.len());
    }
    Ok(())
}
