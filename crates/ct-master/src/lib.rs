//! Headless controller for chiptrack.
//!
//! Provides a single API for loading songs, live playback, offline
//! rendering and table export that the CLI drives.

mod demo;

use ct_audio::{AudioOutput, CpalOutput};
use ct_engine::{Clock, Engine, PulsePool, BLOCK_SIZE, POLYPHONY};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, error, info, warn};

// Re-export common types so callers don't need the lower crates directly.
pub use ct_audio::{AudioError, MemoryOutput};
pub use ct_engine::Position;
pub use ct_formats::{FormatError, TableError};
pub use ct_ir::{ConfigError, Song, VoiceConfig};
pub use demo::demo_song;

/// Longest offline render accepted by [`Controller::render_to_wav`].
pub const MAX_RENDER_SECONDS: f64 = 3600.0;

#[derive(Debug, Error)]
pub enum MasterError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("playback thread exited unexpectedly")]
    PlaybackThread,
    #[error("render duration must be a non-negative number of seconds, got {0}")]
    InvalidDuration(f64),
}

/// Headless controller: owns a song and manages playback.
pub struct Controller {
    song: Song,
    playback: Option<PlaybackHandle>,
}

/// Position shared with the playback thread.
#[derive(Default)]
struct SharedPosition {
    step: AtomicU64,
    tick: AtomicU32,
}

impl SharedPosition {
    fn store(&self, pos: Position) {
        self.step.store(pos.step, Ordering::Relaxed);
        self.tick.store(pos.tick, Ordering::Relaxed);
    }

    fn load(&self) -> Position {
        Position {
            step: self.step.load(Ordering::Relaxed),
            tick: self.tick.load(Ordering::Relaxed),
            sample: 0,
        }
    }
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    position: Arc<SharedPosition>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<(), AudioError>>>,
}

impl Controller {
    /// A controller holding the built-in demo song.
    pub fn new() -> Self {
        Self::with_song(demo_song())
    }

    pub fn with_song(song: Song) -> Self {
        Self { song, playback: None }
    }

    // --- Song management ---

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Replace the song after validating it. Stops playback.
    pub fn set_song(&mut self, song: Song) -> Result<(), MasterError> {
        song.validate()?;
        self.stop();
        self.song = song;
        log_clock(&self.clock()?);
        Ok(())
    }

    pub fn load_song_file(&mut self, path: &Path) -> Result<(), MasterError> {
        let song = ct_formats::load_song_file(path)?;
        info!(path = %path.display(), title = song.title.as_str(), "loaded song");
        self.set_song(song)
    }

    pub fn load_song_str(&mut self, text: &str) -> Result<(), MasterError> {
        self.set_song(ct_formats::load_song_str(text)?)
    }

    /// The current song in song-file form.
    pub fn song_toml(&self) -> Result<String, MasterError> {
        Ok(ct_formats::save_song_str(&self.song)?)
    }

    pub fn save_song_file(&self, path: &Path) -> Result<(), MasterError> {
        Ok(ct_formats::save_song_file(&self.song, path)?)
    }

    /// Derived timing for the current song.
    pub fn clock(&self) -> Result<Clock, MasterError> {
        Ok(Clock::new(&self.song.clock)?)
    }

    // --- Real-time playback ---

    /// Play the song on the default audio device until [`stop`](Self::stop).
    pub fn play(&mut self) -> Result<(), MasterError> {
        self.play_with(|sample_rate| {
            let (mut output, consumer) = CpalOutput::new(sample_rate)?;
            output.build_stream(consumer)?;
            Ok(output)
        })
    }

    /// Play through an output built on the playback thread by `open`,
    /// which receives the song's sample rate.
    pub fn play_with<O, F>(&mut self, open: F) -> Result<(), MasterError>
    where
        O: AudioOutput,
        F: FnOnce(u32) -> Result<O, AudioError> + Send + 'static,
    {
        self.stop();

        let engine = Engine::new(&self.song)?;
        log_clock(engine.clock());

        let stop_signal = Arc::new(AtomicBool::new(false));
        let position = Arc::new(SharedPosition::default());
        let finished = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let stop = stop_signal.clone();
        let pos = position.clone();
        let done = finished.clone();

        let thread = std::thread::spawn(move || {
            let result = match open(engine.sample_rate()) {
                Ok(mut output) => match output.start() {
                    Ok(()) => {
                        let _ = ready_tx.send(Ok(()));
                        playback_loop(engine, &mut output, &stop, &pos)
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        Ok(())
                    }
                },
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    Ok(())
                }
            };
            done.store(true, Ordering::Relaxed);
            result
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.playback = Some(PlaybackHandle {
                    stop_signal,
                    position,
                    finished,
                    thread: Some(thread),
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e.into())
            }
            Err(_) => {
                let _ = thread.join();
                Err(MasterError::PlaybackThread)
            }
        }
    }

    /// Signal the playback thread, wait for it to drain its output and
    /// join it.
    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                match handle.join() {
                    Ok(Ok(())) => debug!("playback stopped"),
                    Ok(Err(e)) => warn!("playback ended with error: {}", e),
                    Err(_) => error!("playback thread panicked"),
                }
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    pub fn position(&self) -> Option<Position> {
        let pb = self.playback.as_ref()?;
        if pb.finished.load(Ordering::Relaxed) {
            return None;
        }
        Some(pb.position.load())
    }

    // --- Offline rendering ---

    pub fn render_samples(&self, count: usize) -> Result<Vec<i16>, MasterError> {
        let mut engine = Engine::new(&self.song)?;
        Ok(engine.render_samples(count))
    }

    /// Render `seconds` of audio as a 16-bit mono WAV file image.
    ///
    /// Durations above [`MAX_RENDER_SECONDS`] are clamped to it.
    pub fn render_to_wav(&self, seconds: f64) -> Result<Vec<u8>, MasterError> {
        let mut engine = Engine::new(&self.song)?;
        let sample_rate = engine.sample_rate();
        let count = sample_count(seconds, sample_rate)?;
        let samples = engine.render_samples(count);
        info!(samples = count, sample_rate, "rendered");
        encode_wav(&samples, sample_rate)
    }

    /// Play MIDI `notes` together on a keyboard pool of pulse voices, hold
    /// them for `hold_seconds`, then release and keep rendering until
    /// `seconds`. The voices use the song's first pulse instrument, or the
    /// default one if it has none.
    pub fn audition_to_wav(&self, notes: &[u8], hold_seconds: f64, seconds: f64) -> Result<Vec<u8>, MasterError> {
        let clock = self.clock()?;
        let config = self.pulse_config();
        config.validate()?;
        let sample_rate = clock.sample_rate;
        let count = sample_count(seconds, sample_rate)?;
        let hold = sample_count(hold_seconds, sample_rate)?.min(count);

        let mut pool = PulsePool::new(config, sample_rate, POLYPHONY);
        for &note in notes {
            if pool.note_on(note, 127).is_none() {
                warn!(note, polyphony = POLYPHONY, "no free voice, note dropped");
            }
        }

        let tick = clock.samples_per_tick as usize;
        let mut mixed = vec![0i32; count];
        let mut released = false;
        let mut offset = 0;
        while offset < count {
            if !released && offset >= hold {
                for &note in notes {
                    pool.note_off(note);
                }
                released = true;
            }
            if offset % tick == 0 {
                pool.tick_envelope();
            }
            // Runs stop at tick boundaries and at the release point
            let mut end = ((offset / tick + 1) * tick).min(count);
            if !released {
                end = end.min(hold);
            }
            pool.render(&mut mixed[offset..end]);
            offset = end;
        }

        let samples: Vec<i16> = mixed
            .iter()
            .map(|&s| s.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
            .collect();
        info!(notes = notes.len(), samples = count, sample_rate, "auditioned");
        encode_wav(&samples, sample_rate)
    }

    fn pulse_config(&self) -> VoiceConfig {
        self.song
            .channels
            .iter()
            .find_map(|ch| match ch.instrument {
                ct_ir::Instrument::Pulse(config) => Some(config),
                ct_ir::Instrument::Noise(_) => None,
            })
            .unwrap_or_default()
    }

    // --- Hardware export ---

    /// Write every channel's lookup tables into `dir`, returning the paths
    /// written. Nothing is written if any table is degenerate.
    pub fn export_tables(&self, dir: &Path) -> Result<Vec<PathBuf>, MasterError> {
        let clock = self.clock()?;
        let written = ct_formats::export_song_tables(&self.song, clock.sample_rate, dir)?;
        info!(files = written.len(), dir = %dir.display(), "exported tables");
        Ok(written)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Samples in `seconds` at `sample_rate`, clamped to [`MAX_RENDER_SECONDS`].
fn sample_count(seconds: f64, sample_rate: u32) -> Result<usize, MasterError> {
    if seconds.is_nan() || seconds < 0.0 {
        return Err(MasterError::InvalidDuration(seconds));
    }
    let seconds = if seconds > MAX_RENDER_SECONDS {
        warn!(requested = seconds, max = MAX_RENDER_SECONDS, "render length clamped");
        MAX_RENDER_SECONDS
    } else {
        seconds
    };
    Ok((sample_rate as f64 * seconds).round() as usize)
}

fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, MasterError> {
    ct_formats::samples_to_wav(samples, sample_rate).map_err(|e| MasterError::Format(FormatError::Io(e)))
}

fn log_clock(clock: &Clock) {
    info!(
        sample_rate = clock.sample_rate,
        samples_per_tick = clock.samples_per_tick,
        ticks_per_beat = clock.ticks_per_beat,
        "clock"
    );
    info!(
        requested = clock.requested_bpm,
        actual = format_args!("{:.2}", clock.actual_bpm),
        deviation = format_args!("{:+.2}%", clock.tempo_error() * 100.0),
        "tempo"
    );
}

#[inline]
fn render_block(engine: &mut Engine, block: &mut [i16]) {
    #[cfg(feature = "alloc_check")]
    assert_no_alloc::assert_no_alloc(|| engine.render_i16(block));
    #[cfg(not(feature = "alloc_check"))]
    engine.render_i16(block);
}

/// Render blocks into `output` until stopped, then drain it. The output is
/// stopped even when draining fails.
fn playback_loop(
    mut engine: Engine,
    output: &mut impl AudioOutput,
    stop_signal: &AtomicBool,
    position: &SharedPosition,
) -> Result<(), AudioError> {
    let mut block = [0i16; BLOCK_SIZE];
    while !stop_signal.load(Ordering::Relaxed) {
        render_block(&mut engine, &mut block);
        output.write(&block)?;
        position.store(engine.position());
    }
    let flushed = output.flush();
    output.stop()?;
    flushed
}
