//! Audio output trait and error types.

use thiserror::Error;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to initialize audio device
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("playback error: {0}")]
    Playback(String),
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
    /// Samples written while the output is stopped
    #[error("output is not running")]
    NotRunning,
}

/// Sink for mono 16-bit PCM produced by the engine.
pub trait AudioOutput {
    /// Rate the written samples are interpreted at.
    fn sample_rate(&self) -> u32;

    /// Write samples, blocking until all of them are queued.
    fn write(&mut self, samples: &[i16]) -> Result<(), AudioError>;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback. Queued samples are kept.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Block until every queued sample has been played.
    fn flush(&mut self) -> Result<(), AudioError>;
}
