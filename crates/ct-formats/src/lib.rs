//! File formats for chiptrack.
//!
//! Parses the tracker score notation and TOML song files into the IR,
//! writes rendered audio as WAV, and writes exported lookup tables in the
//! hex and truth-table formats used by hardware toolchains.

mod notation;
mod song_file;
mod table_format;
mod wav_format;

pub use notation::{format_percussion, format_pitched, parse_percussion, parse_pitched};
pub use song_file::{
    load_song_file, load_song_str, save_song_file, save_song_str, ClockSection, NoiseEntry, PulseEntry, SongFile,
};
pub use table_format::{
    bit_width, check_table, export_song_tables, to_hex, to_truth_table, write_table_files,
};
pub use wav_format::samples_to_wav;

use ct_ir::ConfigError;
use thiserror::Error;

/// Error type for song and audio file handling.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("song file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("song serialization: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("invalid song configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Error type for lookup table export.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table {0} is empty")]
    Empty(String),
    #[error("table {0} has no non-zero value, bit width is undefined")]
    AllZero(String),
    #[error("table name {0:?} is not a plain file name")]
    InvalidName(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
