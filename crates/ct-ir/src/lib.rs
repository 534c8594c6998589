//! Core data types for the chiptrack sound chip.
//!
//! This crate defines the score representation and the static voice
//! parameter records shared by the engine, the table exporter and the
//! song file loader. Nothing here is mutated during playback.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod config;
mod score;
pub mod song;

pub use config::{
    ClockConfig, ConfigError, NoiseConfig, VoiceConfig, MAX_SHIFT, MAX_VOLUME, NOISE_SILENT_SHIFT,
};
pub use score::{letter_semitone, semitone_letter, Step, Track, NOTE_LETTERS};
pub use song::{Channel, Instrument, Song};
