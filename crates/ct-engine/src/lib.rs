//! Sound-chip engine for chiptrack.
//!
//! Fixed-point pulse and noise voices, the tick sequencer that drives them
//! from a [`ct_ir::Song`], a polyphonic pulse pool for keyboard-style note
//! entry, and the lookup-table derivation used for hardware export.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clock;
mod envelope;
mod noise;
mod pitch;
mod poly;
mod pulse;
mod sequencer;
pub mod tables;
mod voice;

pub use clock::Clock;
pub use envelope::{ceil_shift, AdsrStage, Envelope, EnvelopeEvent, Vibrato};
pub use noise::NoiseVoice;
pub use pitch::{letter_to_increment, midi_increment, note_increment, phase_increment, PitchTable};
pub use poly::{PulsePool, VoiceId, POLYPHONY};
pub use pulse::PulseVoice;
pub use sequencer::{Engine, Position, SequencedVoice, BLOCK_SIZE};
pub use tables::{percussion_tables, pitched_tables, PercussionTables, PitchedTables, TableKind};
pub use voice::{ChipVoice, Voice};
