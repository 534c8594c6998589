//! Hardware lookup tables derived from a track.
//!
//! The tables describe, per score step, what a hardware sequencer should
//! latch: the phase increment, whether the previous note is still held,
//! and whether a new note starts. Pitches come from the same
//! [`PitchTable`] the live voices use.
//!
//! The consuming hardware samples the tables one step late, so every table
//! is rotated right by one position: entry `i` describes score step `i - 1`
//! (wrapping). After rotation `trigger[i]` is set when step `i - 1` starts
//! a note, and `gate[i]` is set when step `i` sustains a sounding note.

use alloc::vec;
use alloc::vec::Vec;
use ct_ir::{Step, Track, VoiceConfig};

use crate::pitch::PitchTable;

/// Tables for a pitched (pulse) track.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PitchedTables {
    pub pitch: Vec<u32>,
    pub gate: Vec<u32>,
    pub trigger: Vec<u32>,
}

/// Tables for a percussion (noise) track.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PercussionTables {
    pub gate: Vec<u32>,
}

/// Which table a value sequence belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableKind {
    Pitch,
    Gate,
    Trigger,
}

impl TableKind {
    pub const fn name(self) -> &'static str {
        match self {
            TableKind::Pitch => "pitch",
            TableKind::Gate => "gate",
            TableKind::Trigger => "trigger",
        }
    }
}

impl PitchedTables {
    pub fn len(&self) -> usize {
        self.pitch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitch.is_empty()
    }

    /// The three tables paired with their kinds.
    pub fn tables(&self) -> [(TableKind, &[u32]); 3] {
        [
            (TableKind::Pitch, self.pitch.as_slice()),
            (TableKind::Gate, self.gate.as_slice()),
            (TableKind::Trigger, self.trigger.as_slice()),
        ]
    }
}

/// Rotate right by one: the last entry moves to the front.
fn delay_one_step(values: &mut [u32]) {
    if !values.is_empty() {
        values.rotate_right(1);
    }
}

/// Derive pitch/gate/trigger tables for one loop of a pitched track.
///
/// Steps before the first note take the pitch and sounding state the
/// track ends with, since the track loops. Note-off keeps the pitch so the
/// release still sounds at the right frequency.
///
/// The gate only covers sustain steps, so a note directly followed by
/// another note or a note-off never opens it. A purely staccato track such
/// as `"CDEF"` therefore has an all-zero gate table, and export rejects it.
/// Every note retriggers, including a repeat of the pitch already playing.
pub fn pitched_tables(track: &Track, config: &VoiceConfig, sample_rate: u32) -> PitchedTables {
    let pitch_table = PitchTable::for_voice(config, sample_rate);
    let steps = &track.steps;
    let n = steps.len();

    // State carried in from the end of the loop
    let mut pitch = 0;
    let mut sounding = false;
    for step in steps {
        match *step {
            Step::Note { semitone, octave } => {
                pitch = pitch_table.increment(semitone, octave);
                sounding = true;
            }
            Step::NoteOff => sounding = false,
            Step::Sustain | Step::Trigger => {}
        }
    }

    let mut tables = PitchedTables {
        pitch: vec![0; n],
        gate: vec![0; n],
        trigger: vec![0; n],
    };

    for (i, step) in steps.iter().enumerate() {
        match *step {
            Step::Note { semitone, octave } => {
                pitch = pitch_table.increment(semitone, octave);
                sounding = true;
                tables.trigger[i] = 1;
            }
            Step::NoteOff => sounding = false,
            Step::Sustain | Step::Trigger => {}
        }
        tables.pitch[i] = pitch;
        let held_into_next = steps[(i + 1) % n] == Step::Sustain;
        tables.gate[i] = (sounding && held_into_next) as u32;
    }

    delay_one_step(&mut tables.pitch);
    delay_one_step(&mut tables.gate);
    delay_one_step(&mut tables.trigger);
    tables
}

/// Derive the hit table for a percussion track: 1 where a hit fires.
pub fn percussion_tables(track: &Track) -> PercussionTables {
    let mut gate: Vec<u32> = track
        .steps
        .iter()
        .map(|step| matches!(step, Step::Trigger | Step::Note { .. }) as u32)
        .collect();
    delay_one_step(&mut gate);
    PercussionTables { gate }
}
