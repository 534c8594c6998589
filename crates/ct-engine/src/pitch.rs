//! Note-to-phase-increment conversion.
//!
//! An oscillator whose `phase_bits`-wide accumulator is advanced by the
//! returned increment once per sample wraps at the equal-tempered frequency
//! of the note. The live player and the table exporter both go through
//! these functions, so their results must stay bit-exact.

use ct_ir::{letter_semitone, VoiceConfig};

/// Low reference A, three semitones below note index 0.
const REFERENCE_HZ: f64 = 55.0;

/// Note index 0 is the C three semitones above the reference A.
const REFERENCE_OFFSET: i32 = 3;

/// MIDI note number of note index 0 (C2, 65.4 Hz). MIDI 69 is A440.
pub const MIDI_NOTE_OFFSET: i32 = 36;

/// Fixed-point phase step for `note_index` semitones above the reference.
///
/// `round(55 * 2^((note_index + 3) / 12) * 2^phase_bits / sample_rate)`.
/// Returns 0 for a zero sample rate.
pub fn phase_increment(note_index: i32, phase_bits: u8, sample_rate: u32) -> u32 {
    if sample_rate == 0 {
        return 0;
    }
    let freq = REFERENCE_HZ * libm::exp2((note_index + REFERENCE_OFFSET) as f64 / 12.0);
    let inc = libm::round(freq * libm::exp2(phase_bits as f64) / sample_rate as f64);
    inc.clamp(0.0, u32::MAX as f64) as u32
}

/// Phase step for a semitone/octave pair shifted by `transpose` octaves.
pub fn note_increment(semitone: u8, octave: u8, transpose: i8, phase_bits: u8, sample_rate: u32) -> u32 {
    let index = semitone as i32 + 12 * (octave as i32 + transpose as i32);
    phase_increment(index, phase_bits, sample_rate)
}

/// Phase step for a MIDI note number shifted by `transpose` octaves.
pub fn midi_increment(note: u8, transpose: i8, phase_bits: u8, sample_rate: u32) -> u32 {
    let index = note as i32 - MIDI_NOTE_OFFSET + 12 * transpose as i32;
    phase_increment(index, phase_bits, sample_rate)
}

/// Phase step for a score letter and octave digit.
///
/// Returns `None` if the letter is not in the note alphabet or the octave
/// is not a decimal digit.
pub fn letter_to_increment(
    letter: char,
    octave_digit: char,
    transpose: i8,
    phase_bits: u8,
    sample_rate: u32,
) -> Option<u32> {
    let semitone = letter_semitone(letter)?;
    let octave = octave_digit.to_digit(10)? as u8;
    Some(note_increment(semitone, octave, transpose, phase_bits, sample_rate))
}

/// Pitch lookup bound to one voice's phase width and transpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PitchTable {
    pub phase_bits: u8,
    pub transpose: i8,
    pub sample_rate: u32,
}

impl PitchTable {
    pub fn new(phase_bits: u8, transpose: i8, sample_rate: u32) -> Self {
        Self { phase_bits, transpose, sample_rate }
    }

    pub fn for_voice(config: &VoiceConfig, sample_rate: u32) -> Self {
        Self::new(config.phase_bits, config.octave_transpose, sample_rate)
    }

    pub fn increment(&self, semitone: u8, octave: u8) -> u32 {
        note_increment(semitone, octave, self.transpose, self.phase_bits, self.sample_rate)
    }

    pub fn midi(&self, note: u8) -> u32 {
        midi_increment(note, self.transpose, self.phase_bits, self.sample_rate)
    }
}
