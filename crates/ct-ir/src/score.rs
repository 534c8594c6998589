//! Step and track types for tracker scores.

use alloc::vec::Vec;
use arrayvec::ArrayString;

/// Chromatic note alphabet, one symbol per semitone starting at C.
/// Uppercase letters are naturals, lowercase letters are flats.
pub const NOTE_LETTERS: &str = "CdDeEFgGaAbB";

/// Semitone (0-11) for a note letter.
pub fn letter_semitone(letter: char) -> Option<u8> {
    NOTE_LETTERS.find(letter).map(|idx| idx as u8)
}

/// Note letter for a semitone (0-11).
pub fn semitone_letter(semitone: u8) -> Option<char> {
    NOTE_LETTERS.chars().nth(semitone as usize)
}

/// One score step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Step {
    /// Start a note. `semitone` is 0-11, `octave` 0-9.
    Note { semitone: u8, octave: u8 },
    /// Keep whatever the previous step left playing.
    #[default]
    Sustain,
    /// Release the current note.
    NoteOff,
    /// Fire a percussion hit.
    Trigger,
}

/// A looping sequence of steps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Track {
    pub name: ArrayString<32>,
    pub steps: Vec<Step>,
}

impl Track {
    pub fn new(name: &str, steps: Vec<Step>) -> Self {
        let mut track_name = ArrayString::new();
        let _ = track_name.try_push_str(name);
        Self { name: track_name, steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step played at song position `count`; tracks loop on their own length.
    pub fn step_at(&self, count: u64) -> Option<Step> {
        if self.steps.is_empty() {
            return None;
        }
        Some(self.steps[(count % self.steps.len() as u64) as usize])
    }
}
