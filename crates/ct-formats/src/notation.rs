//! Tracker score notation.
//!
//! A pitched track is two parallel strings: note symbols and octave
//! digits. `C d D e E F g G a A b B` are notes (lowercase = flat), `.`
//! sustains, `-` releases and `x` fires a percussion hit. The octave digit
//! at the same position as a note letter picks its octave; other positions
//! in the octave string are ignored. Whitespace is free-form.
//!
//! Malformed input never fails a load: the offending step becomes a
//! sustain and a warning is logged.

use ct_ir::{letter_semitone, semitone_letter, Step, Track};
use tracing::warn;

fn parse_symbol(track: &str, pos: usize, symbol: char) -> Option<Step> {
    match symbol {
        '.' => Some(Step::Sustain),
        '-' => Some(Step::NoteOff),
        'x' => Some(Step::Trigger),
        _ => {
            if letter_semitone(symbol).is_none() {
                warn!(track, pos, %symbol, "unknown score symbol, treating as sustain");
                return Some(Step::Sustain);
            }
            None
        }
    }
}

/// Parse a pitched track from its note and octave strings.
pub fn parse_pitched(name: &str, notes: &str, octaves: &str) -> Track {
    let notes: Vec<char> = notes.chars().filter(|c| !c.is_whitespace()).collect();
    let mut octaves: Vec<char> = octaves.chars().filter(|c| !c.is_whitespace()).collect();

    if octaves.len() != notes.len() {
        warn!(
            track = name,
            notes = notes.len(),
            octaves = octaves.len(),
            "octave string length differs from note string"
        );
        octaves.resize(notes.len(), '0');
    }

    let steps = notes
        .iter()
        .zip(&octaves)
        .enumerate()
        .map(|(pos, (&symbol, &digit))| {
            if let Some(step) = parse_symbol(name, pos, symbol) {
                return step;
            }
            let semitone = letter_semitone(symbol).unwrap_or(0);
            match digit.to_digit(10) {
                Some(octave) => Step::Note { semitone, octave: octave as u8 },
                None => {
                    warn!(track = name, pos, %symbol, %digit, "invalid octave digit, treating as sustain");
                    Step::Sustain
                }
            }
        })
        .collect();

    Track::new(name, steps)
}

/// Parse a percussion track. Note letters fire the voice like `x`.
pub fn parse_percussion(name: &str, pattern: &str) -> Track {
    let steps = pattern
        .chars()
        .filter(|c| !c.is_whitespace())
        .enumerate()
        .map(|(pos, symbol)| match parse_symbol(name, pos, symbol) {
            Some(step) => step,
            None => Step::Note {
                semitone: letter_semitone(symbol).unwrap_or(0),
                octave: 0,
            },
        })
        .collect();
    Track::new(name, steps)
}

/// Render a track back to its note and octave strings.
pub fn format_pitched(track: &Track) -> (String, String) {
    let mut notes = String::with_capacity(track.len());
    let mut octaves = String::with_capacity(track.len());
    for step in &track.steps {
        let (symbol, digit) = match *step {
            Step::Note { semitone, octave } => (
                semitone_letter(semitone).unwrap_or('?'),
                char::from_digit(octave as u32, 10).unwrap_or('?'),
            ),
            Step::Sustain => ('.', '.'),
            Step::NoteOff => ('-', '.'),
            Step::Trigger => ('x', '.'),
        };
        notes.push(symbol);
        octaves.push(digit);
    }
    (notes, octaves)
}

/// Render a percussion track back to its pattern string.
pub fn format_percussion(track: &Track) -> String {
    track
        .steps
        .iter()
        .map(|step| match *step {
            Step::Note { semitone, .. } => semitone_letter(semitone).unwrap_or('x'),
            Step::Sustain => '.',
            Step::NoteOff => '-',
            Step::Trigger => 'x',
        })
        .collect()
}
