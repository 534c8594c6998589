//! Lookup table files for hardware export.
//!
//! Two encodings of the same value sequence:
//! - `.hex`: space-separated lowercase hex words, all padded to the digit
//!   count of the largest value, one line, trailing newline. Loadable with
//!   `$readmemh`.
//! - `.pla`: Berkeley PLA truth table. `.i` is the bit width of the last
//!   row index (at least 1), `.o` the bit width of the largest value.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use ct_engine::{percussion_tables, pitched_tables, TableKind};
use ct_ir::{Instrument, Song};
use tracing::{info, warn};

use crate::TableError;

/// Bits needed to hold `value`; 0 for 0.
pub fn bit_width(value: u32) -> u32 {
    u32::BITS - value.leading_zeros()
}

/// Reject tables whose encodings would be malformed.
pub fn check_table(name: &str, values: &[u32]) -> Result<(), TableError> {
    if values.is_empty() {
        return Err(TableError::Empty(name.to_string()));
    }
    if values.iter().all(|&v| v == 0) {
        return Err(TableError::AllZero(name.to_string()));
    }
    Ok(())
}

fn max_value(values: &[u32]) -> u32 {
    values.iter().copied().max().unwrap_or(0)
}

pub fn to_hex(values: &[u32]) -> String {
    let digits = (bit_width(max_value(values)) as usize).div_ceil(4).max(1);
    let mut out = String::with_capacity(values.len() * (digits + 1));
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:0width$x}", v, width = digits);
    }
    out.push('\n');
    out
}

pub fn to_truth_table(values: &[u32]) -> String {
    let rows = values.len();
    let in_bits = (bit_width(rows.saturating_sub(1) as u32) as usize).max(1);
    let out_bits = bit_width(max_value(values)) as usize;

    let mut out = String::new();
    let _ = writeln!(out, ".i {}", in_bits);
    let _ = writeln!(out, ".o {}", out_bits);
    let _ = writeln!(out, ".p {}", rows);
    for (i, v) in values.iter().enumerate() {
        let _ = writeln!(out, "{:0iw$b} {:0ow$b}", i, v, iw = in_bits, ow = out_bits);
    }
    out.push_str(".e\n");
    out
}

fn is_stem_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Map a track name onto `[A-Za-z0-9_-]`, so it can only name a file
/// directly inside the export directory.
fn sanitize_stem(name: &str) -> String {
    name.chars().map(|c| if is_stem_char(c) { c } else { '_' }).collect()
}

/// Write `<dir>/<stem>.hex` and `<dir>/<stem>.pla`. The stem must be a
/// plain file name made of `[A-Za-z0-9_-]`.
pub fn write_table_files(dir: &Path, stem: &str, values: &[u32]) -> Result<[PathBuf; 2], TableError> {
    if stem.is_empty() || !stem.chars().all(is_stem_char) {
        return Err(TableError::InvalidName(stem.to_string()));
    }
    check_table(stem, values)?;
    let hex = dir.join(format!("{stem}.hex"));
    let pla = dir.join(format!("{stem}.pla"));
    std::fs::write(&hex, to_hex(values))?;
    std::fs::write(&pla, to_truth_table(values))?;
    info!(table = stem, rows = values.len(), "wrote {} and {}", hex.display(), pla.display());
    Ok([hex, pla])
}

fn table_stem(base: &str, kind: TableKind) -> String {
    format!("{}_{}", base, kind.name())
}

/// Pick a base name for channel `idx` whose table stems are all unused.
/// Clashing names get the channel index appended.
fn unique_base(name: &str, idx: usize, kinds: &[TableKind], taken: &HashSet<String>) -> String {
    let sanitized = sanitize_stem(name);
    let base = if sanitized.is_empty() { format!("channel{idx}") } else { sanitized };
    let mut candidate = base.clone();
    let mut attempt = 0;
    while kinds.iter().any(|&kind| taken.contains(&table_stem(&candidate, kind))) {
        attempt += 1;
        candidate = match attempt {
            1 => format!("{base}_{idx}"),
            n => format!("{base}_{idx}_{n}"),
        };
    }
    if candidate != name {
        warn!(track = name, stem = candidate.as_str(), "renamed track for table export");
    }
    candidate
}

/// Derive and write every channel's tables. All tables are checked before
/// the first file is written.
///
/// Files are named `<track>_<kind>`. Track names are reduced to
/// `[A-Za-z0-9_-]`, and a channel whose name would reuse another
/// channel's file gets its channel index appended.
pub fn export_song_tables(song: &Song, sample_rate: u32, dir: &Path) -> Result<Vec<PathBuf>, TableError> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut pending: Vec<(String, Vec<u32>)> = Vec::new();
    for (idx, channel) in song.channels.iter().enumerate() {
        let name = channel.track.name.as_str();
        let tables: Vec<(TableKind, Vec<u32>)> = match &channel.instrument {
            Instrument::Pulse(config) => {
                let pitched = pitched_tables(&channel.track, config, sample_rate);
                let owned: Vec<_> = pitched.tables().iter().map(|&(kind, values)| (kind, values.to_vec())).collect();
                owned
            }
            Instrument::Noise(_) => vec![(TableKind::Gate, percussion_tables(&channel.track).gate)],
        };
        let kinds: Vec<TableKind> = tables.iter().map(|(kind, _)| *kind).collect();
        let base = unique_base(name, idx, &kinds, &taken);
        for (kind, values) in tables {
            let stem = table_stem(&base, kind);
            taken.insert(stem.clone());
            pending.push((stem, values));
        }
    }

    for (stem, values) in &pending {
        check_table(stem, values)?;
    }

    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(pending.len() * 2);
    for (stem, values) in &pending {
        written.extend(write_table_files(dir, stem, values)?);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_ir::{Channel, ClockConfig, NoiseConfig, Step, Track, VoiceConfig};

    #[test]
    fn widths() {
        assert_eq!(bit_width(0), 0);
        assert_eq!(bit_width(1), 1);
        assert_eq!(bit_width(2), 2);
        assert_eq!(bit_width(255), 8);
        assert_eq!(bit_width(256), 9);
    }

    #[test]
    fn hex_is_fixed_width() {
        assert_eq!(to_hex(&[0, 1, 0, 0]), "0 1 0 0\n");
        assert_eq!(to_hex(&[0x12, 0x3, 0x1ff]), "012 003 1ff\n");
        assert_eq!(to_hex(&[0xab]), "ab\n");
    }

    #[test]
    fn truth_table_layout() {
        let pla = to_truth_table(&[0, 1, 0, 0]);
        assert_eq!(pla, ".i 2\n.o 1\n.p 4\n00 0\n01 1\n10 0\n11 0\n.e\n");
    }

    #[test]
    fn truth_table_single_row_has_one_input_bit() {
        let pla = to_truth_table(&[5]);
        assert_eq!(pla, ".i 1\n.o 3\n.p 1\n0 101\n.e\n");
    }

    #[test]
    fn check_rejects_degenerate_tables() {
        assert!(matches!(check_table("t", &[]), Err(TableError::Empty(_))));
        assert!(matches!(check_table("t", &[0, 0]), Err(TableError::AllZero(_))));
        assert!(check_table("t", &[0, 3]).is_ok());
    }

    #[test]
    fn writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let [hex, pla] = write_table_files(dir.path(), "lead_gate", &[0, 1, 1, 0]).unwrap();
        assert_eq!(hex.file_name().unwrap(), "lead_gate.hex");
        assert_eq!(std::fs::read_to_string(&hex).unwrap(), "0 1 1 0\n");
        assert!(std::fs::read_to_string(&pla).unwrap().starts_with(".i 2\n.o 1\n.p 4\n"));
    }

    #[test]
    fn all_zero_table_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_table_files(dir.path(), "z", &[0, 0, 0]).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    fn song(bass: Vec<Step>) -> Song {
        let mut song = Song::new("t", ClockConfig::from_sample_rate(48_000, 500, 120.0));
        song.add_channel(Channel::pulse(Track::new("bass", bass), VoiceConfig::default()));
        let hits = vec![Step::Trigger, Step::Sustain, Step::Sustain, Step::Sustain];
        song.add_channel(Channel::noise(Track::new("snare", hits), NoiseConfig::default()));
        song
    }

    #[test]
    fn song_export_names_files_by_track_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let steps = vec![Step::Note { semitone: 0, octave: 1 }, Step::Sustain, Step::NoteOff, Step::Sustain];
        let written = export_song_tables(&song(steps), 48_000, dir.path()).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "bass_pitch.hex",
                "bass_pitch.pla",
                "bass_gate.hex",
                "bass_gate.pla",
                "bass_trigger.hex",
                "bass_trigger.pla",
                "snare_gate.hex",
                "snare_gate.pla",
            ]
        );
        let trigger = std::fs::read_to_string(dir.path().join("bass_trigger.hex")).unwrap();
        assert_eq!(trigger, "0 1 0 0\n");
    }

    #[test]
    fn unnamed_pulse_entries_get_distinct_files() {
        let text = r#"
[clock]
master_clock = 48000
clocks_per_sample = 1

[[pulse]]
notes = "C.-."
octaves = "1..."

[[pulse]]
notes = "G.-."
octaves = "2..."
"#;
        let song = crate::load_song_str(text).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let written = export_song_tables(&song, 48_000, dir.path()).unwrap();
        assert_eq!(written.len(), 12);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 12);

        let first = std::fs::read_to_string(dir.path().join("pulse_pitch.hex")).unwrap();
        let second = std::fs::read_to_string(dir.path().join("pulse_1_pitch.hex")).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn clash_across_kinds_is_renamed() {
        // noise "a_pitch" would write a_pitch_gate, same as pulse "a_pitch"
        let mut song = Song::new("t", ClockConfig::from_sample_rate(48_000, 500, 120.0));
        let held = vec![Step::Note { semitone: 0, octave: 1 }, Step::Sustain];
        song.add_channel(Channel::pulse(Track::new("a_pitch", held), VoiceConfig::default()));
        song.add_channel(Channel::noise(Track::new("a_pitch", vec![Step::Trigger]), NoiseConfig::default()));
        let dir = tempfile::tempdir().unwrap();
        export_song_tables(&song, 48_000, dir.path()).unwrap();
        assert!(dir.path().join("a_pitch_gate.hex").exists());
        assert!(dir.path().join("a_pitch_1_gate.hex").exists());
    }

    #[test]
    fn track_name_cannot_leave_export_dir() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("tables");
        let mut song = Song::new("t", ClockConfig::from_sample_rate(48_000, 500, 120.0));
        song.add_channel(Channel::noise(Track::new("../escaped", vec![Step::Trigger]), NoiseConfig::default()));
        let written = export_song_tables(&song, 48_000, &out).unwrap();
        for path in &written {
            assert_eq!(path.parent(), Some(out.as_path()));
        }
        assert!(out.join("___escaped_gate.hex").exists());
        assert!(!root.path().join("escaped_gate.hex").exists());
    }

    #[test]
    fn path_like_stem_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_table_files(dir.path(), "../up", &[1]).unwrap_err();
        assert!(matches!(err, TableError::InvalidName(ref name) if name == "../up"));
        assert!(matches!(write_table_files(dir.path(), "", &[1]), Err(TableError::InvalidName(_))));
    }

    #[test]
    fn song_export_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tables");
        // notes only: nothing is ever held, so the gate table is all zero
        let steps = vec![Step::Note { semitone: 0, octave: 1 }, Step::Note { semitone: 2, octave: 1 }];
        let err = export_song_tables(&song(steps), 48_000, &out).unwrap_err();
        assert!(matches!(err, TableError::AllZero(ref name) if name == "bass_gate"));
        assert!(!out.exists());
    }
}
