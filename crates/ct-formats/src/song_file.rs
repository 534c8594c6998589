//! TOML song files.
//!
//! ```toml
//! title = "demo"
//!
//! [clock]
//! bpm = 140.0
//!
//! [[pulse]]
//! name = "bass"
//! notes   = "C.C.-.G."
//! octaves = "0.0...0."
//! decay = 3
//!
//! [[noise]]
//! name = "snare"
//! pattern = "..x...x."
//! ```
//!
//! Every field is optional and falls back to the matching config default.
//! Channels are ordered pulse entries first, then noise entries, each in
//! file order.
//!
//! Saving writes every field, so a saved file keeps its sound even if the
//! defaults change.

use std::path::Path;

use ct_ir::{Channel, ClockConfig, Instrument, NoiseConfig, Song, VoiceConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::notation::{format_percussion, format_pitched, parse_percussion, parse_pitched};
use crate::FormatError;

/// Root song file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SongFile {
    pub title: String,
    pub clock: ClockSection,
    pub pulse: Vec<PulseEntry>,
    pub noise: Vec<NoiseEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClockSection {
    pub master_clock: u32,
    pub clocks_per_sample: u32,
    pub samples_per_tick: u32,
    pub steps_per_quarter: u32,
    pub bpm: f64,
}

impl Default for ClockSection {
    fn default() -> Self {
        let c = ClockConfig::default();
        Self {
            master_clock: c.master_clock,
            clocks_per_sample: c.clocks_per_sample,
            samples_per_tick: c.samples_per_tick,
            steps_per_quarter: c.steps_per_quarter,
            bpm: c.bpm,
        }
    }
}

impl From<&ClockConfig> for ClockSection {
    fn from(c: &ClockConfig) -> Self {
        Self {
            master_clock: c.master_clock,
            clocks_per_sample: c.clocks_per_sample,
            samples_per_tick: c.samples_per_tick,
            steps_per_quarter: c.steps_per_quarter,
            bpm: c.bpm,
        }
    }
}

impl From<&ClockSection> for ClockConfig {
    fn from(s: &ClockSection) -> Self {
        ClockConfig {
            master_clock: s.master_clock,
            clocks_per_sample: s.clocks_per_sample,
            samples_per_tick: s.samples_per_tick,
            steps_per_quarter: s.steps_per_quarter,
            bpm: s.bpm,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PulseEntry {
    pub name: String,
    pub notes: String,
    pub octaves: String,
    pub pulse_width: u8,
    pub octave_transpose: i8,
    pub detune: i32,
    pub carrier_multiplier: u32,
    pub decay: u8,
    pub sustain: u16,
    pub release: u8,
    pub vibrato_depth: u16,
    pub vibrato_rate: u8,
    pub vibrato_envelope: u8,
    pub phase_bits: u8,
}

impl Default for PulseEntry {
    fn default() -> Self {
        let v = VoiceConfig::default();
        Self {
            name: "pulse".into(),
            notes: String::new(),
            octaves: String::new(),
            pulse_width: v.pulse_width,
            octave_transpose: v.octave_transpose,
            detune: v.detune,
            carrier_multiplier: v.carrier_multiplier,
            decay: v.decay,
            sustain: v.sustain,
            release: v.release,
            vibrato_depth: v.vibrato_depth,
            vibrato_rate: v.vibrato_rate,
            vibrato_envelope: v.vibrato_envelope,
            phase_bits: v.phase_bits,
        }
    }
}

impl PulseEntry {
    pub fn from_track(track: &ct_ir::Track, v: &VoiceConfig) -> Self {
        let (notes, octaves) = format_pitched(track);
        Self {
            name: track.name.to_string(),
            notes,
            octaves,
            pulse_width: v.pulse_width,
            octave_transpose: v.octave_transpose,
            detune: v.detune,
            carrier_multiplier: v.carrier_multiplier,
            decay: v.decay,
            sustain: v.sustain,
            release: v.release,
            vibrato_depth: v.vibrato_depth,
            vibrato_rate: v.vibrato_rate,
            vibrato_envelope: v.vibrato_envelope,
            phase_bits: v.phase_bits,
        }
    }

    pub fn voice_config(&self) -> VoiceConfig {
        VoiceConfig {
            pulse_width: self.pulse_width,
            octave_transpose: self.octave_transpose,
            detune: self.detune,
            carrier_multiplier: self.carrier_multiplier,
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
            vibrato_depth: self.vibrato_depth,
            vibrato_rate: self.vibrato_rate,
            vibrato_envelope: self.vibrato_envelope,
            phase_bits: self.phase_bits,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseEntry {
    pub name: String,
    pub pattern: String,
    pub taps: u16,
    pub seed: u16,
    pub min_shift: u8,
    pub max_shift: u8,
    pub decay_period: u16,
}

impl Default for NoiseEntry {
    fn default() -> Self {
        let n = NoiseConfig::default();
        Self {
            name: "noise".into(),
            pattern: String::new(),
            taps: n.taps,
            seed: n.seed,
            min_shift: n.min_shift,
            max_shift: n.max_shift,
            decay_period: n.decay_period,
        }
    }
}

impl NoiseEntry {
    pub fn from_track(track: &ct_ir::Track, n: &NoiseConfig) -> Self {
        Self {
            name: track.name.to_string(),
            pattern: format_percussion(track),
            taps: n.taps,
            seed: n.seed,
            min_shift: n.min_shift,
            max_shift: n.max_shift,
            decay_period: n.decay_period,
        }
    }

    pub fn noise_config(&self) -> NoiseConfig {
        NoiseConfig {
            taps: self.taps,
            seed: self.seed,
            min_shift: self.min_shift,
            max_shift: self.max_shift,
            decay_period: self.decay_period,
        }
    }
}

impl SongFile {
    /// File form of `song`. Loading the result gives back the same song as
    /// long as pulse channels come before noise channels.
    pub fn from_song(song: &Song) -> Self {
        let mut file = SongFile {
            title: song.title.to_string(),
            clock: ClockSection::from(&song.clock),
            ..Default::default()
        };
        let mut seen_noise = false;
        for channel in &song.channels {
            match &channel.instrument {
                Instrument::Pulse(config) => {
                    if seen_noise {
                        warn!(track = channel.track.name.as_str(), "pulse channel after noise will load first");
                    }
                    file.pulse.push(PulseEntry::from_track(&channel.track, config));
                }
                Instrument::Noise(config) => {
                    seen_noise = true;
                    file.noise.push(NoiseEntry::from_track(&channel.track, config));
                }
            }
        }
        file
    }

    /// Build and validate the song.
    pub fn to_song(&self) -> Result<Song, FormatError> {
        let mut song = Song::new(&self.title, ClockConfig::from(&self.clock));
        for entry in &self.pulse {
            let track = parse_pitched(&entry.name, &entry.notes, &entry.octaves);
            song.add_channel(Channel::pulse(track, entry.voice_config()));
        }
        for entry in &self.noise {
            let track = parse_percussion(&entry.name, &entry.pattern);
            song.add_channel(Channel::noise(track, entry.noise_config()));
        }
        song.validate()?;
        Ok(song)
    }
}

pub fn load_song_str(text: &str) -> Result<Song, FormatError> {
    let file: SongFile = toml::from_str(text)?;
    let song = file.to_song()?;
    debug!(title = song.title.as_str(), channels = song.channels.len(), "parsed song");
    Ok(song)
}

pub fn save_song_str(song: &Song) -> Result<String, FormatError> {
    Ok(toml::to_string(&SongFile::from_song(song))?)
}

pub fn save_song_file(song: &Song, path: &Path) -> Result<(), FormatError> {
    std::fs::write(path, save_song_str(song)?)?;
    info!(path = %path.display(), title = song.title.as_str(), "saved song");
    Ok(())
}

/// Load a song file. An untitled song takes the file stem as its title.
pub fn load_song_file(path: &Path) -> Result<Song, FormatError> {
    let text = std::fs::read_to_string(path)?;
    let mut song = load_song_str(&text)?;
    if song.title.is_empty() {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            let _ = song.title.try_push_str(stem);
        }
    }
    Ok(song)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_ir::{Instrument, Step};
    use std::io::Write;

    const SONG: &str = r#"
title = "test"

[clock]
master_clock = 48000
clocks_per_sample = 1
samples_per_tick = 500

[[noise]]
name = "snare"
pattern = "..x."
min_shift = 3

[[pulse]]
name = "bass"
notes = "C.-."
octaves = "1..."
decay = 3
"#;

    #[test]
    fn loads_channels_in_order() {
        let song = load_song_str(SONG).unwrap();
        assert_eq!(song.title.as_str(), "test");
        assert_eq!(song.channels.len(), 2);
        assert_eq!(song.channels[0].track.name.as_str(), "bass");
        assert_eq!(song.channels[1].track.name.as_str(), "snare");
        assert_eq!(song.channels[0].track.steps[0], Step::Note { semitone: 0, octave: 1 });
    }

    #[test]
    fn unspecified_fields_take_defaults() {
        let song = load_song_str(SONG).unwrap();
        assert_eq!(song.clock.master_clock, 48_000);
        assert_eq!(song.clock.bpm, ClockConfig::default().bpm);
        let Instrument::Pulse(voice) = song.channels[0].instrument else { panic!("expected pulse") };
        assert_eq!(voice.decay, 3);
        assert_eq!(voice.sustain, VoiceConfig::default().sustain);
        let Instrument::Noise(noise) = song.channels[1].instrument else { panic!("expected noise") };
        assert_eq!(noise.min_shift, 3);
        assert_eq!(noise.seed, NoiseConfig::default().seed);
    }

    #[test]
    fn empty_file_is_empty_song() {
        let song = load_song_str("").unwrap();
        assert!(song.channels.is_empty());
        assert_eq!(song.clock, ClockConfig::default());
    }

    #[test]
    fn syntax_error_is_reported() {
        assert!(matches!(load_song_str("[[pulse]\n"), Err(FormatError::Toml(_))));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let text = "[[pulse]]\nname = \"a\"\nsustian = 3\n";
        assert!(matches!(load_song_str(text), Err(FormatError::Toml(_))));
    }

    #[test]
    fn out_of_range_parameter_is_config_error() {
        let text = "[[pulse]]\nnotes = \"C\"\noctaves = \"0\"\ndecay = 40\n";
        assert!(matches!(load_song_str(text), Err(FormatError::Config(_))));
    }

    #[test]
    fn file_stem_becomes_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groove.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"[[noise]]\npattern = \"x...\"\n").unwrap();
        drop(f);
        let song = load_song_file(&path).unwrap();
        assert_eq!(song.title.as_str(), "groove");
        assert_eq!(song.channels[0].track.name.as_str(), "noise");
    }

    #[test]
    fn saved_song_loads_back_unchanged() {
        let mut song = load_song_str(SONG).unwrap();
        if let Instrument::Pulse(ref mut voice) = song.channels[0].instrument {
            voice.detune = -7;
            voice.vibrato_depth = 300;
        }
        let text = save_song_str(&song).unwrap();
        assert!(text.contains("detune = -7"));
        assert!(text.contains("notes = \"C.-.\""));
        assert_eq!(load_song_str(&text).unwrap(), song);
    }

    #[test]
    fn save_keeps_every_parameter() {
        let song = load_song_str("[[pulse]]\nnotes = \"C\"\noctaves = \"2\"\n").unwrap();
        let text = save_song_str(&song).unwrap();
        for key in ["pulse_width", "octave_transpose", "carrier_multiplier", "decay", "sustain", "release", "vibrato_rate"] {
            assert!(text.contains(&format!("{key} = ")), "missing {key}");
        }
    }

    #[test]
    fn save_file_writes_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let song = load_song_str(SONG).unwrap();
        save_song_file(&song, &path).unwrap();
        assert_eq!(load_song_file(&path).unwrap(), song);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_song_file(Path::new("/nonexistent/song.toml")).unwrap_err();
        assert!(matches!(err, FormatError::Io(_)));
    }
}
