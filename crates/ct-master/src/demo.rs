//! Built-in song used when no song file is given.

use ct_formats::{parse_percussion, parse_pitched};
use ct_ir::{Channel, ClockConfig, NoiseConfig, Song, VoiceConfig};

const BASS_NOTES: &str = "C.C.C.C-..C-..C-..C-..C.C.C.C-..";
const BASS_OCTAVES: &str = "00000000000000000000000000000000";
const SNARE: &str = "....x.......x.......x.......x.x.";

/// Bass line with a backbeat snare, on the default VGA-timed clock.
pub fn demo_song() -> Song {
    let mut song = Song::new("demo", ClockConfig::default());

    let bass = VoiceConfig {
        pulse_width: 1,
        carrier_multiplier: 2,
        decay: 2,
        sustain: 1024,
        release: 3,
        vibrato_depth: 0,
        vibrato_rate: 0,
        vibrato_envelope: 0,
        ..VoiceConfig::default()
    };
    song.add_channel(Channel::pulse(parse_pitched("bass", BASS_NOTES, BASS_OCTAVES), bass));
    song.add_channel(Channel::noise(parse_percussion("snare", SNARE), NoiseConfig::default()));
    song
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_is_valid_and_loops_together() {
        let song = demo_song();
        assert_eq!(song.validate(), Ok(()));
        assert_eq!(song.channels[0].track.len(), 32);
        assert_eq!(song.channels[1].track.len(), 32);
        assert!(song.channels[0].track.steps.iter().all(|s| !matches!(
            s,
            ct_ir::Step::Note { octave, .. } if *octave != 0
        )));
    }
}
