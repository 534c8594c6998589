//! Song container: clock plus an ordered list of voice/track pairs.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::config::{ClockConfig, ConfigError, NoiseConfig, VoiceConfig};
use crate::score::Track;

/// Which voice a track drives, with its static parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Instrument {
    Pulse(VoiceConfig),
    Noise(NoiseConfig),
}

impl Instrument {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Instrument::Pulse(config) => config.validate(),
            Instrument::Noise(config) => config.validate(),
        }
    }
}

/// A track bound to the voice that plays it.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub track: Track,
    pub instrument: Instrument,
}

impl Channel {
    pub fn pulse(track: Track, config: VoiceConfig) -> Self {
        Self { track, instrument: Instrument::Pulse(config) }
    }

    pub fn noise(track: Track, config: NoiseConfig) -> Self {
        Self { track, instrument: Instrument::Noise(config) }
    }
}

/// A complete, immutable score. Channel order is the voice update order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Song {
    pub title: ArrayString<32>,
    pub clock: ClockConfig,
    pub channels: Vec<Channel>,
}

impl Song {
    pub fn new(title: &str, clock: ClockConfig) -> Self {
        let mut song = Self { clock, ..Self::default() };
        let _ = song.title.try_push_str(title);
        song
    }

    /// Append a channel and return its index.
    pub fn add_channel(&mut self, channel: Channel) -> usize {
        self.channels.push(channel);
        self.channels.len() - 1
    }

    /// Validate the clock and every instrument.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clock.validate()?;
        self.channels.iter().try_for_each(|ch| ch.instrument.validate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Step;
    use alloc::vec;

    #[test]
    fn add_channel_preserves_order() {
        let mut song = Song::new("demo", ClockConfig::default());
        let a = song.add_channel(Channel::pulse(Track::new("a", vec![]), VoiceConfig::default()));
        let b = song.add_channel(Channel::noise(Track::new("b", vec![]), NoiseConfig::default()));
        assert_eq!((a, b), (0, 1));
        assert_eq!(song.channels[1].track.name.as_str(), "b");
        assert_eq!(song.title.as_str(), "demo");
    }

    #[test]
    fn validate_reports_bad_instrument() {
        let mut song = Song::new("bad", ClockConfig::default());
        let config = VoiceConfig { decay: 40, ..Default::default() };
        song.add_channel(Channel::pulse(Track::new("a", vec![Step::Sustain]), config));
        assert!(song.validate().is_err());
    }
}
