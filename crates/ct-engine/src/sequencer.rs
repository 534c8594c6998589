//! Tick scheduler and mixer.
//!
//! The engine owns one voice per song channel. Rendering is split into runs
//! that never cross a tick boundary; at the start of each tick the score is
//! advanced (first tick of a step only) and every envelope is ticked once.
//! All counters live in the engine, so the output does not depend on how a
//! caller slices its render requests.

use alloc::vec::Vec;
use ct_ir::{ConfigError, Song, Track};

use crate::clock::Clock;
use crate::voice::{ChipVoice, Voice};

/// Block size used when rendering to 16-bit output.
pub const BLOCK_SIZE: usize = 256;

/// A track and the voice it drives.
#[derive(Clone, Debug)]
pub struct SequencedVoice {
    pub track: Track,
    pub voice: ChipVoice,
}

/// Playback position in score steps, ticks and samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Score steps dispatched so far
    pub step: u64,
    /// Tick within the current step
    pub tick: u32,
    /// Sample within the current tick
    pub sample: u32,
}

/// The sound chip: sequencer, voices and mixer.
#[derive(Clone, Debug)]
pub struct Engine {
    channels: Vec<SequencedVoice>,
    clock: Clock,
    /// Samples rendered in the current tick
    tick_samples: u32,
    /// Tick index within the current step
    tick_count: u32,
    /// Score steps dispatched
    song_count: u64,
}

impl Engine {
    /// Build an engine for `song`, validating every configuration record.
    pub fn new(song: &Song) -> Result<Self, ConfigError> {
        song.validate()?;
        let clock = Clock::new(&song.clock)?;
        let channels = song
            .channels
            .iter()
            .map(|ch| SequencedVoice {
                track: ch.track.clone(),
                voice: ChipVoice::new(&ch.instrument, clock.sample_rate),
            })
            .collect();

        Ok(Self {
            channels,
            clock,
            tick_samples: 0,
            tick_count: 0,
            song_count: 0,
        })
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate
    }

    pub fn channels(&self) -> &[SequencedVoice] {
        &self.channels
    }

    pub fn position(&self) -> Position {
        Position {
            step: self.song_count,
            tick: self.tick_count,
            sample: self.tick_samples,
        }
    }

    /// Samples needed to play every track through at least once.
    pub fn samples_per_loop(&self) -> u64 {
        let steps = self.channels.iter().map(|ch| ch.track.len()).max().unwrap_or(0);
        steps as u64 * self.clock.samples_per_beat()
    }

    /// Tick boundary: dispatch the next step on the first tick of a step,
    /// then advance every envelope once, in channel order.
    fn process_tick(&mut self) {
        if self.tick_count == 0 {
            let count = self.song_count;
            for ch in &mut self.channels {
                if let Some(step) = ch.track.step_at(count) {
                    ch.voice.dispatch(step);
                }
            }
            self.song_count += 1;
        }

        for ch in &mut self.channels {
            ch.voice.tick_envelope();
        }

        self.tick_count += 1;
        if self.tick_count >= self.clock.ticks_per_beat {
            self.tick_count = 0;
        }
    }

    /// Mix all voices into `out` on top of its current contents.
    pub fn mix(&mut self, out: &mut [i32]) {
        let samples_per_tick = self.clock.samples_per_tick;
        let mut offset = 0;
        while offset < out.len() {
            if self.tick_samples == 0 {
                self.process_tick();
            }

            let remaining_in_tick = (samples_per_tick - self.tick_samples) as usize;
            let run = (out.len() - offset).min(remaining_in_tick);
            let slice = &mut out[offset..offset + run];
            for ch in &mut self.channels {
                ch.voice.render(slice);
            }

            offset += run;
            self.tick_samples += run as u32;
            if self.tick_samples >= samples_per_tick {
                self.tick_samples = 0;
            }
        }
    }

    /// Render `out.len()` samples of raw (unclipped) chip output.
    pub fn render(&mut self, out: &mut [i32]) {
        out.fill(0);
        self.mix(out);
    }

    /// Render saturated 16-bit PCM without allocating.
    pub fn render_i16(&mut self, out: &mut [i16]) {
        let mut block = [0i32; BLOCK_SIZE];
        for chunk in out.chunks_mut(BLOCK_SIZE) {
            let mixed = &mut block[..chunk.len()];
            self.render(mixed);
            for (dst, &src) in chunk.iter_mut().zip(mixed.iter()) {
                *dst = src.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
            }
        }
    }

    /// Render `count` samples of 16-bit PCM into a new buffer.
    pub fn render_samples(&mut self, count: usize) -> Vec<i16> {
        let mut out = alloc::vec![0i16; count];
        self.render_i16(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::AdsrStage;
    use crate::pitch::phase_increment;
    use alloc::vec;
    use ct_ir::{Channel, ClockConfig, NoiseConfig, Step, VoiceConfig};

    const C0: Step = Step::Note { semitone: 0, octave: 0 };
    const E1: Step = Step::Note { semitone: 4, octave: 1 };

    /// 48 kHz, 100 samples per tick, 3 ticks per step.
    fn clock() -> ClockConfig {
        ClockConfig { steps_per_quarter: 4, ..ClockConfig::from_sample_rate(48_000, 100, 2400.0) }
    }

    fn song(steps: Vec<Step>) -> Song {
        let mut song = Song::new("test", clock());
        let config = VoiceConfig { phase_bits: 16, ..Default::default() };
        song.add_channel(Channel::pulse(Track::new("lead", steps), config));
        song
    }

    fn pulse(engine: &Engine, index: usize) -> &crate::pulse::PulseVoice {
        match &engine.channels[index].voice {
            ChipVoice::Pulse(p) => p,
            ChipVoice::Noise(_) => panic!("expected pulse voice"),
        }
    }

    #[test]
    fn test_clock_has_three_ticks_per_step() {
        let engine = Engine::new(&song(vec![C0])).unwrap();
        assert_eq!(engine.clock().ticks_per_beat, 3);
        assert_eq!(engine.clock().samples_per_tick, 100);
    }

    #[test]
    fn first_sample_dispatches_first_step() {
        let mut engine = Engine::new(&song(vec![C0, Step::Sustain])).unwrap();
        let mut buf = [0i32; 1];
        engine.render(&mut buf);
        let voice = pulse(&engine, 0);
        assert_eq!(voice.stage(), AdsrStage::Decay);
        assert_eq!(voice.phase_inc, phase_increment(0, 16, 48_000));
        assert_eq!(engine.position(), Position { step: 1, tick: 1, sample: 1 });
    }

    #[test]
    fn step_advances_every_ticks_per_beat() {
        let mut engine = Engine::new(&song(vec![C0, Step::NoteOff, E1])).unwrap();
        // One full step (3 ticks) plus one sample enters the second step
        let mut buf = vec![0i32; 301];
        engine.render(&mut buf);
        assert_eq!(engine.position().step, 2);
        assert_eq!(pulse(&engine, 0).stage(), AdsrStage::Release);

        let mut buf = vec![0i32; 300];
        engine.render(&mut buf);
        assert_eq!(engine.position().step, 3);
        assert_eq!(pulse(&engine, 0).phase_inc, phase_increment(16, 16, 48_000));
    }

    #[test]
    fn envelope_ticks_once_per_tick() {
        let mut engine = Engine::new(&song(vec![C0])).unwrap();
        let mut buf = vec![0i32; 100];
        engine.render(&mut buf);
        // note-on then one decay tick: 4095 - ceil(3071 / 4)
        assert_eq!(pulse(&engine, 0).volume(), 3327);
        // 99 single-sample calls stay inside the next tick
        engine.render(&mut buf[..1]);
        for _ in 0..98 {
            engine.render(&mut buf[..1]);
        }
        assert_eq!(pulse(&engine, 0).volume(), 2751);
    }

    #[test]
    fn tracks_loop_independently() {
        let mut s = song(vec![C0, Step::Sustain]);
        let config = VoiceConfig { phase_bits: 16, ..Default::default() };
        s.add_channel(Channel::pulse(Track::new("bass", vec![E1, Step::Sustain, Step::NoteOff]), config));
        let mut engine = Engine::new(&s).unwrap();
        // Steps 0..=3: lead C . C ., bass E . -  E
        let mut buf = vec![0i32; 3 * 300 + 1];
        engine.render(&mut buf);
        assert_eq!(engine.position().step, 4);
        assert_eq!(pulse(&engine, 1).stage(), AdsrStage::Decay);
        assert_eq!(pulse(&engine, 1).volume(), 3327);
    }

    #[test]
    fn empty_track_dispatches_nothing() {
        let mut s = song(vec![]);
        s.add_channel(Channel::noise(Track::new("kit", vec![Step::Trigger]), NoiseConfig::default()));
        let mut engine = Engine::new(&s).unwrap();
        let mut buf = vec![0i32; 500];
        engine.render(&mut buf);
        assert_eq!(pulse(&engine, 0).stage(), AdsrStage::Idle);
    }

    #[test]
    fn split_at_tick_boundary_matches_single_call() {
        let steps = vec![C0, Step::Sustain, E1, Step::NoteOff];
        let mut whole = Engine::new(&song(steps.clone())).unwrap();
        let mut split = Engine::new(&song(steps)).unwrap();

        // 250 samples spans the boundaries at 100 and 200
        let mut a = vec![0i32; 250];
        whole.render(&mut a);

        let mut b = vec![0i32; 250];
        split.render(&mut b[..100]);
        split.render(&mut b[100..200]);
        split.render(&mut b[200..]);
        assert_eq!(a, b);
    }

    #[test]
    fn arbitrary_splits_match_single_call() {
        let steps = vec![C0, Step::Sustain, E1, Step::Sustain, Step::NoteOff, Step::Sustain];
        let mut whole = Engine::new(&song(steps.clone())).unwrap();
        let mut split = Engine::new(&song(steps)).unwrap();

        let mut a = vec![0i32; 2000];
        whole.render(&mut a);

        let mut b = vec![0i32; 2000];
        let mut offset = 0;
        for size in [1usize, 7, 99, 100, 101, 3, 250, 512].iter().cycle() {
            if offset >= b.len() {
                break;
            }
            let end = (offset + size).min(b.len());
            split.render(&mut b[offset..end]);
            offset = end;
        }
        assert_eq!(a, b);
    }

    #[test]
    fn render_clears_before_mixing() {
        let mut engine = Engine::new(&song(vec![Step::Sustain])).unwrap();
        let mut buf = [123i32; 10];
        engine.render(&mut buf);
        assert!(buf.iter().all(|&s| s == 0));
    }

    #[test]
    fn render_i16_saturates() {
        let mut s = Song::new("loud", clock());
        let config = VoiceConfig { phase_bits: 16, sustain: 4000, ..Default::default() };
        for _ in 0..8 {
            s.add_channel(Channel::pulse(Track::new("v", vec![C0]), config));
        }
        let mut engine = Engine::new(&s).unwrap();
        let out = engine.render_samples(1000);
        assert!(out.iter().any(|&s| s == i16::MIN || s == i16::MAX));
    }

    #[test]
    fn render_i16_matches_raw_when_in_range() {
        let steps = vec![C0, Step::Sustain, Step::NoteOff];
        let mut raw = Engine::new(&song(steps.clone())).unwrap();
        let mut pcm = Engine::new(&song(steps)).unwrap();
        let mut a = vec![0i32; 700];
        raw.render(&mut a);
        let b = pcm.render_samples(700);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(*x, *y as i32);
        }
    }

    #[test]
    fn samples_per_loop_uses_longest_track() {
        let engine = Engine::new(&song(vec![C0; 5])).unwrap();
        assert_eq!(engine.samples_per_loop(), 5 * 300);
    }

    #[test]
    fn invalid_song_rejected() {
        let mut s = Song::new("bad", clock());
        s.add_channel(Channel::noise(Track::new("kit", vec![]), NoiseConfig { seed: 0, ..Default::default() }));
        assert!(Engine::new(&s).is_err());
    }
}
