//! Integer volume envelope and vibrato oscillator for pulse voices.

use ct_ir::{VoiceConfig, MAX_VOLUME};

/// Envelope stage. Attack is instantaneous, so a note-on goes straight to
/// `Decay` at full volume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdsrStage {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Inputs that move the envelope between stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeEvent {
    NoteOn,
    NoteOff,
    /// The stage's target level was reached on this tick.
    ReachedTarget,
}

impl AdsrStage {
    /// Transition table.
    pub const fn on(self, event: EnvelopeEvent) -> AdsrStage {
        use AdsrStage::*;
        use EnvelopeEvent::*;
        match (self, event) {
            (_, NoteOn) => Decay,
            (_, NoteOff) => Release,
            (Attack, ReachedTarget) => Decay,
            (Decay, ReachedTarget) => Sustain,
            (Release, ReachedTarget) => Idle,
            (Idle, ReachedTarget) => Idle,
            (Sustain, ReachedTarget) => Sustain,
        }
    }
}

/// Step of `ceil(delta / 2^shift)`. Any non-zero delta moves by at least
/// one, so geometric approaches always land on their target.
pub const fn ceil_shift(delta: i32, shift: u8) -> i32 {
    let rounding = (1i32 << shift) - 1;
    (delta + rounding) >> shift
}

/// Envelope volume plus stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    pub stage: AdsrStage,
    pub volume: i32,
}

impl Envelope {
    pub fn note_on(&mut self) {
        self.volume = MAX_VOLUME as i32;
        self.stage = self.stage.on(EnvelopeEvent::NoteOn);
    }

    pub fn note_off(&mut self) {
        self.stage = self.stage.on(EnvelopeEvent::NoteOff);
    }

    /// Advance one tick.
    pub fn tick(&mut self, config: &VoiceConfig) {
        let reached = match self.stage {
            AdsrStage::Idle => false,
            AdsrStage::Attack => {
                self.volume = MAX_VOLUME as i32;
                true
            }
            AdsrStage::Decay => {
                let sustain = config.sustain as i32;
                self.volume -= ceil_shift(self.volume - sustain, config.decay);
                if self.volume <= sustain {
                    self.volume = sustain;
                    true
                } else {
                    false
                }
            }
            AdsrStage::Sustain => {
                self.volume = config.sustain as i32;
                false
            }
            AdsrStage::Release => {
                self.volume -= ceil_shift(self.volume, config.release);
                if self.volume <= 0 {
                    self.volume = 0;
                    true
                } else {
                    false
                }
            }
        };
        if reached {
            self.stage = self.stage.on(EnvelopeEvent::ReachedTarget);
        }
    }
}

/// Quadrature sine/cosine oscillator with a depth that ramps up during
/// decay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vibrato {
    pub sin: i32,
    pub cos: i32,
    pub level: i32,
}

impl Default for Vibrato {
    fn default() -> Self {
        Self { sin: 0, cos: 1023, level: 0 }
    }
}

impl Vibrato {
    /// Rotate the sine/cosine pair one step.
    pub fn rotate(&mut self, rate: u8) {
        self.cos -= self.sin >> rate;
        self.sin += self.cos >> rate;
    }

    /// Move `level` toward `depth`; a zero shift leaves it untouched.
    pub fn ramp(&mut self, depth: u16, shift: u8) {
        if shift == 0 {
            return;
        }
        self.level += ceil_shift(depth as i32 - self.level, shift);
    }

    /// Phase offset contributed this sample.
    pub fn offset(&self) -> i32 {
        (self.level * self.cos) >> 10
    }
}
