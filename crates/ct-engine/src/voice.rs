//! Common interface over the chip's voices.

use ct_ir::{Instrument, Step};

use crate::noise::NoiseVoice;
use crate::pulse::PulseVoice;

/// A sound-chip voice driven by score steps and sequencer ticks.
pub trait Voice {
    fn note_on(&mut self, semitone: u8, octave: u8);
    fn note_off(&mut self);
    fn sustain(&mut self);
    fn trigger(&mut self);

    /// Advance envelope state by one sequencer tick.
    fn tick_envelope(&mut self);

    /// Add this voice's output into `buffer`.
    fn render(&mut self, buffer: &mut [i32]);

    /// Route a score step to the matching handler.
    fn dispatch(&mut self, step: Step) {
        match step {
            Step::Note { semitone, octave } => self.note_on(semitone, octave),
            Step::Sustain => self.sustain(),
            Step::NoteOff => self.note_off(),
            Step::Trigger => self.trigger(),
        }
    }
}

/// Concrete voice owned by a sequencer channel.
#[derive(Clone, Debug)]
pub enum ChipVoice {
    Pulse(PulseVoice),
    Noise(NoiseVoice),
}

impl ChipVoice {
    pub fn new(instrument: &Instrument, sample_rate: u32) -> Self {
        match instrument {
            Instrument::Pulse(config) => ChipVoice::Pulse(PulseVoice::new(*config, sample_rate)),
            Instrument::Noise(config) => ChipVoice::Noise(NoiseVoice::new(*config)),
        }
    }

    fn inner(&mut self) -> &mut dyn Voice {
        match self {
            ChipVoice::Pulse(v) => v,
            ChipVoice::Noise(v) => v,
        }
    }
}

impl Voice for ChipVoice {
    fn note_on(&mut self, semitone: u8, octave: u8) {
        self.inner().note_on(semitone, octave);
    }

    fn note_off(&mut self) {
        self.inner().note_off();
    }

    fn sustain(&mut self) {
        self.inner().sustain();
    }

    fn trigger(&mut self) {
        self.inner().trigger();
    }

    fn tick_envelope(&mut self) {
        self.inner().tick_envelope();
    }

    fn render(&mut self, buffer: &mut [i32]) {
        self.inner().render(buffer);
    }
}
