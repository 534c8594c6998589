//! LFSR percussion voice.

use ct_ir::NoiseConfig;

use crate::voice::Voice;

/// Snare-style noise burst: a 16-bit Galois LFSR clocked every other
/// sample, attenuated by a shift that grows stepwise after each trigger.
#[derive(Clone, Debug)]
pub struct NoiseVoice {
    config: NoiseConfig,
    /// LFSR contents (16 bits)
    pub register: u16,
    /// Current attenuation; `config.max_shift` is the resting value
    pub shift: u8,
    /// Ticks since the last attenuation step
    pub counter: u16,
    /// Set when the next sample clocks the register
    clock_next: bool,
}

impl NoiseVoice {
    pub fn new(config: NoiseConfig) -> Self {
        Self {
            register: config.seed,
            shift: config.max_shift,
            counter: 0,
            clock_next: true,
            config,
        }
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    pub fn on_trigger(&mut self) {
        self.shift = self.config.min_shift;
        self.counter = 0;
    }

    pub fn tick_envelope(&mut self) {
        self.counter += 1;
        if self.counter >= self.config.decay_period {
            if self.shift < self.config.max_shift {
                self.shift += 1;
            }
            self.counter = 0;
        }
    }

    /// Shift the register left once, folding in the taps when the bit
    /// shifted out was set.
    #[inline]
    fn clock(&mut self) {
        let msb = self.register & 0x8000;
        self.register <<= 1;
        if msb != 0 {
            self.register ^= self.config.taps;
        }
    }

    /// Add the attenuated register to `buffer`. The held value spans two
    /// samples.
    pub fn render(&mut self, buffer: &mut [i32]) {
        for out in buffer.iter_mut() {
            if self.clock_next {
                self.clock();
            }
            self.clock_next = !self.clock_next;
            *out += (self.register as u32 >> self.shift) as i32;
        }
    }
}

impl Voice for NoiseVoice {
    /// Any pitched note on a percussion track fires the burst.
    fn note_on(&mut self, _semitone: u8, _octave: u8) {
        self.on_trigger();
    }

    fn note_off(&mut self) {}

    fn sustain(&mut self) {}

    fn trigger(&mut self) {
        self.on_trigger();
    }

    fn tick_envelope(&mut self) {
        NoiseVoice::tick_envelope(self);
    }

    fn render(&mut self, buffer: &mut [i32]) {
        NoiseVoice::render(self, buffer);
    }
}
