//! Two-accumulator pulse voice.

use ct_ir::VoiceConfig;

use crate::envelope::{AdsrStage, Envelope, Vibrato};
use crate::pitch::PitchTable;
use crate::voice::Voice;

/// Pulse/square voice with a secondary accumulator running at a multiple
/// of the primary (plus detune).
#[derive(Clone, Debug)]
pub struct PulseVoice {
    config: VoiceConfig,
    pitch: PitchTable,
    /// Primary phase accumulator (`phase_bits` wide)
    pub primary_phase: u32,
    /// Secondary phase accumulator (`phase_bits` wide)
    pub secondary_phase: u32,
    /// Current phase increment per sample
    pub phase_inc: u32,
    pub envelope: Envelope,
    pub vibrato: Vibrato,
    pulse_mask: u32,
    phase_mask: u32,
}

impl PulseVoice {
    pub fn new(config: VoiceConfig, sample_rate: u32) -> Self {
        Self {
            config,
            pitch: PitchTable::for_voice(&config, sample_rate),
            primary_phase: 0,
            secondary_phase: 0,
            phase_inc: 0,
            envelope: Envelope::default(),
            vibrato: Vibrato::default(),
            pulse_mask: config.pulse_mask(),
            phase_mask: config.phase_mask(),
        }
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn volume(&self) -> i32 {
        self.envelope.volume
    }

    pub fn stage(&self) -> AdsrStage {
        self.envelope.stage
    }

    /// Retrigger at full volume on a new pitch. Phases keep running.
    pub fn on_note(&mut self, semitone: u8, octave: u8) {
        self.envelope.note_on();
        self.phase_inc = self.pitch.increment(semitone, octave);
        self.vibrato.level = 0;
    }

    /// Start a keyboard note. Unlike a score note this restarts both
    /// accumulators, so every key press begins at the same phase. The chip
    /// has no velocity scaling; velocity 0 is a note-off as in MIDI.
    pub fn on_midi_note(&mut self, note: u8, velocity: u8) {
        if velocity == 0 {
            self.on_note_off();
            return;
        }
        self.envelope.note_on();
        self.phase_inc = self.pitch.midi(note);
        self.primary_phase = 0;
        self.secondary_phase = 0;
        self.vibrato.level = 0;
    }

    pub fn on_note_off(&mut self) {
        self.envelope.note_off();
    }

    pub fn on_sustain(&mut self) {}

    /// Per-tick update: vibrato always rotates, the envelope advances by
    /// stage, and the vibrato depth ramps only while decaying.
    pub fn tick_envelope(&mut self) {
        self.vibrato.rotate(self.config.vibrato_rate);
        let decaying = self.envelope.stage == AdsrStage::Decay;
        self.envelope.tick(&self.config);
        if decaying {
            self.vibrato.ramp(self.config.vibrato_depth, self.config.vibrato_envelope);
        }
    }

    #[inline]
    fn level(&self, phase: u32, volume: i32) -> i32 {
        if phase & self.pulse_mask == self.pulse_mask {
            volume
        } else {
            -volume
        }
    }

    /// Add this voice into `buffer`, advancing both accumulators once per
    /// sample.
    pub fn render(&mut self, buffer: &mut [i32]) {
        let volume = self.envelope.volume;
        let multiplier = self.config.carrier_multiplier;
        let detune = self.config.detune as u32;
        for out in buffer.iter_mut() {
            *out += self.level(self.primary_phase, volume) + self.level(self.secondary_phase, volume);

            // Two's-complement wrapping keeps negative vibrato exact modulo 2^phase_bits
            let step = self.phase_inc.wrapping_add(self.vibrato.offset() as u32);
            self.primary_phase = self.primary_phase.wrapping_add(step) & self.phase_mask;
            self.secondary_phase = self
                .secondary_phase
                .wrapping_add(step.wrapping_mul(multiplier).wrapping_add(detune))
                & self.phase_mask;
        }
    }
}

impl Voice for PulseVoice {
    fn note_on(&mut self, semitone: u8, octave: u8) {
        self.on_note(semitone, octave);
    }

    fn note_off(&mut self) {
        self.on_note_off();
    }

    fn sustain(&mut self) {
        self.on_sustain();
    }

    /// A pulse voice has no percussion input.
    fn trigger(&mut self) {
        self.on_sustain();
    }

    fn tick_envelope(&mut self) {
        PulseVoice::tick_envelope(self);
    }

    fn render(&mut self, buffer: &mut [i32]) {
        PulseVoice::render(self, buffer);
    }
}
