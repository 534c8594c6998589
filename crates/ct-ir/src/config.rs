//! Static parameter records for voices and the master clock.

use thiserror::Error;

/// Full-scale envelope volume (12-bit).
pub const MAX_VOLUME: u16 = 4095;

/// Largest shift amount accepted for envelope and vibrato rates.
pub const MAX_SHIFT: u8 = 15;

/// Attenuation shift at which a 16-bit noise register is fully silent.
pub const NOISE_SILENT_SHIFT: u8 = 16;

/// Rejected parameter values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} shift {value} out of range (0-15)")]
    ShiftOutOfRange { name: &'static str, value: u8 },
    #[error("{name} {value} must be below 4095")]
    LevelOutOfRange { name: &'static str, value: u16 },
    #[error("phase width {0} bits out of range (2-30)")]
    PhaseBits(u8),
    #[error("noise seed must be non-zero")]
    ZeroSeed,
    #[error("noise attenuation range {min}..={max} invalid (max 16)")]
    NoiseShiftRange { min: u8, max: u8 },
    #[error("{0} must be non-zero")]
    Zero(&'static str),
}

/// Per-voice pulse channel configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceConfig {
    /// Bit 0 set: 25% duty (top two phase bits), clear: 50% (top bit).
    pub pulse_width: u8,
    /// Octaves added to every note.
    pub octave_transpose: i8,
    /// Added to the secondary phase every sample.
    pub detune: i32,
    /// Secondary oscillator runs at this multiple of the primary.
    pub carrier_multiplier: u32,
    /// Decay speed toward sustain (larger = slower).
    pub decay: u8,
    /// Sustain level, 0..4095.
    pub sustain: u16,
    /// Release speed toward zero (larger = slower).
    pub release: u8,
    /// Target vibrato depth reached during decay.
    pub vibrato_depth: u16,
    /// Vibrato oscillator rate shift (0 fastest).
    pub vibrato_rate: u8,
    /// Vibrato depth ramp speed; 0 disables the ramp.
    pub vibrato_envelope: u8,
    /// Width of the phase accumulators.
    pub phase_bits: u8,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            pulse_width: 0,
            octave_transpose: 0,
            detune: 0,
            carrier_multiplier: 1,
            decay: 2,
            sustain: 1024,
            release: 4,
            vibrato_depth: 0,
            vibrato_rate: 4,
            vibrato_envelope: 0,
            phase_bits: 18,
        }
    }
}

impl VoiceConfig {
    /// Check every field against its declared range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_shift("decay", self.decay)?;
        check_shift("release", self.release)?;
        check_shift("vibrato_rate", self.vibrato_rate)?;
        check_shift("vibrato_envelope", self.vibrato_envelope)?;
        check_level("sustain", self.sustain)?;
        check_level("vibrato_depth", self.vibrato_depth)?;
        if !(2..=30).contains(&self.phase_bits) {
            return Err(ConfigError::PhaseBits(self.phase_bits));
        }
        Ok(())
    }

    /// Mask selecting the phase bits that must all be set for the high half
    /// of the pulse.
    pub fn pulse_mask(&self) -> u32 {
        let top = self.phase_bits as u32 - 1;
        let mut mask = 1 << top;
        if self.pulse_width & 1 != 0 {
            mask |= 1 << (top - 1);
        }
        mask
    }

    /// Mask applied to both accumulators after every step.
    pub fn phase_mask(&self) -> u32 {
        (1u32 << self.phase_bits) - 1
    }
}

fn check_shift(name: &'static str, value: u8) -> Result<(), ConfigError> {
    if value > MAX_SHIFT {
        return Err(ConfigError::ShiftOutOfRange { name, value });
    }
    Ok(())
}

fn check_level(name: &'static str, value: u16) -> Result<(), ConfigError> {
    if value >= MAX_VOLUME {
        return Err(ConfigError::LevelOutOfRange { name, value });
    }
    Ok(())
}

/// Percussion (LFSR noise) channel configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoiseConfig {
    /// Feedback taps XORed in when the shifted-out bit is set.
    pub taps: u16,
    /// Initial register contents.
    pub seed: u16,
    /// Attenuation right after a trigger. This is the output scaling
    /// tunable: `register >> min_shift` is the loudest sample.
    pub min_shift: u8,
    /// Attenuation the burst decays to.
    pub max_shift: u8,
    /// Ticks per attenuation step.
    pub decay_period: u16,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            taps: 0x002D,
            seed: 0xACE1,
            min_shift: 4,
            max_shift: NOISE_SILENT_SHIFT,
            decay_period: 2,
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seed == 0 {
            return Err(ConfigError::ZeroSeed);
        }
        if self.min_shift > self.max_shift || self.max_shift > NOISE_SILENT_SHIFT {
            return Err(ConfigError::NoiseShiftRange {
                min: self.min_shift,
                max: self.max_shift,
            });
        }
        if self.decay_period == 0 {
            return Err(ConfigError::Zero("decay_period"));
        }
        Ok(())
    }
}

/// Master timing. The sample rate and tick length are integer divisions of
/// a master oscillator, so the achieved tempo is generally not the
/// requested one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockConfig {
    /// Master oscillator frequency in Hz.
    pub master_clock: u32,
    /// Master clocks per output sample.
    pub clocks_per_sample: u32,
    /// Output samples per sequencer tick.
    pub samples_per_tick: u32,
    /// Score steps per quarter note.
    pub steps_per_quarter: u32,
    /// Requested tempo in quarter notes per minute.
    pub bpm: f64,
}

impl Default for ClockConfig {
    /// VGA-timed chip: one sample per scanline, one tick per frame.
    fn default() -> Self {
        Self {
            master_clock: 25_175_000,
            clocks_per_sample: 800,
            samples_per_tick: 525,
            steps_per_quarter: 4,
            bpm: 120.0,
        }
    }
}

impl ClockConfig {
    /// A clock running at exactly `sample_rate`, handy for tests and offline
    /// rendering.
    pub fn from_sample_rate(sample_rate: u32, samples_per_tick: u32, bpm: f64) -> Self {
        Self {
            master_clock: sample_rate,
            clocks_per_sample: 1,
            samples_per_tick,
            steps_per_quarter: 4,
            bpm,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.master_clock == 0 {
            return Err(ConfigError::Zero("master_clock"));
        }
        if self.clocks_per_sample == 0 {
            return Err(ConfigError::Zero("clocks_per_sample"));
        }
        if self.samples_per_tick == 0 {
            return Err(ConfigError::Zero("samples_per_tick"));
        }
        if self.steps_per_quarter == 0 {
            return Err(ConfigError::Zero("steps_per_quarter"));
        }
        if !(self.bpm > 0.0) {
            return Err(ConfigError::Zero("bpm"));
        }
        Ok(())
    }
}
