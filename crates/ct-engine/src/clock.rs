//! Master clock derivation.
//!
//! Turns a [`ClockConfig`] into the integer periods the sequencer runs on:
//! output samples per tick and ticks per score step. The tick count per
//! step is rounded, so the achieved tempo drifts from the requested one;
//! [`Clock::tempo_deviation`] reports by how much.

use ct_ir::{ClockConfig, ConfigError};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clock {
    /// Output sample rate in Hz (rounded from master clock).
    pub sample_rate: u32,
    /// Samples between sequencer ticks.
    pub samples_per_tick: u32,
    /// Ticks between score step advances.
    pub ticks_per_beat: u32,
    /// Tempo asked for, in quarter notes per minute.
    pub requested_bpm: f64,
    /// Tempo actually produced by the integer periods.
    pub actual_bpm: f64,
}

impl Clock {
    pub fn new(config: &ClockConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let master = config.master_clock as f64;
        let cps = config.clocks_per_sample as f64;
        let spt = config.samples_per_tick as f64;
        let spq = config.steps_per_quarter as f64;

        // Ticks per score step at the requested tempo
        let ticks = libm::round(master * 60.0 / (cps * spt * spq * config.bpm));
        let ticks_per_beat = (ticks as u32).max(1);
        let actual_bpm = master * 60.0 / (cps * spt * spq * ticks_per_beat as f64);

        Ok(Self {
            sample_rate: libm::round(master / cps) as u32,
            samples_per_tick: config.samples_per_tick,
            ticks_per_beat,
            requested_bpm: config.bpm,
            actual_bpm,
        })
    }

    /// Achieved minus requested tempo, in BPM.
    pub fn tempo_deviation(&self) -> f64 {
        self.actual_bpm - self.requested_bpm
    }

    /// Deviation relative to the requested tempo (0.01 = 1% fast).
    pub fn tempo_error(&self) -> f64 {
        self.tempo_deviation() / self.requested_bpm
    }

    /// Output samples per score step.
    pub fn samples_per_beat(&self) -> u64 {
        self.samples_per_tick as u64 * self.ticks_per_beat as u64
    }

    /// Ticks per second at the output sample rate.
    pub fn tick_rate(&self) -> f64 {
        self.sample_rate as f64 / self.samples_per_tick as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vga_timing_defaults() {
        let clock = Clock::new(&ClockConfig::default()).unwrap();
        // 25.175 MHz / 800 = 31468.75 -> 31469
        assert_eq!(clock.sample_rate, 31_469);
        assert_eq!(clock.samples_per_tick, 525);
        // 25175000 * 60 / (800 * 525 * 4 * 120) = 7.49 -> 7
        assert_eq!(clock.ticks_per_beat, 7);
        assert!(clock.actual_bpm > 128.0 && clock.actual_bpm < 128.6);
    }

    #[test]
    fn deviation_is_reported_not_absorbed() {
        let clock = Clock::new(&ClockConfig::default()).unwrap();
        assert!(clock.tempo_deviation() > 8.0);
        assert!((clock.tempo_error() - clock.tempo_deviation() / 120.0).abs() < 1e-12);
    }

    #[test]
    fn exact_tempo_has_zero_deviation() {
        // 48000 * 60 / (500 * 4 * 120) = 12 ticks exactly
        let clock = Clock::new(&ClockConfig::from_sample_rate(48_000, 500, 120.0)).unwrap();
        assert_eq!(clock.ticks_per_beat, 12);
        assert_eq!(clock.sample_rate, 48_000);
        assert!(clock.tempo_deviation().abs() < 1e-9);
        assert_eq!(clock.samples_per_beat(), 6000);
    }

    #[test]
    fn very_fast_tempo_keeps_one_tick() {
        let clock = Clock::new(&ClockConfig::from_sample_rate(48_000, 4800, 10_000.0)).unwrap();
        assert_eq!(clock.ticks_per_beat, 1);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = ClockConfig { clocks_per_sample: 0, ..Default::default() };
        assert!(Clock::new(&config).is_err());
    }
}
