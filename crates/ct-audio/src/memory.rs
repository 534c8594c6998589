//! In-memory output for offline use and tests.

use std::sync::{Arc, Mutex};

use crate::traits::{AudioError, AudioOutput};

/// Collects everything written into a shared buffer.
#[derive(Clone, Debug)]
pub struct MemoryOutput {
    sample_rate: u32,
    running: bool,
    samples: Arc<Mutex<Vec<i16>>>,
}

impl MemoryOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            running: false,
            samples: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the collected samples; stays valid after the output moves.
    pub fn buffer(&self) -> Arc<Mutex<Vec<i16>>> {
        self.samples.clone()
    }
}

impl AudioOutput for MemoryOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write(&mut self, samples: &[i16]) -> Result<(), AudioError> {
        if !self.running {
            return Err(AudioError::NotRunning);
        }
        let mut buf = self
            .samples
            .lock()
            .map_err(|e| AudioError::Playback(e.to_string()))?;
        buf.extend_from_slice(samples);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running = false;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}
