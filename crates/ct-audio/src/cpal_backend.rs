//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::traits::{AudioError, AudioOutput};

/// 16.16 fixed-point unit for the sample-rate converter.
const RATE_ONE: u64 = 1 << 16;

/// How long `write` waits for the callback to free any room.
const STALL_TIMEOUT: Duration = Duration::from_millis(500);

/// Slack on top of the buffer's play time before `flush` gives up.
const FLUSH_MARGIN: Duration = Duration::from_millis(250);

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Push all of `samples`, sleeping while the buffer is full.
///
/// Fails with [`AudioError::NotRunning`] once `running` clears, and with
/// [`AudioError::Playback`] if no sample could be queued for
/// `stall_timeout`, i.e. the consumer stopped draining.
fn push_blocking<P>(
    producer: &mut P,
    samples: &[i16],
    running: &AtomicBool,
    stall_timeout: Duration,
) -> Result<(), AudioError>
where
    P: Producer<Item = i16>,
{
    let mut rest = samples;
    let mut last_progress = Instant::now();
    while !rest.is_empty() {
        if !running.load(Ordering::Relaxed) {
            return Err(AudioError::NotRunning);
        }
        let pushed = producer.push_slice(rest);
        if pushed > 0 {
            rest = &rest[pushed..];
            last_progress = Instant::now();
            continue;
        }
        if last_progress.elapsed() >= stall_timeout {
            return Err(AudioError::Playback(format!(
                "output stalled with {} samples unqueued",
                rest.len()
            )));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}

/// Wait until the buffer is empty or `timeout` passes. Returns whether it
/// drained.
fn wait_drained<O>(buffer: &O, timeout: Duration) -> bool
where
    O: Observer + ?Sized,
{
    let deadline = Instant::now() + timeout;
    while buffer.occupied_len() > 0 {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    true
}

/// CPAL-based audio output.
///
/// Mono samples go through a lock-free ring buffer to the device callback,
/// which copies each one to every device channel. When the device cannot
/// run at the source rate the callback holds or skips samples to match.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    source_rate: u32,
    stream: Option<Stream>,
    producer: HeapProd<i16>,
    running: Arc<AtomicBool>,
    flush_timeout: Duration,
}

impl CpalOutput {
    /// Open the default device, preferring a config at `source_rate`.
    pub fn new(source_rate: u32) -> Result<(Self, HeapCons<i16>), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let exact = device
            .supported_output_configs()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?
            .filter(|range| range.sample_format() == SampleFormat::F32)
            .find(|range| {
                range.min_sample_rate().0 <= source_rate && source_rate <= range.max_sample_rate().0
            })
            .map(|range| range.with_sample_rate(SampleRate(source_rate)));

        let config: StreamConfig = match exact {
            Some(supported) => supported.into(),
            None => {
                let fallback = device
                    .default_output_config()
                    .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
                warn!(
                    source_rate,
                    device_rate = fallback.sample_rate().0,
                    "device does not support source rate, resampling"
                );
                fallback.into()
            }
        };
        debug!(
            channels = config.channels,
            rate = config.sample_rate.0,
            "opened output device"
        );

        // About 100ms of source audio
        let buffer_size = (source_rate as usize / 10).max(1024);
        let rb = HeapRb::<i16>::new(buffer_size);
        let (producer, consumer) = rb.split();
        let flush_timeout =
            Duration::from_secs_f64(buffer_size as f64 / source_rate.max(1) as f64) + FLUSH_MARGIN;

        let output = Self {
            device,
            config,
            source_rate,
            stream: None,
            producer,
            running: Arc::new(AtomicBool::new(false)),
            flush_timeout,
        };

        Ok((output, consumer))
    }

    /// Build and start the audio stream.
    pub fn build_stream(&mut self, mut consumer: HeapCons<i16>) -> Result<(), AudioError> {
        let running = self.running.clone();
        let channels = self.config.channels as usize;
        let step = (self.source_rate as u64 * RATE_ONE) / self.config.sample_rate.0 as u64;
        // Position within the current source sample; starts due
        let mut frac = RATE_ONE;
        let mut current = 0.0f32;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    for frame in data.chunks_mut(channels) {
                        while frac >= RATE_ONE {
                            frac -= RATE_ONE;
                            current = consumer.try_pop().map_or(0.0, |s| s as f32 / 32768.0);
                        }
                        frac += step;
                        frame.fill(current);
                    }
                },
                |err| error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.source_rate
    }

    fn write(&mut self, samples: &[i16]) -> Result<(), AudioError> {
        push_blocking(&mut self.producer, samples, &self.running, STALL_TIMEOUT)
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AudioError> {
        if self.stream.is_none() || !self.running.load(Ordering::Relaxed) {
            return Ok(());
        }
        if wait_drained(&self.producer, self.flush_timeout) {
            return Ok(());
        }
        let left = self.producer.occupied_len();
        warn!(left, timeout = ?self.flush_timeout, "output did not drain");
        Err(AudioError::Playback(format!("{left} samples left unplayed")))
    }
}
