//! CPAL-based audio output backend.
//!
//! The output callback plays the role of the DMA engine: it streams one half
//! of a [`DoubleBuffer`] and, when that half drains, refills it through the
//! synth before moving on. Samples are converted from unsigned 16-bit to
//! centred f32 and copied to every device channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use m4_engine::{DoubleBuffer, BUFFER_LEN};

use crate::control::LiveSynth;
use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
    completions: Arc<AtomicU64>,
}

impl CpalOutput {
    /// Open the default output device at `sample_rate` with f32 samples.
    pub fn new(sample_rate: u32) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let supported = device
            .supported_output_configs()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?
            .find(|range| {
                range.sample_format() == SampleFormat::F32
                    && range.min_sample_rate().0 <= sample_rate
                    && range.max_sample_rate().0 >= sample_rate
            })
            .ok_or_else(|| {
                AudioError::UnsupportedConfig(format!("{} Hz f32 output", sample_rate))
            })?
            .with_sample_rate(SampleRate(sample_rate));

        let config: StreamConfig = supported.into();
        log::info!(
            "audio output: {} ({} ch @ {} Hz)",
            device.name().unwrap_or_else(|_| "unknown".into()),
            config.channels,
            config.sample_rate.0
        );

        Ok(Self {
            device,
            config,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
            completions: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Prime the double buffer and build the stream. The device starts but
    /// outputs silence until [`AudioOutput::start`].
    pub fn build_stream(&mut self, mut source: LiveSynth) -> Result<(), AudioError> {
        let running = self.running.clone();
        let completions = self.completions.clone();
        let channels = self.config.channels as usize;

        let mut buffers = DoubleBuffer::<BUFFER_LEN>::new();
        buffers.prime(&mut source);

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
                        let sample = buffers.pull(&mut source);
                        frame.fill((sample as f32 - 32768.0) / 32768.0);
                    }
                    completions.store(buffers.completions(), Ordering::Relaxed);
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }

    /// Periods refilled by the callback so far.
    pub fn completions(&self) -> u64 {
        self.completions.load(Ordering::Relaxed)
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream
                .play()
                .map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream
                .pause()
                .map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
