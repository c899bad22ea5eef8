//! CPAL audio backend
//!
//! Opens the default output device at the mixer's sample rate and pulls
//! blocks from the mixer inside the device callback.
//!
//! ```text
//! ┌──────────────────┐   relaxed atomics   ┌─────────────────────┐
//! │  Engine (owner   │────────────────────►│   VoiceAtomics      │
//! │  of VoiceHandle) │                     │   (one per Track)   │
//! └──────────────────┘                     └──────────┬──────────┘
//!                                                     │ read/advance
//!                                          ┌──────────▼──────────┐
//!                                          │  CPAL Audio Thread  │
//!                                          │  (Mixer::render)    │
//!                                          └─────────────────────┘
//! ```

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, SampleRate, Stream, StreamConfig};

use super::error::{AudioError, AudioResult};
use super::mixer::SharedMixer;

/// Running CPAL output stream
///
/// The stream stops when this is dropped.
pub struct CpalOutput {
    _stream: Stream,
    sample_rate: u32,
    channels: u16,
}

impl CpalOutput {
    /// Open the default output device and start pulling from `mixer`
    pub fn start(mixer: SharedMixer) -> AudioResult<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevices)?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?} (only f32 output is supported)",
                supported.sample_format()
            )));
        }

        let sample_rate = mixer.sample_rate();
        let channels = supported.channels();
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: CpalBufferSize::Default,
        };

        let stream = build_output_stream(&device, &config, mixer)?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!(
            "Audio stream started on '{}' ({} Hz, {} ch)",
            device_name,
            sample_rate,
            channels
        );

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: SharedMixer,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                mixer.try_render(data, channels);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
