//! Stem decode collaborator
//!
//! Turns the raw bytes of one stem into a [`DecodedBuffer`]. Decoding is
//! blocking CPU work; the loader runs each stem on tokio's blocking pool.

use std::io::Cursor;

use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::types::DecodedBuffer;

use super::error::DecodeError;

/// Decodes raw stem payloads
pub trait StemDecoder: Send + Sync {
    fn decode(&self, bytes: Vec<u8>) -> Result<DecodedBuffer, DecodeError>;
}

/// Symphonia-backed decoder (WAV, FLAC and the other default formats)
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl StemDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>) -> Result<DecodedBuffer, DecodeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let probed = symphonia::default::get_probe()
            .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecodeError::Probe(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let mut channel_count = track.codec_params.channels.map_or(0, |c| c.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Codec(e.to_string()))?;

        let mut interleaved: Vec<f32> = Vec::new();
        let mut sample_buf: Option<(SampleBuffer<f32>, u64, SignalSpec)> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(DecodeError::Codec(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet: skip it, keep the rest of the stem
                    log::debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(DecodeError::Codec(e.to_string())),
            };

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            let reusable = matches!(&sample_buf, Some((_, cap, s)) if *cap >= capacity && *s == spec);
            if !reusable {
                sample_buf = Some((SampleBuffer::new(capacity, spec), capacity, spec));
            }
            if let Some((buf, _, _)) = sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buf.samples());
            }

            sample_rate = spec.rate;
            channel_count = spec.channels.count();
        }

        if sample_rate == 0 || channel_count == 0 || interleaved.is_empty() {
            return Err(DecodeError::Empty);
        }

        let buffer = DecodedBuffer::from_interleaved(sample_rate, channel_count, &interleaved);
        log::debug!(
            "Decoded {} frames, {} ch @ {} Hz ({:.2}s)",
            buffer.sample_count(),
            buffer.channel_count(),
            buffer.sample_rate(),
            buffer.duration()
        );
        Ok(buffer)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode interleaved 16-bit PCM as an in-memory WAV file
    pub(crate) fn wav_bytes(sample_rate: u32, channels: u16, frames: usize, value: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let amplitude = (value * i16::MAX as f32) as i16;
            for _ in 0..frames * channels as usize {
                writer.write_sample(amplitude).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_stereo_wav() {
        let bytes = wav_bytes(44100, 2, 44100, 0.5);
        let buffer = SymphoniaDecoder.decode(bytes).unwrap();

        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_count(), 44100);
        assert!((buffer.duration() - 1.0).abs() < 1e-9);
        assert!((buffer.sample(0, 100) - 0.5).abs() < 1e-3);
        assert!((buffer.sample(1, 100) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_mono_wav() {
        let buffer = SymphoniaDecoder.decode(wav_bytes(22050, 1, 5000, -0.25)).unwrap();
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.sample_count(), 5000);
        assert!((buffer.sample(0, 0) + 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_garbage_fails_probe() {
        let err = SymphoniaDecoder.decode(b"definitely not audio".to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::Probe(_)));
    }

    #[test]
    fn test_zero_frame_wav_is_empty() {
        let err = SymphoniaDecoder.decode(wav_bytes(44100, 2, 0, 0.0)).unwrap_err();
        assert_eq!(err, DecodeError::Empty);
    }
}
