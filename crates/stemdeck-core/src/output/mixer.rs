//! Stem mixer - sums every bound voice into one interleaved output block
//!
//! The mixer is the "platform" behind [`VoiceHandle`]: the engine commands
//! handles, the output callback calls [`Mixer::render`], and the two only
//! meet through each voice's atomics.
//!
//! Every playing voice advances by exactly the block's frame count, whether
//! it is audible or not, so muted stems stay in lockstep with the rest.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::handle::HandleFactory;
use crate::types::{DecodedBuffer, StemKind};

use super::voice::{Voice, VoiceHandle};

/// Number of output channels the mixer writes stem audio into
const STEM_OUTPUT_CHANNELS: usize = 2;

/// Sums voices into interleaved output blocks
pub struct Mixer {
    sample_rate: u32,
    voices: Vec<Voice>,
}

impl Mixer {
    /// Create an empty mixer running at `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            voices: Vec::new(),
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of live (unreleased) voices
    pub fn voice_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|voice| !voice.atomics.is_released())
            .count()
    }

    /// Bind a buffer to a new voice and return its control handle
    pub fn add_voice(&mut self, buffer: Arc<DecodedBuffer>) -> VoiceHandle {
        if buffer.sample_rate() != self.sample_rate {
            log::warn!(
                "Stem sample rate {} Hz differs from mixer rate {} Hz; it will play off-speed \
                 and is left out of drift correction",
                buffer.sample_rate(),
                self.sample_rate
            );
        }
        let (voice, handle) = Voice::pair(buffer, self.sample_rate);
        self.voices.push(voice);
        handle
    }

    /// Render one block of interleaved audio
    ///
    /// `out.len() / channels` frames are produced. Stems are written to the
    /// first two channels (mono stems duplicated); extra channels stay silent.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        self.voices.retain(|voice| !voice.atomics.is_released());

        if channels == 0 {
            return;
        }
        let frames = out.len() / channels;
        let stem_channels = channels.min(STEM_OUTPUT_CHANNELS);

        for voice in &self.voices {
            let atomics = &voice.atomics;
            if !atomics.is_playing() {
                continue;
            }

            let start = atomics.frame();
            let total = voice.buffer.sample_count() as u64;
            let count = (frames as u64).min(total.saturating_sub(start)) as usize;

            let gain = atomics.gain();
            if gain > 0.0 {
                let first = start as usize;
                for (i, frame) in out.chunks_mut(channels).take(count).enumerate() {
                    for (ch, slot) in frame.iter_mut().take(stem_channels).enumerate() {
                        *slot += voice.buffer.sample(ch, first + i) * gain;
                    }
                }
            }

            let end = start + count as u64;
            if atomics.advance(start, end) && end >= total {
                atomics.stop();
            }
        }
    }

    /// Advance all playing voices by `frames` without producing audio
    pub fn advance(&mut self, frames: usize) {
        let mut scratch = vec![0.0f32; frames];
        self.render(&mut scratch, 1);
    }
}

impl HandleFactory for Mixer {
    type Handle = VoiceHandle;

    fn bind(&mut self, stem: StemKind, buffer: Arc<DecodedBuffer>) -> VoiceHandle {
        log::debug!(
            "Binding {} ({} frames, {} ch) to mixer voice",
            stem,
            buffer.sample_count(),
            buffer.channel_count()
        );
        self.add_voice(buffer)
    }
}

/// Mixer shared between the control thread and an output callback
#[derive(Clone)]
pub struct SharedMixer {
    inner: Arc<Mutex<Mixer>>,
}

impl SharedMixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Mixer::new(sample_rate))),
        }
    }

    /// Lock the mixer, recovering from a poisoned lock
    pub fn lock(&self) -> MutexGuard<'_, Mixer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Render if the mixer is free, otherwise output silence
    ///
    /// For real-time callbacks, which must never wait on the control thread.
    pub fn try_render(&self, out: &mut [f32], channels: usize) {
        match self.inner.try_lock() {
            Ok(mut mixer) => mixer.render(out, channels),
            Err(_) => out.fill(0.0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().sample_rate()
    }
}

impl HandleFactory for SharedMixer {
    type Handle = VoiceHandle;

    fn bind(&mut self, stem: StemKind, buffer: Arc<DecodedBuffer>) -> VoiceHandle {
        self.lock().bind(stem, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::PlaybackHandle;

    fn buffer(frames: usize, value: f32) -> Arc<DecodedBuffer> {
        Arc::new(DecodedBuffer::mono(1000, vec![value; frames]))
    }

    #[test]
    fn test_paused_voices_are_silent_and_still() {
        let mut mixer = Mixer::new(1000);
        let handle = mixer.add_voice(buffer(100, 0.5));
        let mut out = vec![1.0; 20];
        mixer.render(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(handle.current_time(), 0.0);
    }

    #[test]
    fn test_voices_sum_with_gain() {
        let mut mixer = Mixer::new(1000);
        let mut a = mixer.add_voice(buffer(100, 0.5));
        let mut b = mixer.add_voice(buffer(100, 0.25));
        a.set_volume(1.0);
        b.set_volume(0.5);
        a.play();
        b.play();

        let mut out = vec![0.0; 8];
        mixer.render(&mut out, 2);
        for sample in out {
            assert!((sample - 0.625).abs() < 1e-6);
        }
    }

    #[test]
    fn test_muted_voice_advances_in_lockstep() {
        let mut mixer = Mixer::new(1000);
        let mut loud = mixer.add_voice(buffer(1000, 0.5));
        let mut quiet = mixer.add_voice(buffer(1000, 0.5));
        quiet.set_muted(true);
        loud.play();
        quiet.play();

        let mut out = vec![0.0; 200];
        mixer.render(&mut out, 2);

        assert!((loud.current_time() - 0.1).abs() < 1e-9);
        assert!((quiet.current_time() - 0.1).abs() < 1e-9);
        assert!((out[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_voice_stops_at_end() {
        let mut mixer = Mixer::new(1000);
        let mut handle = mixer.add_voice(buffer(10, 0.5));
        handle.play();
        let mut out = vec![0.0; 32];
        mixer.render(&mut out, 2);

        assert!(!handle.is_playing());
        assert!((handle.current_time() - 0.01).abs() < 1e-9);
        assert!((out[18] - 0.5).abs() < 1e-6);
        assert_eq!(out[20], 0.0);
    }

    #[test]
    fn test_extra_channels_stay_silent() {
        let mut mixer = Mixer::new(1000);
        let mut handle = mixer.add_voice(buffer(10, 0.5));
        handle.play();
        let mut out = vec![0.0; 8];
        mixer.render(&mut out, 4);
        assert_eq!(&out[..4], &[0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_released_voices_are_pruned() {
        let mut mixer = Mixer::new(1000);
        let handle = mixer.add_voice(buffer(10, 0.5));
        let _keep = mixer.add_voice(buffer(10, 0.5));
        assert_eq!(mixer.voice_count(), 2);
        drop(handle);
        mixer.advance(1);
        assert_eq!(mixer.voices.len(), 1);
    }

    #[test]
    fn test_shared_mixer_binds_through_lock() {
        let mut shared = SharedMixer::new(1000);
        let mut handle = shared.bind(StemKind::Drums, buffer(100, 0.5));
        handle.play();
        let mut out = vec![0.0; 20];
        shared.try_render(&mut out, 2);
        assert!((handle.current_time() - 0.01).abs() < 1e-9);
    }
}
