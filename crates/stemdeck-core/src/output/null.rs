//! Silent output that drives the mixer clock from a timed thread
//!
//! Used when no audio device is available (or the `cpal-backend` feature is
//! off): voices still advance in real time, so the engine, the position tick
//! and the waveforms behave exactly as with a real device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::error::{AudioError, AudioResult};
use super::mixer::SharedMixer;

/// Frames rendered per wake-up
const NULL_BLOCK_FRAMES: usize = 512;

/// Clock-driven output without a device
pub struct NullOutput {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    sample_rate: u32,
}

impl NullOutput {
    /// Spawn the clock thread
    pub fn start(mixer: SharedMixer) -> AudioResult<Self> {
        let sample_rate = mixer.sample_rate();
        if sample_rate == 0 {
            return Err(AudioError::ConfigError("mixer sample rate is 0 Hz".to_string()));
        }

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("null-output".to_string())
            .spawn(move || clock_thread(mixer, flag, sample_rate))
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        log::info!("Null output started at {} Hz (no audio device)", sample_rate);

        Ok(Self {
            running,
            handle: Some(handle),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for NullOutput {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        log::debug!("Null output stopped");
    }
}

/// Render blocks at the pace real hardware would pull them
fn clock_thread(mixer: SharedMixer, running: Arc<AtomicBool>, sample_rate: u32) {
    let block = Duration::from_secs_f64(NULL_BLOCK_FRAMES as f64 / sample_rate as f64);
    let mut scratch = vec![0.0f32; NULL_BLOCK_FRAMES * 2];
    let mut deadline = Instant::now();

    while running.load(Ordering::Relaxed) {
        mixer.lock().render(&mut scratch, 2);

        deadline += block;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            // Fell behind (suspended process etc.), don't try to catch up
            deadline = now;
        }
    }
}
