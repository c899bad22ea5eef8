//! Waveform envelopes for stem display
//!
//! Each Track's decoded buffer is reduced once, at load time, to a compact
//! min/max envelope. Renderers only ever slice this envelope, so redrawing on
//! every position tick costs O(visible window) rather than O(track length).

mod envelope;

pub use envelope::{downsample, EnvelopeBucket, WaveformEnvelope, BUCKET_SIZE};
