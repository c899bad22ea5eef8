//! Min/max envelope downsampling
//!
//! Channel 0 is used as a mono proxy for the whole stem. Samples are split
//! into contiguous buckets of [`BUCKET_SIZE`] frames (the last bucket may be
//! shorter) and each bucket contributes one `{min, max}` pair.

use rayon::prelude::*;

use crate::types::{DecodedBuffer, Sample};

/// Frames per envelope bucket
pub const BUCKET_SIZE: usize = 1024;

/// Extent of one bucket of samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeBucket {
    pub min: Sample,
    pub max: Sample,
}

impl EnvelopeBucket {
    /// Peak-to-peak span of the bucket (never negative)
    #[inline]
    pub fn span(&self) -> Sample {
        (self.max - self.min).max(0.0)
    }
}

/// Downsampled min/max representation of a Track's waveform
///
/// Immutable once computed. `len() == ceil(sample_count / BUCKET_SIZE)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaveformEnvelope {
    buckets: Vec<EnvelopeBucket>,
}

impl WaveformEnvelope {
    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[inline]
    pub fn buckets(&self) -> &[EnvelopeBucket] {
        &self.buckets
    }

    /// Buckets in `start..end`, clamped to the envelope bounds
    pub fn slice(&self, start: usize, end: usize) -> &[EnvelopeBucket] {
        let end = end.min(self.buckets.len());
        let start = start.min(end);
        &self.buckets[start..end]
    }
}

/// Reduce a decoded buffer to its min/max envelope
///
/// Pure and deterministic: identical buffers yield identical envelopes.
/// Buckets are computed in parallel on the rayon pool, but `collect` keeps
/// them in bucket order.
pub fn downsample(buffer: &DecodedBuffer) -> WaveformEnvelope {
    let Some(samples) = buffer.channel(0) else {
        return WaveformEnvelope::default();
    };

    let buckets: Vec<EnvelopeBucket> = samples.par_chunks(BUCKET_SIZE).map(bucket_extent).collect();

    log::debug!(
        "Downsampled {} frames into {} envelope buckets",
        samples.len(),
        buckets.len()
    );

    WaveformEnvelope { buckets }
}

/// Min/max of one bucket
///
/// Starts from an inverted range (min = 1, max = -1) so that any sample in
/// [-1, 1] replaces both bounds.
fn bucket_extent(chunk: &[Sample]) -> EnvelopeBucket {
    let mut min: Sample = 1.0;
    let mut max: Sample = -1.0;
    for &sample in chunk {
        if sample < min {
            min = sample;
        }
        if sample > max {
            max = sample;
        }
    }
    EnvelopeBucket { min, max }
}
