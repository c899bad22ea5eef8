//! Common types for Stemdeck
//!
//! This module contains the fundamental audio types shared by the loader,
//! the playback engine and the waveform pipeline: stem identifiers and the
//! planar decoded sample buffer every Track owns.

/// Number of stems in a separated recording (Drums, Bass, Other, Vocals)
pub const NUM_STEMS: usize = 4;

/// Slot of the reference stem whose handle is the authoritative clock
pub const REFERENCE_TRACK: TrackId = 0;

/// Audio sample type (32-bit float, planar)
pub type Sample = f32;

/// Stable track identifier, equal to the stem slot (0..NUM_STEMS)
pub type TrackId = usize;

/// Stem identifiers, in archive order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum StemKind {
    Drums = 0,
    Bass = 1,
    Other = 2,
    Vocals = 3,
}

impl StemKind {
    /// Get all stems in slot order
    pub const ALL: [StemKind; NUM_STEMS] = [
        StemKind::Drums,
        StemKind::Bass,
        StemKind::Other,
        StemKind::Vocals,
    ];

    /// Convert from slot index (0-3) to StemKind
    pub fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(StemKind::Drums),
            1 => Some(StemKind::Bass),
            2 => Some(StemKind::Other),
            3 => Some(StemKind::Vocals),
            _ => None,
        }
    }

    /// Slot index of this stem, also its track id
    #[inline]
    pub fn index(self) -> TrackId {
        self as usize
    }

    /// Lowercase archive name ("drums", "bass", ...)
    pub fn name(&self) -> &'static str {
        match self {
            StemKind::Drums => "drums",
            StemKind::Bass => "bass",
            StemKind::Other => "other",
            StemKind::Vocals => "vocals",
        }
    }

    /// Display label ("Drums", "Bass", ...)
    pub fn label(&self) -> &'static str {
        match self {
            StemKind::Drums => "Drums",
            StemKind::Bass => "Bass",
            StemKind::Other => "Other",
            StemKind::Vocals => "Vocals",
        }
    }

    /// Parse an archive name, case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|stem| stem.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for StemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded sample data for one stem
///
/// Channels are stored planar (`channels[c][frame]`) so channel 0 can be
/// handed to the downsampler without deinterleaving. All channels have the
/// same length.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    sample_rate: u32,
    channels: Vec<Vec<Sample>>,
}

impl DecodedBuffer {
    /// Build a buffer from planar channel data
    ///
    /// Channels longer than the shortest one are truncated so every channel
    /// covers the same frame range.
    pub fn from_planar(sample_rate: u32, mut channels: Vec<Vec<Sample>>) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(frames);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    /// Build a buffer from interleaved samples
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, interleaved: &[Sample]) -> Self {
        if channel_count == 0 {
            return Self::from_planar(sample_rate, Vec::new());
        }
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::from_planar(sample_rate, channels)
    }

    /// Mono buffer from a single channel
    pub fn mono(sample_rate: u32, samples: Vec<Sample>) -> Self {
        Self::from_planar(sample_rate, vec![samples])
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    /// Duration in seconds (0 for a zero-rate buffer)
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count() as f64 / self.sample_rate as f64
    }

    /// Samples of one channel
    pub fn channel(&self, idx: usize) -> Option<&[Sample]> {
        self.channels.get(idx).map(Vec::as_slice)
    }

    /// Sample at `frame` for `channel`, reusing channel 0 for missing channels
    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> Sample {
        let data = self
            .channels
            .get(channel)
            .or_else(|| self.channels.first());
        data.and_then(|c| c.get(frame)).copied().unwrap_or(0.0)
    }
}
