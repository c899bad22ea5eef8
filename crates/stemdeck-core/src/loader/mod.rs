//! Stem loading: fetch, decode and downsample a stem set
//!
//! A load runs in three stages:
//!
//! 1. **Fetch** every stem's bytes from a [`StemArchive`] (async I/O)
//! 2. **Decode** each stem on tokio's blocking pool, all stems in parallel
//! 3. **Downsample** each decoded buffer into its waveform envelope, in the
//!    same blocking task as the decode
//!
//! A stem that fails to decode is dropped with a warning; the rest of the set
//! still loads. Whether the result is playable (reference present) is the
//! session's decision, not the loader's.
//!
//! Every load carries a [`LoadTicket`]. Starting a new load invalidates all
//! earlier tickets, and a load whose ticket went stale stops at the next
//! stage boundary with [`LoadError::Superseded`].

mod archive;
mod decode;
mod error;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub use archive::{DirectoryArchive, StemArchive, StemPayloads, ZipArchive, STEM_EXTENSIONS};
pub use decode::{StemDecoder, SymphoniaDecoder};
pub use error::{DecodeError, FetchError, LoadError};

use crate::types::{DecodedBuffer, StemKind, REFERENCE_TRACK};
use crate::waveform::{downsample, WaveformEnvelope};

/// Identifies one load request
///
/// Only the most recently issued ticket of a loader is current.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl LoadTicket {
    /// Whether no newer load (or cancel) has happened since this ticket
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn check(&self) -> Result<(), LoadError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(LoadError::Superseded)
        }
    }
}

/// One successfully decoded stem, ready to be bound to a handle
#[derive(Debug, Clone)]
pub struct PreparedStem {
    pub stem: StemKind,
    pub buffer: Arc<DecodedBuffer>,
    pub envelope: Arc<WaveformEnvelope>,
}

/// Everything a load produced
#[derive(Debug, Default)]
pub struct PreparedStems {
    /// Decoded stems in slot order
    pub stems: Vec<PreparedStem>,
    /// Stems that were fetched but could not be decoded
    pub dropped: Vec<(StemKind, DecodeError)>,
}

impl PreparedStems {
    /// Whether the reference stem decoded
    pub fn has_reference(&self) -> bool {
        self.stems.iter().any(|s| s.stem.index() == REFERENCE_TRACK)
    }

    pub fn get(&self, stem: StemKind) -> Option<&PreparedStem> {
        self.stems.iter().find(|s| s.stem == stem)
    }
}

/// Fetches and prepares stem sets
pub struct StemLoader<A, D> {
    archive: Arc<A>,
    decoder: Arc<D>,
    generation: Arc<AtomicU64>,
}

impl<A, D> StemLoader<A, D>
where
    A: StemArchive,
    D: StemDecoder + 'static,
{
    pub fn new(archive: A, decoder: D) -> Self {
        Self {
            archive: Arc::new(archive),
            decoder: Arc::new(decoder),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }

    /// Issue a ticket for a new load, invalidating every earlier one
    pub fn begin(&self) -> LoadTicket {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        LoadTicket {
            generation,
            current: Arc::clone(&self.generation),
        }
    }

    /// Invalidate every outstanding ticket without starting a load
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Fetch, decode and downsample stem set `id`
    pub async fn load(&self, ticket: &LoadTicket, id: &str) -> Result<PreparedStems, LoadError> {
        ticket.check()?;
        let start = Instant::now();

        let payloads = self.archive.fetch(id).await?;
        ticket.check()?;

        // Fan out: one blocking task per stem
        let tasks: Vec<_> = payloads
            .into_stems()
            .map(|(stem, bytes)| {
                let decoder = Arc::clone(&self.decoder);
                let task = tokio::task::spawn_blocking(move || prepare_stem(decoder.as_ref(), bytes));
                (stem, task)
            })
            .collect();

        // Fan in: wait for every stem before deciding anything
        let mut prepared = PreparedStems::default();
        for (stem, task) in tasks {
            let result = task
                .await
                .unwrap_or_else(|e| Err(DecodeError::Worker(e.to_string())));
            match result {
                Ok((buffer, envelope)) => prepared.stems.push(PreparedStem {
                    stem,
                    buffer: Arc::new(buffer),
                    envelope: Arc::new(envelope),
                }),
                Err(e) => {
                    log::warn!("Dropping {} stem of '{}': {}", stem, id, e);
                    prepared.dropped.push((stem, e));
                }
            }
        }
        ticket.check()?;

        prepared.stems.sort_by_key(|s| s.stem);
        log::info!(
            "Prepared '{}' in {:.0?}: {} stem(s) ready, {} dropped",
            id,
            start.elapsed(),
            prepared.stems.len(),
            prepared.dropped.len()
        );
        Ok(prepared)
    }
}

fn prepare_stem<D: StemDecoder + ?Sized>(
    decoder: &D,
    bytes: Vec<u8>,
) -> Result<(DecodedBuffer, WaveformEnvelope), DecodeError> {
    let buffer = decoder.decode(bytes)?;
    if buffer.is_empty() {
        return Err(DecodeError::Empty);
    }
    let envelope = downsample(&buffer);
    Ok((buffer, envelope))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;

    use super::*;
    use crate::waveform::BUCKET_SIZE;

    /// Archive serving fixed payloads from memory
    #[derive(Default)]
    struct MemoryArchive {
        sets: HashMap<String, Vec<(StemKind, Vec<u8>)>>,
    }

    impl MemoryArchive {
        fn with_set(mut self, id: &str, stems: &[(StemKind, &[u8])]) -> Self {
            let stems = stems.iter().map(|(s, b)| (*s, b.to_vec())).collect();
            self.sets.insert(id.to_string(), stems);
            self
        }
    }

    impl StemArchive for MemoryArchive {
        fn fetch(&self, id: &str) -> impl Future<Output = Result<StemPayloads, FetchError>> + Send {
            let result = match self.sets.get(id) {
                Some(stems) => {
                    let mut payloads = StemPayloads::new();
                    for (stem, bytes) in stems {
                        payloads.insert(*stem, bytes.clone());
                    }
                    Ok(payloads)
                }
                None => Err(FetchError::NotFound(id.to_string())),
            };
            async move { result }
        }
    }

    /// Decoder that treats the payload's first byte as a frame count in
    /// kilo-frames; a payload starting with `b'x'` fails to decode
    struct FakeDecoder;

    impl StemDecoder for FakeDecoder {
        fn decode(&self, bytes: Vec<u8>) -> Result<DecodedBuffer, DecodeError> {
            match bytes.first() {
                Some(b'x') | None => Err(DecodeError::Probe("fake".into())),
                Some(&n) => Ok(DecodedBuffer::mono(1000, vec![0.5; n as usize * 1000])),
            }
        }
    }

    fn full_set() -> MemoryArchive {
        MemoryArchive::default().with_set(
            "song",
            &[
                (StemKind::Drums, &[4]),
                (StemKind::Bass, &[4]),
                (StemKind::Other, &[4]),
                (StemKind::Vocals, &[4]),
            ],
        )
    }

    #[tokio::test]
    async fn test_load_prepares_every_stem() {
        let loader = StemLoader::new(full_set(), FakeDecoder);
        let ticket = loader.begin();
        let prepared = loader.load(&ticket, "song").await.unwrap();

        assert_eq!(prepared.stems.len(), 4);
        assert!(prepared.dropped.is_empty());
        assert!(prepared.has_reference());
        let stems: Vec<_> = prepared.stems.iter().map(|s| s.stem).collect();
        assert_eq!(stems, StemKind::ALL.to_vec());
        for stem in &prepared.stems {
            assert_eq!(stem.buffer.sample_count(), 4000);
            assert_eq!(stem.envelope.len(), 4000usize.div_ceil(BUCKET_SIZE));
        }
    }

    #[tokio::test]
    async fn test_undecodable_stem_is_dropped() {
        let archive = MemoryArchive::default().with_set(
            "song",
            &[
                (StemKind::Drums, &[2]),
                (StemKind::Bass, &[2]),
                (StemKind::Other, &[2]),
                (StemKind::Vocals, b"x"),
            ],
        );
        let loader = StemLoader::new(archive, FakeDecoder);
        let ticket = loader.begin();
        let prepared = loader.load(&ticket, "song").await.unwrap();

        assert_eq!(prepared.stems.len(), 3);
        assert!(prepared.get(StemKind::Vocals).is_none());
        assert_eq!(prepared.dropped.len(), 1);
        assert_eq!(prepared.dropped[0].0, StemKind::Vocals);
        assert!(prepared.has_reference());
    }

    #[tokio::test]
    async fn test_missing_reference_is_reported_not_fatal() {
        let archive = MemoryArchive::default()
            .with_set("song", &[(StemKind::Drums, b"x"), (StemKind::Bass, &[1])]);
        let loader = StemLoader::new(archive, FakeDecoder);
        let ticket = loader.begin();
        let prepared = loader.load(&ticket, "song").await.unwrap();

        assert!(!prepared.has_reference());
        assert_eq!(prepared.stems.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_set_fails_fetch() {
        let loader = StemLoader::new(full_set(), FakeDecoder);
        let ticket = loader.begin();
        let err = loader.load(&ticket, "nope").await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch(FetchError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_newer_ticket_supersedes_older() {
        let loader = StemLoader::new(full_set(), FakeDecoder);
        let first = loader.begin();
        let second = loader.begin();

        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(matches!(
            loader.load(&first, "song").await,
            Err(LoadError::Superseded)
        ));
        assert!(loader.load(&second, "song").await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_invalidates_ticket() {
        let loader = StemLoader::new(full_set(), FakeDecoder);
        let ticket = loader.begin();
        loader.cancel();
        assert!(matches!(
            loader.load(&ticket, "song").await,
            Err(LoadError::Superseded)
        ));
    }

    #[tokio::test]
    async fn test_loads_real_wav_directory() {
        use super::decode::tests::wav_bytes;

        let dir = tempfile::tempdir().unwrap();
        let set = dir.path().join("demo");
        std::fs::create_dir_all(&set).unwrap();
        for stem in StemKind::ALL {
            std::fs::write(set.join(format!("{}.wav", stem.name())), wav_bytes(8000, 2, 8000, 0.25))
                .unwrap();
        }

        let loader = StemLoader::new(DirectoryArchive::new(dir.path()), SymphoniaDecoder);
        let ticket = loader.begin();
        let prepared = loader.load(&ticket, "demo").await.unwrap();

        assert_eq!(prepared.stems.len(), 4);
        let drums = prepared.get(StemKind::Drums).unwrap();
        assert!((drums.buffer.duration() - 1.0).abs() < 1e-9);
        assert_eq!(drums.envelope.len(), 8000usize.div_ceil(BUCKET_SIZE));
    }

    #[tokio::test]
    async fn test_loads_zip_bundle_with_missing_entry() {
        use std::io::Write;

        use super::decode::tests::wav_bytes;

        let dir = tempfile::tempdir().unwrap();
        let file = std::fs::File::create(dir.path().join("demo.zip")).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for stem in [StemKind::Drums, StemKind::Bass, StemKind::Vocals] {
            writer
                .start_file(format!("{}.wav", stem.name()), zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&wav_bytes(8000, 2, 4000, 0.25)).unwrap();
        }
        writer.finish().unwrap();

        let loader = StemLoader::new(ZipArchive::new(dir.path()), SymphoniaDecoder);
        let ticket = loader.begin();
        let prepared = loader.load(&ticket, "demo").await.unwrap();

        assert_eq!(prepared.stems.len(), 3);
        assert!(prepared.dropped.is_empty());
        assert!(prepared.get(StemKind::Other).is_none());
        let drums = prepared.get(StemKind::Drums).unwrap();
        assert!((drums.buffer.duration() - 0.5).abs() < 1e-9);
    }
}
