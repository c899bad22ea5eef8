//! Stem archive collaborator
//!
//! An archive maps an opaque stem-set id to the raw audio payload of each
//! stem. A missing stem is a normal answer ("not present"), never an error.
//!
//! Two layouts are supported: a folder per set ([`DirectoryArchive`]) and a
//! zip bundle per set ([`ZipArchive`]).

use std::collections::BTreeMap;
use std::future::Future;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use crate::types::StemKind;

use super::error::FetchError;

/// File extensions tried for each stem, in order
pub const STEM_EXTENSIONS: [&str; 2] = ["wav", "flac"];

/// Raw audio bytes per stem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StemPayloads {
    payloads: BTreeMap<StemKind, Vec<u8>>,
}

impl StemPayloads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stem: StemKind, bytes: Vec<u8>) {
        self.payloads.insert(stem, bytes);
    }

    pub fn get(&self, stem: StemKind) -> Option<&[u8]> {
        self.payloads.get(&stem).map(Vec::as_slice)
    }

    pub fn contains(&self, stem: StemKind) -> bool {
        self.payloads.contains_key(&stem)
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Stems in slot order with their bytes
    pub fn into_stems(self) -> impl Iterator<Item = (StemKind, Vec<u8>)> {
        self.payloads.into_iter()
    }
}

/// Source of stem payloads
pub trait StemArchive: Send + Sync {
    /// Retrieve every present stem of set `id`
    fn fetch(&self, id: &str) -> impl Future<Output = Result<StemPayloads, FetchError>> + Send;
}

/// Archive laid out on disk as `<root>/<id>/<stem>.<wav|flac>`
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of set `id`, rejecting ids that would escape the root
    fn set_dir(&self, id: &str) -> Result<PathBuf, FetchError> {
        validate_id(id)?;
        Ok(self.root.join(id))
    }
}

/// Ids name a single entry directly under the archive root
fn validate_id(id: &str) -> Result<(), FetchError> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(|c: char| c == '/' || c == '\\' || c == '\0');
    if valid {
        Ok(())
    } else {
        Err(FetchError::InvalidId(id.to_string()))
    }
}

impl StemArchive for DirectoryArchive {
    fn fetch(&self, id: &str) -> impl Future<Output = Result<StemPayloads, FetchError>> + Send {
        let dir = self.set_dir(id);
        let id = id.to_string();

        async move {
            let dir = dir?;
            if !tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
                return Err(FetchError::NotFound(id));
            }

            let mut payloads = StemPayloads::new();
            for stem in StemKind::ALL {
                if let Some(bytes) = read_stem(&dir, stem).await? {
                    log::debug!("Fetched {} ({} bytes) for set {}", stem, bytes.len(), id);
                    payloads.insert(stem, bytes);
                }
            }

            log::info!("Fetched {} stem(s) for set {}", payloads.len(), id);
            Ok(payloads)
        }
    }
}

/// First existing `<stem>.<ext>` in `dir`, or `None` if the stem is absent
async fn read_stem(dir: &Path, stem: StemKind) -> Result<Option<Vec<u8>>, FetchError> {
    for ext in STEM_EXTENSIONS {
        let path = dir.join(format!("{}.{}", stem.name(), ext));
        match tokio::fs::read(&path).await {
            Ok(bytes) => return Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => return Err(FetchError::Io { path, source }),
        }
    }
    Ok(None)
}

/// Archive of one zip bundle per set: `<root>/<id>.zip`
///
/// Entries are matched to stems by file name (`drums.wav`, `vocals.flac`),
/// wherever they sit inside the bundle. Entries naming no stem are ignored.
#[derive(Debug, Clone)]
pub struct ZipArchive {
    root: PathBuf,
}

impl ZipArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bundle file of set `id`
    pub fn bundle_path(&self, id: &str) -> Result<PathBuf, FetchError> {
        validate_id(id)?;
        Ok(self.root.join(format!("{}.zip", id)))
    }
}

impl StemArchive for ZipArchive {
    fn fetch(&self, id: &str) -> impl Future<Output = Result<StemPayloads, FetchError>> + Send {
        let path = self.bundle_path(id);
        let id = id.to_string();

        async move {
            let path = path?;
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(FetchError::NotFound(id));
                }
                Err(source) => return Err(FetchError::Io { path, source }),
            };

            // Inflating four full-length stems is CPU work
            let payloads = tokio::task::spawn_blocking(move || unpack_bundle(&path, bytes))
                .await
                .map_err(|e| FetchError::Worker(e.to_string()))??;

            log::info!("Unpacked {} stem(s) from bundle {}", payloads.len(), id);
            Ok(payloads)
        }
    }
}

fn unpack_bundle(path: &Path, bytes: Vec<u8>) -> Result<StemPayloads, FetchError> {
    let bundle_error = |source| FetchError::Bundle {
        path: path.to_path_buf(),
        source,
    };
    let mut bundle = zip::ZipArchive::new(Cursor::new(bytes)).map_err(bundle_error)?;

    // Extension rank of the entry kept per stem (lower wins)
    let mut kept: BTreeMap<StemKind, usize> = BTreeMap::new();
    let mut payloads = StemPayloads::new();
    for index in 0..bundle.len() {
        let mut entry = bundle.by_index(index).map_err(bundle_error)?;
        if entry.is_dir() {
            continue;
        }
        let Some((stem, rank)) = stem_entry(entry.name()) else {
            continue;
        };
        if kept.get(&stem).is_some_and(|&best| best <= rank) {
            continue;
        }

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data).map_err(|source| FetchError::Io {
            path: path.join(entry.name()),
            source,
        })?;
        log::debug!("Unpacked {} ({} bytes) from {:?}", stem, data.len(), path);
        kept.insert(stem, rank);
        payloads.insert(stem, data);
    }
    Ok(payloads)
}

/// Stem and extension rank of a bundle entry such as `set/drums.wav`
fn stem_entry(name: &str) -> Option<(StemKind, usize)> {
    let file = name.rsplit('/').next()?;
    let (base, ext) = file.rsplit_once('.')?;
    let rank = STEM_EXTENSIONS
        .iter()
        .position(|known| known.eq_ignore_ascii_case(ext))?;
    Some((StemKind::from_name(base)?, rank))
}
