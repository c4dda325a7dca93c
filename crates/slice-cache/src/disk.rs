//! Persistent write-once store of raster blobs.
//!
//! One `.npy` file per key, named by the hex SHA-1 of the key's display form.
//! Files are written under a temporary name and renamed into place, so a
//! reader only ever sees complete blobs. A blob that fails to load is
//! deleted and reported as a miss.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::error::BlobError;
use crate::key::FetchKey;
use crate::npy;
use crate::raster::Raster;

const BLOB_EXTENSION: &str = "npy";
const TEMP_PREFIX: &str = ".partial-";

/// File name of the blob for `key`.
pub fn blob_file_name(key: &FetchKey) -> String {
    let digest = Sha1::digest(key.to_string().as_bytes());
    format!("{}.{}", hex::encode(digest), BLOB_EXTENSION)
}

/// Summary of the blobs currently on disk.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DiskScan {
    pub entries: usize,
    pub total_bytes: u64,
    /// Leftover temporary files from interrupted writes.
    pub temp_files: usize,
}

/// Outcome of a [`DiskCache::verify`] sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub valid: usize,
    pub corrupt: Vec<PathBuf>,
    pub temp_files: Vec<PathBuf>,
    /// Whether corrupt blobs and temp files were actually deleted.
    pub removed: bool,
}

/// On-disk cache tier. A disabled tier always misses and never writes.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: Option<PathBuf>,
}

impl DiskCache {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root: Some(root) })
    }

    pub fn disabled() -> Self {
        Self { root: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Where the blob for `key` lives, or `None` when the tier is disabled.
    pub fn path_for(&self, key: &FetchKey) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(blob_file_name(key)))
    }

    pub fn contains(&self, key: &FetchKey) -> bool {
        self.path_for(key).is_some_and(|path| path.is_file())
    }

    /// Load the blob for `key` as a read-only mapped raster.
    ///
    /// Unreadable or corrupt blobs are removed and reported as a miss.
    pub fn read(&self, key: &FetchKey) -> Option<Raster> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            return None;
        }

        match npy::load(&path) {
            Ok(raster) => {
                debug!(key = %key, path = %path.display(), "Disk cache hit");
                Some(raster)
            }
            Err(BlobError::Io(e)) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(
                    key = %key,
                    path = %path.display(),
                    error = %e,
                    "Removing corrupt cache blob"
                );
                if let Err(e) = fs::remove_file(&path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!(path = %path.display(), error = %e, "Failed to remove corrupt cache blob");
                    }
                }
                None
            }
        }
    }

    /// Persist `raster` for `key` unless a blob already exists.
    ///
    /// Returns whether a new blob was written.
    pub fn write(&self, key: &FetchKey, raster: &Raster) -> Result<bool, BlobError> {
        let (Some(root), Some(path)) = (self.root.as_ref(), self.path_for(key)) else {
            return Ok(false);
        };
        if path.exists() {
            return Ok(false);
        }

        let tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(root)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            npy::write_to(raster, &mut writer)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        if !persist_new(tmp, &path)? {
            debug!(key = %key, path = %path.display(), "Cache blob written concurrently, keeping existing");
            return Ok(false);
        }

        debug!(key = %key, path = %path.display(), bytes = raster.nbytes(), "Wrote cache blob");
        Ok(true)
    }

    /// Count blobs, their total size and leftover temp files.
    pub fn scan(&self) -> io::Result<DiskScan> {
        let mut scan = DiskScan::default();
        for (path, kind) in self.entries()? {
            match kind {
                EntryKind::Blob => {
                    scan.entries += 1;
                    scan.total_bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                }
                EntryKind::Temp => scan.temp_files += 1,
            }
        }
        Ok(scan)
    }

    /// Load every blob, collecting corrupt ones and temp files.
    ///
    /// Unless `dry_run`, corrupt blobs and temp files are deleted. Temp files
    /// belong to in-progress writes while a loader is running against the
    /// same directory.
    pub fn verify(&self, dry_run: bool) -> io::Result<VerifyReport> {
        let mut report = VerifyReport {
            removed: !dry_run,
            ..Default::default()
        };

        for (path, kind) in self.entries()? {
            match kind {
                EntryKind::Blob => {
                    report.checked += 1;
                    match npy::load(&path) {
                        Ok(_) => report.valid += 1,
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "Corrupt cache blob");
                            report.corrupt.push(path);
                        }
                    }
                }
                EntryKind::Temp => report.temp_files.push(path),
            }
        }

        if !dry_run {
            for path in report.corrupt.iter().chain(&report.temp_files) {
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(report)
    }

    fn entries(&self) -> io::Result<Vec<(PathBuf, EntryKind)>> {
        let Some(root) = self.root.as_ref() else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(TEMP_PREFIX) {
                entries.push((path, EntryKind::Temp));
            } else if path.extension().is_some_and(|ext| ext == BLOB_EXTENSION) {
                entries.push((path, EntryKind::Blob));
            }
        }
        entries.sort();
        Ok(entries)
    }
}

/// Rename `tmp` to `path` unless `path` already exists. The temp file is
/// removed when another writer got there first.
fn persist_new(tmp: tempfile::NamedTempFile, path: &Path) -> Result<bool, BlobError> {
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(BlobError::Io(e.error)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EntryKind {
    Blob,
    Temp,
}
