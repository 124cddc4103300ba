use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::config::CACHE_PREFIX;
use crate::error::{McError, McResult};
use crate::util::fingerprint;

/// One file per fingerprint in a shared directory. Entries are never evicted.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

/// An opened cache entry. Non-empty on open means a previous run recorded it.
#[derive(Debug)]
pub struct CacheEntry {
    path: PathBuf,
    file: File,
    hit: bool,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn entry_path(&self, review_url: &str, comment_id: &str) -> PathBuf {
        self.dir.join(format!(
            "{CACHE_PREFIX}{}",
            fingerprint(&[review_url, comment_id])
        ))
    }

    /// Opens (creating if absent) the entry for a reference.
    pub fn open(&self, review_url: &str, comment_id: &str) -> McResult<CacheEntry> {
        let path = self.entry_path(review_url, comment_id);
        let file = open_entry_file(&path)
            .map_err(|e| McError::io(format!("can't open cache file {}", path.display()), e))?;
        let len = file
            .metadata()
            .map_err(|e| McError::io(format!("can't stat cache file {}", path.display()), e))?
            .len();
        Ok(CacheEntry {
            path,
            file,
            hit: len > 0,
        })
    }
}

#[cfg(unix)]
fn open_entry_file(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .mode(0o664)
        .open(path)
}

#[cfg(not(unix))]
fn open_entry_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
}

impl CacheEntry {
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole recorded output.
    pub fn read_all(&mut self) -> McResult<Vec<u8>> {
        let mut data = Vec::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut data))
            .map_err(|e| McError::io(format!("can't read cache file {}", self.path.display()), e))?;
        Ok(data)
    }

    /// Claims the entry for recording. Returns the file to tee into, or
    /// `None` when another invocation is already recording it. The lock
    /// lasts until the entry is dropped.
    pub fn claim_for_recording(&self) -> Option<&File> {
        match self.file.try_lock_exclusive() {
            Ok(()) => Some(&self.file),
            Err(e) => {
                log::warn!(
                    "cache file {} is being recorded by another run ({e}); output will not be cached",
                    self.path.display()
                );
                None
            }
        }
    }
}
