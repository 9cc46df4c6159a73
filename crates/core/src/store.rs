// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value storage for the sync queue.
//!
//! The queue is persisted as one value under a fixed key. A completed
//! [`DurableStore::set`] must survive process restart, and a failed one must
//! leave the previous value intact.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Lock filename guaranteeing a single owning process per store directory.
const LOCK_NAME: &str = "store.lock";

/// Key-value persistence surviving process restarts.
pub trait DurableStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replaces the value stored under `key`.
    ///
    /// Either the new value is durably written or the previous one is kept.
    /// Failures are reported as [`Error::Persistence`].
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// File-backed store: one `<key>.json` file per key inside a directory.
///
/// Writes go to `<key>.json.tmp`, are fsynced, and then renamed over the
/// previous file, so a crash mid-write never leaves a torn value behind.
pub struct FileStore {
    dir: PathBuf,
    /// Held for the lifetime of the store; released on drop.
    _lock: File,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// Fails with [`Error::StoreLocked`] if another process holds the store.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_NAME))?;
        lock.try_lock_exclusive()
            .map_err(|_| Error::StoreLocked(dir.display().to_string()))?;

        Ok(FileStore { dir, _lock: lock })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn write_atomic(&self, path: &Path, value: &[u8]) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(value)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        // Persist the rename itself.
        #[cfg(unix)]
        File::open(&self.dir)?.sync_all()?;

        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        self.write_atomic(&path, value)
            .map_err(|e| Error::Persistence(format!("{}: {e}", path.display())))
    }
}

/// In-memory store. Clones share the same contents, which lets tests
/// simulate a process restart by reopening a queue over a clone.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set` fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the raw bytes stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence(format!("write to '{key}' rejected")));
        }
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
