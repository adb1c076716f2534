//! Cache storage trait and its file, memory and no-op implementations.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Raw bytes of one cache entry.
#[derive(Debug, Clone)]
pub struct StoredBlob {
  pub bytes: Vec<u8>,
  /// When the blob was written
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Backends deal only in bytes keyed by resource key; encoding and decoding
/// happen in [`super::LocalCache`].
pub trait CacheStorage: Send + Sync {
  /// Read an entry. `Ok(None)` means nothing has been stored under `key`.
  fn read(&self, key: &str) -> Result<Option<StoredBlob>>;

  /// Replace the entry under `key`.
  fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

  /// Delete the entry under `key`, if any.
  fn remove(&self, key: &str) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn read(&self, _key: &str) -> Result<Option<StoredBlob>> {
    Ok(None) // Always miss
  }

  fn write(&self, _key: &str, _bytes: &[u8]) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }
}

/// In-process storage; contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, StoredBlob>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn read(&self, key: &str) -> Result<Option<StoredBlob>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(
      key.to_string(),
      StoredBlob {
        bytes: bytes.to_vec(),
        cached_at: Utc::now(),
      },
    );
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.remove(key);
    Ok(())
  }
}

/// One `<key>.json` file per entry inside a single namespace directory.
pub struct FileStorage {
  dir: PathBuf,
}

impl FileStorage {
  /// Open (and create if needed) the cache directory.
  pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir)
      .map_err(|e| eyre!("Failed to create cache directory {}: {}", dir.display(), e))?;

    Ok(Self { dir })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", key))
  }
}

impl CacheStorage for FileStorage {
  fn read(&self, key: &str) -> Result<Option<StoredBlob>> {
    let path = self.path_for(key);
    if !path.exists() {
      return Ok(None);
    }

    let bytes =
      std::fs::read(&path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
    let cached_at = std::fs::metadata(&path)
      .and_then(|m| m.modified())
      .map(DateTime::<Utc>::from)
      .unwrap_or_else(|_| Utc::now());

    Ok(Some(StoredBlob { bytes, cached_at }))
  }

  fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
    let path = self.path_for(key);

    // Each write gets its own temp file, renamed into place once complete,
    // so readers and concurrent writers only ever see whole entries
    let mut tmp = NamedTempFile::new_in(&self.dir)
      .map_err(|e| eyre!("Failed to create temp file in {}: {}", self.dir.display(), e))?;
    tmp
      .write_all(bytes)
      .map_err(|e| eyre!("Failed to write {}: {}", tmp.path().display(), e))?;
    tmp
      .persist(&path)
      .map_err(|e| eyre!("Failed to replace {}: {}", path.display(), e.error))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let path = self.path_for(key);
    match std::fs::remove_file(&path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!("Failed to remove {}: {}", path.display(), e)),
    }
  }
}

/// Storage whose every operation fails, for exercising error paths.
#[cfg(test)]
pub(crate) struct FailingStorage;

#[cfg(test)]
impl CacheStorage for FailingStorage {
  fn read(&self, key: &str) -> Result<Option<StoredBlob>> {
    Err(eyre!("storage unavailable reading {}", key))
  }

  fn write(&self, key: &str, _bytes: &[u8]) -> Result<()> {
    Err(eyre!("storage unavailable writing {}", key))
  }

  fn remove(&self, key: &str) -> Result<()> {
    Err(eyre!("storage unavailable removing {}", key))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  #[test]
  fn test_file_storage_write_read_remove() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(tmp.path().join("motivue-cache")).unwrap();

    assert!(storage.read("baseline").unwrap().is_none());

    storage.write("baseline", br#"{"user_id":"u1"}"#).unwrap();
    let blob = storage.read("baseline").unwrap().unwrap();
    assert_eq!(blob.bytes, br#"{"user_id":"u1"}"#);
    assert!(storage.dir().join("baseline.json").exists());
    // Only the entry itself is left behind
    assert_eq!(std::fs::read_dir(storage.dir()).unwrap().count(), 1);

    storage.remove("baseline").unwrap();
    assert!(storage.read("baseline").unwrap().is_none());
    // Removing twice is fine
    storage.remove("baseline").unwrap();
  }

  #[test]
  fn test_file_storage_overwrites() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(tmp.path()).unwrap();

    storage.write("readiness", b"{\"a\":1}").unwrap();
    storage.write("readiness", b"{\"a\":2}").unwrap();

    let blob = storage.read("readiness").unwrap().unwrap();
    assert_eq!(blob.bytes, b"{\"a\":2}");
  }

  #[test]
  fn test_file_storage_concurrent_writes_to_one_key() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::open(tmp.path()).unwrap());
    let bodies: Vec<Vec<u8>> = (0..8)
      .map(|i| format!(r#"{{"writer":{},"pad":"{}"}}"#, i, "x".repeat(64 * 1024)).into_bytes())
      .collect();

    let handles: Vec<_> = bodies
      .iter()
      .cloned()
      .map(|body| {
        let storage = Arc::clone(&storage);
        std::thread::spawn(move || {
          for _ in 0..10 {
            storage.write("baseline", &body).unwrap();
          }
        })
      })
      .collect();
    for handle in handles {
      handle.join().unwrap();
    }

    let blob = storage.read("baseline").unwrap().unwrap();
    assert!(bodies.contains(&blob.bytes), "entry is not one whole write");
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
  }

  #[test]
  fn test_memory_storage() {
    let storage = MemoryStorage::new();
    assert!(storage.read("k").unwrap().is_none());

    storage.write("k", b"{}").unwrap();
    assert_eq!(storage.read("k").unwrap().unwrap().bytes, b"{}");

    storage.remove("k").unwrap();
    assert!(storage.read("k").unwrap().is_none());
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    storage.write("k", b"{}").unwrap();
    assert!(storage.read("k").unwrap().is_none());
  }
}
