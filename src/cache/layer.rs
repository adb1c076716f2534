//! Typed, best-effort cache over a byte storage backend.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::resource::{decode_resource, Resource, ResourceKind};

use super::storage::{CacheStorage, NoopStorage};
use super::traits::Cached;

/// Last-known-good copy of each resource, keyed by resource kind.
///
/// Writes never fail from the caller's point of view: losing a cache write must
/// not hold up a refresh, so errors are logged and dropped. Reads report any
/// problem as a miss.
pub struct LocalCache {
  storage: Arc<dyn CacheStorage>,
}

impl LocalCache {
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
    }
  }

  /// A cache that stores nothing.
  pub fn disabled() -> Self {
    Self::new(NoopStorage)
  }

  /// Persist `value` as the latest copy of its kind. Best-effort.
  pub fn save<R: Resource>(&self, value: &R) {
    let key = R::KIND.key();

    let bytes = match serde_json::to_vec(value) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!(kind = key, error = %e, "cache save skipped: failed to encode");
        return;
      }
    };

    match self.storage.write(key, &bytes) {
      Ok(()) => debug!(kind = key, bytes = bytes.len(), "cache saved"),
      Err(e) => warn!(kind = key, error = %e, "cache save failed"),
    }
  }

  /// Read the latest copy of `R`, or `None` if there is no usable entry.
  pub fn load<R: Resource>(&self) -> Option<Cached<R>> {
    let key = R::KIND.key();

    let blob = match self.storage.read(key) {
      Ok(Some(blob)) => blob,
      Ok(None) => return None,
      Err(e) => {
        warn!(kind = key, error = %e, "cache load failed");
        return None;
      }
    };

    match decode_resource::<R>(&blob.bytes) {
      Ok(value) => Some(Cached::new(value, blob.cached_at)),
      Err(e) => {
        warn!(kind = key, error = %e, "cache entry unreadable, ignoring");
        None
      }
    }
  }

  /// Drop the entry for one kind.
  pub fn clear(&self, kind: ResourceKind) -> Result<()> {
    self.storage.remove(kind.key())
  }
}

impl Clone for LocalCache {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}
