//! Observable per-resource snapshot slots.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::api::Resource;
use crate::cache::LocalCache;

/// Where the value currently held in a slot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
  /// Fetched from the backend during this process's lifetime
  Live,
  /// Sample served in mock mode; never written to the cache
  Mock,
  /// Read back from the local cache at startup
  Cache,
  /// Built-in sample; nothing better was available
  Default,
}

/// An immutable view of one slot.
///
/// The value is shared, so cloning a snapshot never copies the resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
  pub value: Arc<T>,
  pub provenance: Provenance,
  /// Time of the last live update, or when the cached copy was written.
  /// `None` for built-in defaults.
  pub refreshed_at: Option<DateTime<Utc>>,
}

impl<T> Snapshot<T> {
  /// Staleness is strictly greater than `max_age`. A default that was never
  /// refreshed is always stale.
  pub fn is_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
    match self.refreshed_at {
      Some(at) => now - at > max_age,
      None => true,
    }
  }
}

/// One resource slot: the current snapshot plus a change feed.
pub struct Slot<R> {
  tx: watch::Sender<Snapshot<R>>,
  commit: Mutex<()>,
}

impl<R: Resource> Slot<R> {
  /// Seed from the cache, falling back to the built-in sample.
  pub fn seed(cache: &LocalCache) -> Self {
    let snapshot = match cache.load::<R>() {
      Some(cached) => Snapshot {
        value: Arc::new(cached.value),
        provenance: Provenance::Cache,
        refreshed_at: Some(cached.cached_at),
      },
      None => Snapshot {
        value: Arc::new(R::sample()),
        provenance: Provenance::Default,
        refreshed_at: None,
      },
    };

    let (tx, _rx) = watch::channel(snapshot);
    Self {
      tx,
      commit: Mutex::new(()),
    }
  }

  pub fn current(&self) -> Snapshot<R> {
    self.tx.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<Snapshot<R>> {
    self.tx.subscribe()
  }

  /// Held while a fetched value is swapped in and persisted.
  pub(crate) async fn lock_commit(&self) -> MutexGuard<'_, ()> {
    self.commit.lock().await
  }

  /// Swap in a freshly fetched value and wake subscribers.
  pub(crate) fn replace(&self, value: Arc<R>, provenance: Provenance, at: DateTime<Utc>) {
    self.tx.send_replace(Snapshot {
      value,
      provenance,
      refreshed_at: Some(at),
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::mock;
  use crate::api::types::Baseline;
  use crate::cache::MemoryStorage;
  use chrono::TimeZone;

  fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 18, 12, 0, 0).unwrap()
  }

  fn snapshot_at(at: Option<DateTime<Utc>>) -> Snapshot<Baseline> {
    Snapshot {
      value: Arc::new(mock::baseline()),
      provenance: Provenance::Cache,
      refreshed_at: at,
    }
  }

  #[test]
  fn test_staleness_threshold_is_strict() {
    let max_age = Duration::minutes(30);

    let exactly = snapshot_at(Some(fixed_now() - Duration::minutes(30)));
    assert!(!exactly.is_stale_at(fixed_now(), max_age));

    let older = snapshot_at(Some(fixed_now() - Duration::minutes(31)));
    assert!(older.is_stale_at(fixed_now(), max_age));

    let fresh = snapshot_at(Some(fixed_now() - Duration::minutes(1)));
    assert!(!fresh.is_stale_at(fixed_now(), max_age));
  }

  #[test]
  fn test_never_refreshed_is_stale() {
    assert!(snapshot_at(None).is_stale_at(fixed_now(), Duration::days(365)));
  }

  #[test]
  fn test_seed_prefers_cache() {
    let cache = LocalCache::new(MemoryStorage::new());
    let slot: Slot<Baseline> = Slot::seed(&cache);
    assert_eq!(slot.current().provenance, Provenance::Default);
    assert_eq!(*slot.current().value, mock::baseline());

    let cached = Baseline {
      user_id: Some("cached_user".to_string()),
      ..Default::default()
    };
    cache.save(&cached);

    let slot: Slot<Baseline> = Slot::seed(&cache);
    assert_eq!(slot.current().provenance, Provenance::Cache);
    assert_eq!(*slot.current().value, cached);
    assert!(slot.current().refreshed_at.is_some());
  }

  #[test]
  fn test_replace_notifies_subscribers() {
    let slot: Slot<Baseline> = Slot::seed(&LocalCache::disabled());
    let mut rx = slot.subscribe();
    assert!(!rx.has_changed().unwrap());

    slot.replace(Arc::new(Baseline::default()), Provenance::Live, fixed_now());

    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow_and_update().clone();
    assert_eq!(seen.provenance, Provenance::Live);
    assert_eq!(seen.refreshed_at, Some(fixed_now()));
    assert_eq!(*seen.value, Baseline::default());
  }
}
