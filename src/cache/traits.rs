//! Core types for the caching system.

use chrono::{DateTime, Utc};

/// A resource read back from the cache, with the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
  /// The decoded resource
  pub value: T,
  /// When the entry was last written
  pub cached_at: DateTime<Utc>,
}

impl<T> Cached<T> {
  pub fn new(value: T, cached_at: DateTime<Utc>) -> Self {
    Self { value, cached_at }
  }
}
