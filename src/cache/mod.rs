//! Local persistence of the last successfully fetched copy of each resource.
//!
//! This module provides:
//! - One JSON blob per resource kind, in the same wire schema as the backend
//! - Best-effort writes (failures are logged, never returned)
//! - Reads that treat missing or unreadable entries as "absent"

mod layer;
mod storage;
mod traits;

pub use layer::LocalCache;
pub use storage::{CacheStorage, FileStorage, MemoryStorage, NoopStorage, StoredBlob};
pub use traits::Cached;

#[cfg(test)]
pub(crate) use storage::FailingStorage;
