//! Keeps one current snapshot of each resource kind in sync with the backend.
//!
//! Every slot starts from the local cache (or the built-in sample) and is only
//! ever replaced by a successful fetch. Failed fetches leave it untouched.

mod event;
mod slot;
mod store;

pub use event::{OutcomeSummary, RefreshOutcome, RefreshReport, SyncEvent};
pub use slot::{Provenance, Slot, Snapshot};
pub use store::{RequestPayloads, SlotStatus, SyncStore};
