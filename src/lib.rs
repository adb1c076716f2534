//! Client-side sync layer for Motivue data.
//!
//! [`sync::SyncStore`] holds the current readiness, training consumption,
//! weekly report, baseline and physiological age, refreshing them from the
//! backend (or the built-in samples) and falling back to a local cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod json;
pub mod logging;
pub mod sync;
