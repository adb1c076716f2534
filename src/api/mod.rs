//! Motivue backend access: resource models, sample data and the HTTP client.

pub mod client;
pub mod error;
pub mod mock;
pub mod resource;
pub mod types;

pub use client::{ApiClient, FetchMode};
pub use error::ApiError;
pub use resource::{Resource, ResourceKind};
