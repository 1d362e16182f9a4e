//! Error types for the cache-aside layer

use thiserror::Error;

/// Opaque error produced by an injected document processor
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Top-level cache error type
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Processing error: {0}")]
    Compute(#[source] BoxError),
}

/// Storage backend errors
///
/// Backend failures are assumed transient and are retried before they
/// surface through this type.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors resolving a reference record's backing content
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Content request failed: {0}")]
    Request(String),

    #[error("Content request to {url} returned status {status}")]
    Status { url: String, status: u16 },
}
