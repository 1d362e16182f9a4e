//! Storage backend traits
//!
//! The gateway is written against these three seams so backends stay
//! interchangeable: a small-object record store, a blob store for large
//! artifacts, and a fetcher that resolves reference records back to
//! content.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{FetchError, StoreError};

/// Small-object store holding one JSON record per path
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the record at a path, `None` when absent
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Write the record at a path, replacing any previous value wholesale
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;
}

/// Blob store for artifacts too large to live inside a record
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes to a path, replacing any previous blob
    async fn upload(&self, path: &str, data: &[u8], content_type: &str)
        -> Result<(), StoreError>;

    /// Durable URL from which the blob at a path can be fetched later
    async fn download_url(&self, path: &str) -> Result<String, StoreError>;
}

/// Resolves a reference record's URL to its body
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the UTF-8 body at a URL
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
