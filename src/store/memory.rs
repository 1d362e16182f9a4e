//! In-memory storage backends
//!
//! Zero-setup backends used as the default wiring in tests and small
//! deployments. Handles are cheap clones sharing the same state, so a
//! test can keep one and inspect or fail the store behind a gateway.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::traits::{BlobStore, ContentFetcher, RecordStore};
use crate::error::{FetchError, StoreError};

/// URL scheme for blobs held by [`MemoryBlobStore`]
const MEMORY_URL_SCHEME: &str = "memory://";

// ============================================================================
// Record Store
// ============================================================================

/// In-memory record store
///
/// Can be primed to fail its next calls with a backend error, which is how
/// retry behavior is exercised without a real flaky backend.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<String, Value>>>,
    failures_remaining: Arc<AtomicUsize>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` store calls fail with a backend error
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Raw record at a path, for inspecting persisted wire shapes
    pub async fn raw(&self, path: &str) -> Option<Value> {
        let records = self.records.read().await;
        records.get(path).cloned()
    }

    fn take_failure(&self) -> bool {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        if self.take_failure() {
            return Err(StoreError::Backend(format!(
                "injected failure reading {}",
                path
            )));
        }
        let records = self.records.read().await;
        Ok(records.get(path).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        if self.take_failure() {
            return Err(StoreError::Backend(format!(
                "injected failure writing {}",
                path
            )));
        }
        let mut records = self.records.write().await;
        records.insert(path.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// Blob Store
// ============================================================================

/// In-memory blob store handing out `memory://` URLs
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetcher that resolves this store's `memory://` URLs
    pub fn fetcher(&self) -> MemoryFetcher {
        MemoryFetcher {
            blobs: Arc::clone(&self.blobs),
        }
    }

    /// Number of stored blobs
    pub async fn blob_count(&self) -> usize {
        let blobs = self.blobs.read().await;
        blobs.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        path: &str,
        data: &[u8],
        _content_type: &str,
    ) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write().await;
        blobs.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String, StoreError> {
        Ok(format!("{}{}", MEMORY_URL_SCHEME, path))
    }
}

/// Resolves `memory://` URLs produced by [`MemoryBlobStore`]
#[derive(Clone)]
pub struct MemoryFetcher {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl ContentFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let path = url
            .strip_prefix(MEMORY_URL_SCHEME)
            .ok_or_else(|| FetchError::Request(format!("not a memory url: {}", url)))?;

        let blobs = self.blobs.read().await;
        let data = blobs
            .get(path)
            .ok_or_else(|| FetchError::Request(format!("no blob behind {}", url)))?;

        String::from_utf8(data.clone())
            .map_err(|e| FetchError::Request(format!("blob behind {} is not utf-8: {}", url, e)))
    }
}

// ============================================================================
// Tests
// ============================================================================
