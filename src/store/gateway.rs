//! Tiered store gateway
//!
//! Routes processed documents between the record store and the blob store
//! by size. Small artifacts are embedded directly in their record; large
//! ones are uploaded to the blob tier and the record keeps a download URL.
//! The record is the single source of truth for which tier holds a
//! document, and it is always replaced wholesale so readers never observe
//! a mix of generations.
//!
//! Every backend call runs through the retry executor. Calls retry
//! independently: a blob upload that succeeded is not redone when the
//! follow-up record write has to retry.

use std::sync::Arc;

use super::memory::{MemoryBlobStore, MemoryRecordStore};
use super::traits::{BlobStore, ContentFetcher, RecordStore};
use super::types::{
    blob_path, now_millis, record_path, ArtifactBody, CachedDocument, DocumentRecord,
    StoredArtifact, Tier, ARTIFACT_CONTENT_TYPE,
};
use crate::error::{CacheError, StoreError};
use crate::retry::{with_retry, RetryPolicy};

/// Inline-artifact ceiling: 100 KiB
const DEFAULT_INLINE_MAX_BYTES: usize = 100 * 1024;

/// Tier-placement configuration
#[derive(Debug, Clone)]
pub struct TieringConfig {
    /// Contents strictly below this many UTF-8 bytes are embedded in the
    /// record; contents at or above it go to the blob store
    pub inline_max_bytes: usize,
}

impl Default for TieringConfig {
    fn default() -> Self {
        Self {
            inline_max_bytes: DEFAULT_INLINE_MAX_BYTES,
        }
    }
}

// ============================================================================
// Tiered Store
// ============================================================================

/// Gateway over the two storage tiers
#[derive(Clone)]
pub struct TieredStore {
    inner: Arc<TieredStoreInner>,
}

struct TieredStoreInner {
    records: Box<dyn RecordStore>,
    blobs: Box<dyn BlobStore>,
    fetcher: Box<dyn ContentFetcher>,
    tiering: TieringConfig,
    retry: RetryPolicy,
}

impl TieredStore {
    /// Create a gateway over injected backends
    pub fn new(
        records: Box<dyn RecordStore>,
        blobs: Box<dyn BlobStore>,
        fetcher: Box<dyn ContentFetcher>,
        tiering: TieringConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(TieredStoreInner {
                records,
                blobs,
                fetcher,
                tiering,
                retry,
            }),
        }
    }

    /// Create a gateway over in-memory backends with default configuration
    pub fn in_memory() -> Self {
        let blobs = MemoryBlobStore::new();
        let fetcher = blobs.fetcher();
        Self::new(
            Box::new(MemoryRecordStore::new()),
            Box::new(blobs),
            Box::new(fetcher),
            TieringConfig::default(),
            RetryPolicy::default(),
        )
    }

    /// Persist processed content under an encoded key
    ///
    /// Tier placement follows content size. For the blob tier the upload
    /// happens first, then the reference record; readers either see the
    /// old record or the complete new one.
    pub async fn write(
        &self,
        key: &str,
        content: &str,
        source_last_modified: i64,
    ) -> Result<StoredArtifact, StoreError> {
        let record_path = record_path(key);

        if content.len() < self.inner.tiering.inline_max_bytes {
            let record = DocumentRecord::inline(content.to_string(), source_last_modified);
            self.set_record(&record_path, &record).await?;

            tracing::debug!(key = %key, bytes = content.len(), "Stored document inline");
            return Ok(StoredArtifact::Inline { path: record_path });
        }

        let blob_path = blob_path(key);
        with_retry(&self.inner.retry, "blob upload", || {
            self.inner
                .blobs
                .upload(&blob_path, content.as_bytes(), ARTIFACT_CONTENT_TYPE)
        })
        .await?;

        let url = with_retry(&self.inner.retry, "blob url", || {
            self.inner.blobs.download_url(&blob_path)
        })
        .await?;

        let record = DocumentRecord::reference(url.clone(), source_last_modified);
        self.set_record(&record_path, &record).await?;

        tracing::debug!(key = %key, bytes = content.len(), "Stored document in blob tier");
        Ok(StoredArtifact::Reference { url })
    }

    /// Read processed content by encoded key
    ///
    /// `None` means no record exists. A record whose referenced blob
    /// cannot be fetched is an error, never a miss: callers must not
    /// silently recompute content the store claims to have.
    pub async fn read(&self, key: &str) -> Result<Option<CachedDocument>, CacheError> {
        let record_path = record_path(key);
        let Some(record) = self.get_record(&record_path).await? else {
            return Ok(None);
        };

        let (content, tier) = match &record.body {
            ArtifactBody::Inline { html } => (html.clone(), Tier::Inline),
            ArtifactBody::Reference { html_url } => {
                let content = with_retry(&self.inner.retry, "content fetch", || {
                    self.inner.fetcher.fetch(html_url)
                })
                .await?;
                (content, Tier::Reference)
            }
        };

        Ok(Some(CachedDocument {
            content,
            tier,
            source_last_modified: record.source_last_modified,
            last_accessed: record.last_accessed,
            last_processed: record.last_processed,
        }))
    }

    /// Bump a record's last-accessed time, preserving everything else
    ///
    /// Missing records are left alone.
    pub async fn touch(&self, key: &str) -> Result<(), StoreError> {
        let record_path = record_path(key);
        let Some(mut record) = self.get_record(&record_path).await? else {
            return Ok(());
        };

        record.last_accessed = now_millis();
        self.set_record(&record_path, &record).await
    }

    async fn get_record(&self, path: &str) -> Result<Option<DocumentRecord>, StoreError> {
        let value = with_retry(&self.inner.retry, "record read", || {
            self.inner.records.get(path)
        })
        .await?;

        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_record(&self, path: &str, record: &DocumentRecord) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)?;
        with_retry(&self.inner.retry, "record write", || {
            self.inner.records.set(path, value.clone())
        })
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn store_with(tiering: TieringConfig) -> (TieredStore, MemoryRecordStore, MemoryBlobStore) {
        let records = MemoryRecordStore::new();
        let blobs = MemoryBlobStore::new();
        let fetcher = blobs.fetcher();
        let store = TieredStore::new(
            Box::new(records.clone()),
            Box::new(blobs.clone()),
            Box::new(fetcher),
            tiering,
            fast_retry(),
        );
        (store, records, blobs)
    }

    fn default_store() -> (TieredStore, MemoryRecordStore, MemoryBlobStore) {
        store_with(TieringConfig::default())
    }

    #[tokio::test]
    async fn test_small_content_stays_inline() {
        let (store, records, blobs) = default_store();

        let artifact = store.write("report!pdocx", "<h1>report.docx</h1>", 1000).await.unwrap();
        assert_eq!(
            artifact,
            StoredArtifact::Inline {
                path: "processedDocuments/report!pdocx".to_string()
            }
        );
        assert_eq!(blobs.blob_count().await, 0);

        let raw = records.raw("processedDocuments/report!pdocx").await.unwrap();
        assert_eq!(raw["html"], "<h1>report.docx</h1>");
        assert!(raw.get("htmlUrl").is_none());

        let doc = store.read("report!pdocx").await.unwrap().unwrap();
        assert_eq!(doc.content, "<h1>report.docx</h1>");
        assert_eq!(doc.tier, Tier::Inline);
        assert_eq!(doc.source_last_modified, 1000);
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let (store, _, blobs) = store_with(TieringConfig { inline_max_bytes: 8 });

        let below = store.write("below", "1234567", 1).await.unwrap();
        assert!(matches!(below, StoredArtifact::Inline { .. }));
        assert_eq!(blobs.blob_count().await, 0);

        let at = store.write("at", "12345678", 1).await.unwrap();
        assert!(matches!(at, StoredArtifact::Reference { .. }));
        assert_eq!(blobs.blob_count().await, 1);

        // Both read back byte-identical regardless of tier.
        assert_eq!(store.read("below").await.unwrap().unwrap().content, "1234567");
        let doc = store.read("at").await.unwrap().unwrap();
        assert_eq!(doc.content, "12345678");
        assert_eq!(doc.tier, Tier::Reference);
    }

    #[tokio::test]
    async fn test_default_threshold_is_100_kib() {
        let (store, _, _) = default_store();

        let just_under = "x".repeat(100 * 1024 - 1);
        let at_limit = "x".repeat(100 * 1024);

        let a = store.write("under", &just_under, 1).await.unwrap();
        assert!(matches!(a, StoredArtifact::Inline { .. }));

        let b = store.write("exact", &at_limit, 1).await.unwrap();
        assert!(matches!(b, StoredArtifact::Reference { .. }));
    }

    #[tokio::test]
    async fn test_overwrite_flips_representation_wholesale() {
        let (store, records, _) = store_with(TieringConfig { inline_max_bytes: 8 });

        store.write("doc", "this one is large", 1).await.unwrap();
        let raw = records.raw("processedDocuments/doc").await.unwrap();
        assert!(raw.get("htmlUrl").is_some());

        // Shrinking below the threshold must leave no reference fields
        // behind.
        store.write("doc", "tiny", 2).await.unwrap();
        let raw = records.raw("processedDocuments/doc").await.unwrap();
        assert_eq!(raw["html"], "tiny");
        assert!(raw.get("htmlUrl").is_none());

        let doc = store.read("doc").await.unwrap().unwrap();
        assert_eq!(doc.content, "tiny");
        assert_eq!(doc.tier, Tier::Inline);
        assert_eq!(doc.source_last_modified, 2);

        // And growing again replaces the inline field with a reference.
        store.write("doc", "large once more now", 3).await.unwrap();
        let raw = records.raw("processedDocuments/doc").await.unwrap();
        assert!(raw.get("html").is_none());
        assert!(raw.get("htmlUrl").is_some());
    }

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let (store, _, _) = default_store();
        assert!(store.read("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_retries_transient_failures() {
        let (store, records, _) = default_store();
        store.write("doc", "content", 1).await.unwrap();

        records.fail_next(2);
        let doc = store.read("doc").await.unwrap().unwrap();
        assert_eq!(doc.content, "content");
    }

    #[tokio::test]
    async fn test_write_attempt_budget() {
        let (store, records, _) = default_store();

        // Three failures fit inside the budget of four attempts.
        records.fail_next(3);
        assert!(store.write("doc", "content", 1).await.is_ok());

        // Four failures exhaust it.
        records.fail_next(4);
        let err = store.write("doc", "content", 2).await;
        assert!(matches!(err, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_broken_reference_is_error_not_miss() {
        let (store, records, _) = store_with(TieringConfig { inline_max_bytes: 4 });
        store.write("doc", "large content", 1).await.unwrap();

        // Same records, but a fetcher that cannot see the blobs.
        let empty_blobs = MemoryBlobStore::new();
        let broken = TieredStore::new(
            Box::new(records.clone()),
            Box::new(empty_blobs.clone()),
            Box::new(empty_blobs.fetcher()),
            TieringConfig { inline_max_bytes: 4 },
            fast_retry(),
        );

        let result = broken.read("doc").await;
        assert!(matches!(result, Err(CacheError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_touch_bumps_last_accessed_only() {
        let (store, _, _) = default_store();
        store.write("doc", "content", 1).await.unwrap();
        let before = store.read("doc").await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        store.touch("doc").await.unwrap();

        let after = store.read("doc").await.unwrap().unwrap();
        assert!(after.last_accessed > before.last_accessed);
        assert_eq!(after.last_processed, before.last_processed);
        assert_eq!(after.content, "content");
        assert_eq!(after.source_last_modified, 1);
    }

    #[tokio::test]
    async fn test_touch_missing_key_is_a_noop() {
        let (store, records, _) = default_store();
        store.touch("absent").await.unwrap();
        assert!(records.raw("processedDocuments/absent").await.is_none());
    }

    #[tokio::test]
    async fn test_in_memory_wiring() {
        let store = TieredStore::in_memory();
        store.write("doc", "content", 9).await.unwrap();

        let doc = store.read("doc").await.unwrap().unwrap();
        assert_eq!(doc.content, "content");
        assert_eq!(doc.source_last_modified, 9);
    }
}
