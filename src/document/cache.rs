//! Cache-aside orchestrator
//!
//! Implements get-or-compute semantics over the tiered store: look up the
//! cached record for a document, validate it against the source modification
//! time, and only invoke the expensive processor on a miss or a stale hit.
//!
//! Two entry points exist because callers race differently:
//!
//! - [`DocumentCache::get_document`] serializes lookup and computation and
//!   is the simple path for batch or server-side callers.
//! - [`DocumentCache::get_document_with_status`] performs only the lookup
//!   half, letting an interactive caller launch its own speculative
//!   computation in parallel and commit whichever finishes usefully first.

use crate::encoding::encode_key;
use crate::error::{CacheError, Result, StoreError};
use crate::store::{StoredArtifact, TieredStore};

use super::types::{CacheStatus, DocumentProcessor, SourceDocument, StatusLookup};

/// Cache-aside front end over a [`TieredStore`]
///
/// Cheap to clone; clones share the underlying store handle.
#[derive(Clone)]
pub struct DocumentCache {
    store: TieredStore,
}

impl DocumentCache {
    /// Create a new cache over the given store
    pub fn new(store: TieredStore) -> Self {
        Self { store }
    }

    /// Get processed content for a document, computing it on a miss
    ///
    /// A cached entry counts as a hit only when its recorded source
    /// modification time equals `source.last_modified`; otherwise the
    /// processor runs again and the stored entry is overwritten wholesale.
    ///
    /// On a hit the entry's last-accessed time is refreshed in a detached
    /// task. That refresh is fire-and-forget: its failure is logged and
    /// never affects the returned content.
    pub async fn get_document(
        &self,
        source: &SourceDocument,
        processor: &dyn DocumentProcessor,
    ) -> Result<String> {
        let key = encode_key(&source.id);

        if let Some(cached) = self.store.read(&key).await? {
            if cached.source_last_modified == source.last_modified {
                tracing::debug!(
                    id = %source.id,
                    tier = ?cached.tier,
                    "Cache hit, serving stored content"
                );

                let store = self.store.clone();
                let touched = key.clone();
                tokio::spawn(async move {
                    if let Err(e) = store.touch(&touched).await {
                        tracing::warn!(
                            key = %touched,
                            error = %e,
                            "Failed to refresh last-accessed time"
                        );
                    }
                });

                return Ok(cached.content);
            }

            tracing::debug!(
                id = %source.id,
                cached_version = cached.source_last_modified,
                source_version = source.last_modified,
                "Cached entry is stale, reprocessing"
            );
        } else {
            tracing::debug!(id = %source.id, "Cache miss, processing");
        }

        let content = processor
            .process(&source.payload)
            .await
            .map_err(CacheError::Compute)?;

        self.store
            .write(&key, &content, source.last_modified)
            .await?;

        Ok(content)
    }

    /// Look up cached content without ever invoking the processor
    ///
    /// Takes an already-encoded key so the caller can start the lookup and
    /// its own speculative computation from the same precomputed value. The
    /// status tells the caller which tier answered: `new` means nothing is
    /// cached and the caller's speculative result is the one to keep.
    pub async fn get_document_with_status(&self, key: &str) -> Result<StatusLookup> {
        match self.store.read(key).await? {
            Some(cached) => Ok(StatusLookup {
                status: CacheStatus::from(cached.tier),
                content: Some(cached.content),
            }),
            None => Ok(StatusLookup {
                content: None,
                status: CacheStatus::New,
            }),
        }
    }

    /// Persist processed content under an already-encoded key
    ///
    /// Write half of the split protocol: callers that computed
    /// speculatively store the winning result through this method.
    pub async fn cache_processed_document(
        &self,
        key: &str,
        content: &str,
        source_last_modified: i64,
    ) -> std::result::Result<StoredArtifact, StoreError> {
        self.store.write(key, content, source_last_modified).await
    }
}
