//! Core types for the document processing pipeline

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BoxError;
use crate::store::Tier;

/// A source document awaiting processing
///
/// Owned by the caller and treated as immutable for the duration of one
/// processing attempt. The `last_modified` timestamp is the staleness
/// anchor: cached output is only valid while it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Opaque document identifier (file path, database id, ...)
    pub id: String,
    /// Source modification time, epoch milliseconds
    pub last_modified: i64,
    /// Raw document bytes handed to the processor
    pub payload: Vec<u8>,
}

impl SourceDocument {
    /// Create a new source document
    pub fn new(id: impl Into<String>, last_modified: i64, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            last_modified,
            payload,
        }
    }
}

/// Document-to-HTML conversion step
///
/// The conversion itself is an external collaborator. It is assumed
/// deterministic for a given payload and may fail with any error,
/// which the cache surfaces opaquely.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// Convert raw document bytes into HTML
    async fn process(&self, payload: &[u8]) -> Result<String, BoxError>;
}

/// Where a status lookup found the document, if anywhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStatus {
    /// No cached entry exists
    New,
    /// Served from an inline database record
    CachedDb,
    /// Served from blob storage via a reference record
    CachedStorage,
}

impl From<Tier> for CacheStatus {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Inline => CacheStatus::CachedDb,
            Tier::Reference => CacheStatus::CachedStorage,
        }
    }
}

/// Result of a status-reporting cache lookup
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLookup {
    /// Cached content, absent when the status is [`CacheStatus::New`]
    pub content: Option<String>,
    /// Which tier answered the lookup
    pub status: CacheStatus,
}
