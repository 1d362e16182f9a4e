//! Record and artifact types for the tiered store

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Record-store prefix for processed-document records
pub const RECORD_PATH_PREFIX: &str = "processedDocuments";

/// Blob-store prefix for processed artifacts
pub const BLOB_PATH_PREFIX: &str = "processed";

/// Content type for uploaded artifacts
pub const ARTIFACT_CONTENT_TYPE: &str = "text/html";

/// Record-store path for an encoded document key
pub fn record_path(key: &str) -> String {
    format!("{}/{}", RECORD_PATH_PREFIX, key)
}

/// Blob-store path for an encoded document key
pub fn blob_path(key: &str) -> String {
    format!("{}/{}.html", BLOB_PATH_PREFIX, key)
}

// ============================================================================
// Record Types
// ============================================================================

/// Persisted record for one processed document
///
/// Written wholesale on every update: a record always describes exactly
/// one artifact representation, never fields from two generations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Version token of the source that produced this artifact; equality
    /// with the caller's current token means the artifact is still valid
    pub source_last_modified: i64,

    /// Last time this record answered a cache hit
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_accessed: DateTime<Utc>,

    /// When the artifact was produced
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_processed: DateTime<Utc>,

    /// The artifact itself or a reference to it
    #[serde(flatten)]
    pub body: ArtifactBody,
}

/// Where a record's artifact lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ArtifactBody {
    /// Small artifact embedded directly in the record
    Inline { html: String },

    /// Large artifact in the blob tier, referenced by URL
    Reference {
        #[serde(rename = "htmlUrl")]
        html_url: String,
    },
}

/// Current time at the millisecond precision of the wire format
///
/// Record timestamps serialize as epoch milliseconds, so stamping them at
/// nanosecond precision would make a record differ from its own wire image.
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl DocumentRecord {
    /// Build a fresh inline record
    pub fn inline(html: String, source_last_modified: i64) -> Self {
        let now = now_millis();
        Self {
            source_last_modified,
            last_accessed: now,
            last_processed: now,
            body: ArtifactBody::Inline { html },
        }
    }

    /// Build a fresh reference record
    pub fn reference(html_url: String, source_last_modified: i64) -> Self {
        let now = now_millis();
        Self {
            source_last_modified,
            last_accessed: now,
            last_processed: now,
            body: ArtifactBody::Reference { html_url },
        }
    }

    /// Tier this record's artifact lives in
    pub fn tier(&self) -> Tier {
        match self.body {
            ArtifactBody::Inline { .. } => Tier::Inline,
            ArtifactBody::Reference { .. } => Tier::Reference,
        }
    }
}

// ============================================================================
// Gateway Results
// ============================================================================

/// Storage tier an artifact landed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Inside the record store
    Inline,
    /// In the blob store, behind a reference record
    Reference,
}

/// Outcome of persisting a processed document
#[derive(Debug, Clone, PartialEq)]
pub enum StoredArtifact {
    /// Embedded in the record at this record-store path
    Inline { path: String },
    /// Uploaded to the blob tier, reachable at this URL
    Reference { url: String },
}

/// A processed document read back through the gateway
#[derive(Debug, Clone)]
pub struct CachedDocument {
    /// The processed content, inline or fetched from the blob tier
    pub content: String,
    /// Tier that answered
    pub tier: Tier,
    /// Version token of the source that produced the content
    pub source_last_modified: i64,
    /// Last hit time recorded before this read
    pub last_accessed: DateTime<Utc>,
    /// When the content was produced
    pub last_processed: DateTime<Utc>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(record_path("report!pdocx"), "processedDocuments/report!pdocx");
        assert_eq!(blob_path("report!pdocx"), "processed/report!pdocx.html");
    }

    #[test]
    fn test_inline_record_wire_shape() {
        let record = DocumentRecord::inline("<h1>hi</h1>".to_string(), 1000);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["sourceLastModified"], 1000);
        assert_eq!(value["html"], "<h1>hi</h1>");
        assert!(value["lastAccessed"].is_i64());
        assert!(value["lastProcessed"].is_i64());
        assert!(value.get("htmlUrl").is_none());
    }

    #[test]
    fn test_reference_record_wire_shape() {
        let record = DocumentRecord::reference("https://cdn/doc.html".to_string(), 2000);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["sourceLastModified"], 2000);
        assert_eq!(value["htmlUrl"], "https://cdn/doc.html");
        assert!(value.get("html").is_none());
    }

    #[test]
    fn test_record_round_trip() {
        for record in [
            DocumentRecord::inline("<p>x</p>".to_string(), 1),
            DocumentRecord::reference("https://cdn/x.html".to_string(), 2),
        ] {
            // Fresh records carry no sub-millisecond digits for the wire to drop
            assert_eq!(record.last_accessed.timestamp_subsec_nanos() % 1_000_000, 0);
            assert_eq!(record.last_processed.timestamp_subsec_nanos() % 1_000_000, 0);

            let value = serde_json::to_value(&record).unwrap();
            let back: DocumentRecord = serde_json::from_value(value).unwrap();
            assert_eq!(back, record);
        }
    }

    #[test]
    fn test_tier_follows_body() {
        let inline = DocumentRecord::inline(String::new(), 0);
        let reference = DocumentRecord::reference("u".to_string(), 0);
        assert_eq!(inline.tier(), Tier::Inline);
        assert_eq!(reference.tier(), Tier::Reference);
    }
}
