//! Tiered persistent storage
//!
//! Processed documents live in one of two tiers: a small-object record
//! store for anything that fits inside a JSON record, and a blob store
//! for everything else. The gateway decides placement by size and hides
//! the split from callers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     TieredStore                         │
//! │   (size-based placement, retries, wholesale records)    │
//! └─────────────────────────────────────────────────────────┘
//!          │                  │                   │
//!          ▼                  ▼                   ▼
//!   ┌─────────────┐    ┌─────────────┐    ┌────────────────┐
//!   │ RecordStore │    │  BlobStore  │    │ ContentFetcher │
//!   │ memory /    │    │ memory / fs │    │ memory / http  │
//!   │ sqlite      │    │ / s3        │    │                │
//!   └─────────────┘    └─────────────┘    └────────────────┘
//! ```

mod fetch;
mod fs;
mod gateway;
mod memory;
mod s3;
mod sqlite;
mod traits;
mod types;

pub use fetch::HttpFetcher;
pub use fs::FsBlobStore;
pub use gateway::{TieredStore, TieringConfig};
pub use memory::{MemoryBlobStore, MemoryFetcher, MemoryRecordStore};
pub use s3::{S3BlobStore, S3Config};
pub use sqlite::SqliteRecordStore;
pub use traits::{BlobStore, ContentFetcher, RecordStore};
pub use types::{
    blob_path, record_path, ArtifactBody, CachedDocument, DocumentRecord, StoredArtifact, Tier,
    ARTIFACT_CONTENT_TYPE, BLOB_PATH_PREFIX, RECORD_PATH_PREFIX,
};
