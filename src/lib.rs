//! Recuerdo
//!
//! Cache-aside layer between an expensive document conversion step and a
//! two-tier persistent store. Given a source document with an opaque id
//! and a modification timestamp, recuerdo serves previously computed
//! output while it is still valid, or recomputes and durably stores the
//! result, placing it inline or in blob storage by size.
//!
//! # Modules
//!
//! - `encoding`: bidirectional mapping from arbitrary ids to storage-safe keys
//! - `retry`: bounded exponential backoff with jitter
//! - `store`: tiered placement across a record store and a blob store
//! - `document`: get-or-compute orchestration with staleness detection
//! - `session`: speculative race between cache lookup and recomputation

pub mod document;
pub mod encoding;
pub mod error;
pub mod retry;
pub mod session;
pub mod store;

pub use document::{CacheStatus, DocumentCache, DocumentProcessor, SourceDocument, StatusLookup};
pub use error::{CacheError, FetchError, StoreError};
pub use retry::RetryPolicy;
pub use session::{LoadOutcome, LoadingState, ProcessingSession, SessionSnapshot};
pub use store::{StoredArtifact, Tier, TieredStore, TieringConfig};
