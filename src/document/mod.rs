//! Document processing cache
//!
//! Get-or-compute layer between an expensive document conversion step and
//! the tiered store. Callers hand over a [`SourceDocument`] and a
//! [`DocumentProcessor`]; the cache decides whether stored output is still
//! valid for that source version or the processor has to run again.

mod cache;
mod types;

pub use cache::DocumentCache;
pub use types::{CacheStatus, DocumentProcessor, SourceDocument, StatusLookup};
