//! Session state machine types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::document::CacheStatus;

/// Where a processing session currently is in its lifecycle
///
/// Normal flow is `idle -> loading-cached -> {processing-background |
/// processing-foreground} -> caching -> idle`. The `error` state is
/// reachable from any in-flight state when computation fails with no
/// cached fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadingState {
    /// Nothing in flight
    Idle,
    /// Cache lookup and speculative computation both running
    LoadingCached,
    /// Cache missed; waiting on the computation that was already launched
    ProcessingBackground,
    /// Cache lookup failed; computation is the only source of content
    ProcessingForeground,
    /// Content in hand, persisting it through the store
    Caching,
    /// Computation failed and no cached content was available
    Error,
}

impl LoadingState {
    /// Whether the session still has work in flight
    pub fn is_in_flight(self) -> bool {
        !matches!(self, LoadingState::Idle | LoadingState::Error)
    }
}

/// Classification of a session-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The document conversion step failed
    Processing,
    /// Persisting processed content failed
    Caching,
    /// Cached content could not be retrieved
    Retrieval,
    /// A network transfer failed
    Network,
}

/// Error surfaced to the session's observer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingError {
    /// What failed
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Whether another retry attempt remains
    pub retryable: bool,
    /// Retry attempts consumed so far
    pub retry_count: u32,
}

/// Wall-clock timings for one load, by phase
///
/// A phase that did not run (or failed) leaves its field unset. A cache
/// hit records only retrieval and total; a full miss records all four.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    /// Document conversion time
    pub process: Option<Duration>,
    /// Time spent persisting the result
    pub cache: Option<Duration>,
    /// Cache lookup time
    pub retrieve: Option<Duration>,
    /// Session start to final idle
    pub total: Option<Duration>,
}

/// Point-in-time view of a session's observable state
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Current lifecycle state
    pub loading_state: LoadingState,
    /// How the last served content was obtained, if any was served
    pub cache_status: Option<CacheStatus>,
    /// Last served content
    pub content: Option<String>,
    /// Last failure, cleared on retry
    pub error: Option<ProcessingError>,
    /// Phase timings for the most recent load
    pub metrics: PerformanceMetrics,
    /// Retry attempts consumed for the current source
    pub retry_count: u32,
}

/// Result of driving one load to completion
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Content was served, from cache or fresh computation
    Served {
        /// The processed content
        content: String,
        /// Which path produced it
        status: CacheStatus,
    },
    /// A newer load for a different source took over; this run's results
    /// were discarded
    Superseded,
    /// Computation failed with no cached fallback
    Failed(ProcessingError),
}
