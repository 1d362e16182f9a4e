//! Speculative race controller
//!
//! Drives one document load as a race between the cache lookup and an
//! optimistic recomputation. Both start immediately, so when the lookup
//! misses, most of the conversion latency has already been paid behind it.
//!
//! Only one branch ever commits its result. A lookup hit adopts the cached
//! content and leaves the in-flight computation to finish on its own, its
//! result discarded. A miss waits for the computation, serves it, then
//! persists it through the store. Starting a new load supersedes the
//! previous one: in-flight work from the old run is ignored at every
//! commit point, never cancelled mid-flight.
//!
//! # Thread Safety
//!
//! Session state lives behind `tokio::sync::RwLock`; a monotonically
//! increasing generation counter decides which run is allowed to commit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::document::{CacheStatus, DocumentCache, DocumentProcessor, SourceDocument, StatusLookup};
use crate::encoding::encode_key;
use crate::error::BoxError;
use crate::retry::RetryPolicy;

use super::types::{
    ErrorKind, LoadOutcome, LoadingState, PerformanceMetrics, ProcessingError, SessionSnapshot,
};

/// Observable state of the session, guarded by the inner lock
struct SessionState {
    loading_state: LoadingState,
    cache_status: Option<CacheStatus>,
    content: Option<String>,
    error: Option<ProcessingError>,
    metrics: PerformanceMetrics,
    retry_count: u32,
    source: Option<SourceDocument>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            loading_state: LoadingState::Idle,
            cache_status: None,
            content: None,
            error: None,
            metrics: PerformanceMetrics::default(),
            retry_count: 0,
            source: None,
        }
    }
}

struct SessionInner {
    id: Uuid,
    cache: DocumentCache,
    processor: Arc<dyn DocumentProcessor>,
    retry: RetryPolicy,
    state: RwLock<SessionState>,
    generation: AtomicU64,
}

/// A processing session for one document at a time
///
/// Cheap to clone; clones observe and drive the same session.
#[derive(Clone)]
pub struct ProcessingSession {
    inner: Arc<SessionInner>,
}

impl ProcessingSession {
    /// Create a session with the default retry policy
    pub fn new(cache: DocumentCache, processor: Arc<dyn DocumentProcessor>) -> Self {
        Self::with_retry_policy(cache, processor, RetryPolicy::default())
    }

    /// Create a session with an explicit retry policy
    pub fn with_retry_policy(
        cache: DocumentCache,
        processor: Arc<dyn DocumentProcessor>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                cache,
                processor,
                retry,
                state: RwLock::new(SessionState::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Session identifier, stable for the session's lifetime
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Snapshot the session's observable state
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.read().await;
        SessionSnapshot {
            loading_state: state.loading_state,
            cache_status: state.cache_status,
            content: state.content.clone(),
            error: state.error.clone(),
            metrics: state.metrics.clone(),
            retry_count: state.retry_count,
        }
    }

    /// Load a document, racing the cache lookup against recomputation
    ///
    /// Starting a load for a different `(id, last_modified)` pair resets
    /// the session and supersedes any load still in flight; the old run's
    /// results are discarded at its next commit point.
    pub async fn load(&self, source: &SourceDocument) -> LoadOutcome {
        let generation = self.begin(source).await;
        self.run(source, generation).await
    }

    /// Retry the last load after a backoff delay
    ///
    /// Returns `None` without doing anything when no load has happened
    /// yet or the retry budget is exhausted.
    pub async fn retry(&self) -> Option<LoadOutcome> {
        let (source, attempt) = {
            let mut state = self.inner.state.write().await;
            let source = state.source.clone()?;
            if state.retry_count >= self.inner.retry.max_retries {
                tracing::warn!(
                    session_id = %self.inner.id,
                    id = %source.id,
                    retry_count = state.retry_count,
                    "Retry limit reached, ignoring retry request"
                );
                return None;
            }
            state.retry_count += 1;
            state.error = None;
            (source, state.retry_count)
        };

        let delay = self.inner.retry.delay_for_attempt(attempt);
        tracing::debug!(
            session_id = %self.inner.id,
            id = %source.id,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            "Retrying document load after backoff"
        );
        tokio::time::sleep(delay).await;

        let generation = self.begin(&source).await;
        Some(self.run(&source, generation).await)
    }

    /// Enter the loading state, resetting the session if the source changed
    ///
    /// Bumps the generation under the state lock so every commit from an
    /// older run is rejected from this point on.
    async fn begin(&self, source: &SourceDocument) -> u64 {
        let mut state = self.inner.state.write().await;
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let changed = state
            .source
            .as_ref()
            .map(|prev| (prev.id.as_str(), prev.last_modified))
            != Some((source.id.as_str(), source.last_modified));
        if changed {
            tracing::debug!(
                session_id = %self.inner.id,
                id = %source.id,
                last_modified = source.last_modified,
                "Starting load for new source"
            );
            *state = SessionState::default();
        } else {
            state.error = None;
        }

        state.source = Some(source.clone());
        state.loading_state = LoadingState::LoadingCached;
        generation
    }

    /// Apply a state change if this run has not been superseded
    async fn commit<F>(&self, generation: u64, apply: F) -> bool
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.inner.state.write().await;
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        apply(&mut state);
        true
    }

    async fn run(&self, source: &SourceDocument, generation: u64) -> LoadOutcome {
        let inner = &self.inner;
        let key = encode_key(&source.id);
        let total_started = Instant::now();

        // Optimistic computation starts now so its latency hides behind
        // the cache lookup when the lookup turns out to be a miss
        let compute = {
            let processor = Arc::clone(&inner.processor);
            let payload = source.payload.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                let result = processor.process(&payload).await;
                (result, started.elapsed())
            })
        };

        let retrieve_started = Instant::now();
        let lookup = inner.cache.get_document_with_status(&key).await;
        let retrieve = retrieve_started.elapsed();

        match lookup {
            Ok(StatusLookup {
                content: Some(content),
                status,
            }) if status != CacheStatus::New => {
                let adopted = self
                    .commit(generation, |state| {
                        state.loading_state = LoadingState::Idle;
                        state.cache_status = Some(status);
                        state.content = Some(content.clone());
                        state.metrics = PerformanceMetrics {
                            retrieve: Some(retrieve),
                            total: Some(total_started.elapsed()),
                            ..PerformanceMetrics::default()
                        };
                    })
                    .await;
                if !adopted {
                    return LoadOutcome::Superseded;
                }

                tracing::debug!(
                    session_id = %inner.id,
                    id = %source.id,
                    status = ?status,
                    "Cache hit, abandoning speculative computation"
                );
                // `compute` stays detached and runs to completion; its
                // result has lost the race and is dropped unobserved
                LoadOutcome::Served { content, status }
            }
            Ok(_) => {
                tracing::debug!(
                    session_id = %inner.id,
                    id = %source.id,
                    "Cache miss, waiting for in-flight computation"
                );
                self.finish_with_computed(
                    source,
                    generation,
                    compute,
                    LoadingState::ProcessingBackground,
                    Some(retrieve),
                    total_started,
                )
                .await
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %inner.id,
                    id = %source.id,
                    error = %e,
                    "Cache lookup failed, processing in foreground"
                );
                self.finish_with_computed(
                    source,
                    generation,
                    compute,
                    LoadingState::ProcessingForeground,
                    None,
                    total_started,
                )
                .await
            }
        }
    }

    /// Shared tail of the miss and foreground paths: await the in-flight
    /// computation, serve its result, persist it, and settle to idle
    async fn finish_with_computed(
        &self,
        source: &SourceDocument,
        generation: u64,
        compute: JoinHandle<(Result<String, BoxError>, Duration)>,
        phase: LoadingState,
        retrieve: Option<Duration>,
        total_started: Instant,
    ) -> LoadOutcome {
        if !self.commit(generation, |state| state.loading_state = phase).await {
            return LoadOutcome::Superseded;
        }

        let (content, process) = match compute.await {
            Ok((Ok(content), process)) => (content, process),
            Ok((Err(e), _)) => return self.fail(source, generation, e.to_string()).await,
            Err(e) => return self.fail(source, generation, e.to_string()).await,
        };

        // Content is served before the cache write completes
        let adopted = self
            .commit(generation, |state| {
                state.loading_state = LoadingState::Caching;
                state.cache_status = Some(CacheStatus::New);
                state.content = Some(content.clone());
            })
            .await;
        if !adopted {
            return LoadOutcome::Superseded;
        }

        let key = encode_key(&source.id);
        let cache_started = Instant::now();
        let cache_elapsed = match self
            .inner
            .cache
            .cache_processed_document(&key, &content, source.last_modified)
            .await
        {
            Ok(artifact) => {
                tracing::debug!(
                    session_id = %self.inner.id,
                    id = %source.id,
                    artifact = ?artifact,
                    "Cached processed content"
                );
                Some(cache_started.elapsed())
            }
            Err(e) => {
                // The content is already in hand; a failed cache write
                // must not fail the whole load
                tracing::warn!(
                    session_id = %self.inner.id,
                    id = %source.id,
                    error = %e,
                    "Failed to cache processed content"
                );
                None
            }
        };

        let settled = self
            .commit(generation, |state| {
                state.loading_state = LoadingState::Idle;
                state.metrics = PerformanceMetrics {
                    process: Some(process),
                    cache: cache_elapsed,
                    retrieve,
                    total: Some(total_started.elapsed()),
                };
            })
            .await;
        if !settled {
            return LoadOutcome::Superseded;
        }

        LoadOutcome::Served {
            content,
            status: CacheStatus::New,
        }
    }

    /// Record a computation failure, unless this run was superseded
    async fn fail(&self, source: &SourceDocument, generation: u64, message: String) -> LoadOutcome {
        tracing::error!(
            session_id = %self.inner.id,
            id = %source.id,
            error = %message,
            "Document processing failed"
        );

        let mut state = self.inner.state.write().await;
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return LoadOutcome::Superseded;
        }

        let error = ProcessingError {
            kind: ErrorKind::Processing,
            message,
            retryable: state.retry_count < self.inner.retry.max_retries,
            retry_count: state.retry_count,
        };
        state.loading_state = LoadingState::Error;
        state.error = Some(error.clone());
        LoadOutcome::Failed(error)
    }
}
