//! Consumer-facing processing sessions
//!
//! A [`ProcessingSession`] owns the speculative race between cache lookup
//! and recomputation for one document at a time, and exposes the state
//! machine an interface layer renders from: lifecycle state, served
//! content, per-phase timings, and a bounded retry affordance.

mod controller;
mod types;

pub use controller::ProcessingSession;
pub use types::{
    ErrorKind, LoadOutcome, LoadingState, PerformanceMetrics, ProcessingError, SessionSnapshot,
};
