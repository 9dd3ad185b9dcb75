//! Error handling
//!
//! Engine-internal error kinds. Caller-facing operations never return these:
//! `classify` always yields a Verdict and `process_feedback` always yields a
//! receipt - every kind below is recovered locally and at most logged.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// FeatureProvider / DomainOracle / PersistenceStore unreachable.
    /// Pipeline proceeds with the next stage or last-known-good state.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// Unparsable url, empty text. The affected stage is skipped.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Batch candidate would lower accuracy beyond tolerance.
    /// Recorded, commit skipped, previous state stays authoritative.
    #[error("validation regression: observed {observed:.3} vs baseline {baseline:.3}")]
    ValidationRegression { baseline: f64, observed: f64 },

    /// Store write failed during commit. In-memory state still governs,
    /// but is not durable until the next successful persist.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}
