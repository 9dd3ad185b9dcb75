//! Learning Module - Feedback-Driven Adaptation
//!
//! Hai đường adaptation:
//! - Critical path (`engine.rs`): synchronous nudges trước khi
//!   `process_feedback` returns
//! - Batch path (`batch.rs`): mining + bulk recalibration khi buffer đầy,
//!   validated trước khi commit

pub mod batch;
pub mod buffer;
pub mod engine;
pub mod types;


pub use batch::{build_candidate, mine, BatchOutcome, MinedStats};
pub use buffer::{BufferStatus, FeedbackBuffer};
pub use engine::{IngestOutcome, LearningEngine};
pub use types::{
    FalsePositivePattern, Feedback, FeedbackReceipt, FeedbackSource, PageClass,
    RollbackConsideration, UrlPattern,
};
