//! Model Module - Adaptive Model State
//!
//! Tách model state khỏi scoring và learning. LearningEngine là sole owner;
//! ScoringEngine chỉ đọc immutable snapshots.

pub mod metrics;
pub mod state;

// Re-export common types
pub use metrics::{MetricsTracker, PerformanceMetrics};
pub use state::{DomainBias, ModelState, Thresholds};
