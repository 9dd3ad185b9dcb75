//! Scoring Module - Fraud Classification Pipeline
//!
//! Tách logic classify khỏi learning. ScoringEngine chỉ đọc immutable
//! ModelState snapshots - không bao giờ mutate.

pub mod engine;
pub mod rules;
pub mod types;

// Re-export common types
pub use engine::ScoringEngine;
pub use types::{DetectionMethod, RiskLevel, Verdict};
