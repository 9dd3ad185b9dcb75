//! Logic Module - Classification & Learning Engines
//!
//! Chứa các engines xử lý: Scoring, Model State, Learning, Persistence.
//!
//! ## Architecture
//! - `scoring/` - Three-stage classify pipeline (domain, lexical, fallback)
//! - `model/` - Adaptive model state (weights, thresholds, domain biases)
//! - `learning/` - Feedback ingestion, critical adaptation, batch learning
//! - `persistence/` - Durable store trait + adapters
//! - `oracle` - Domain blacklist oracle
//! - `features` - Feature key set + provider trait

pub mod features;
pub mod learning;
pub mod model;
pub mod oracle;
pub mod persistence;
pub mod scoring;
