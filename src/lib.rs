//! FraudGuard Core - Adaptive Job-Posting Fraud Detection
//!
//! Layered classification pipeline: domain blacklist → weighted keyword
//! scoring → human-review escalation, với một learning engine tự recalibrate
//! weights/thresholds từ user feedback mà không cần redeploy.
//!
//! ## Architecture
//! - `logic/scoring` - Deterministic, short-circuiting classify pipeline
//! - `logic/model` - Versioned model state (weights, thresholds, biases)
//! - `logic/learning` - Critical-path feedback + batch learning
//! - `logic/persistence` - Durable store adapters (SQLite, in-memory)
//! - `logic/oracle` - Domain blacklist oracle
//!
//! Classification reads are lock-free snapshots; mutations publish a new
//! immutable `ModelState` by atomic reference swap.

pub mod constants;
pub mod error;
pub mod logic;

mod engine;

pub use engine::{EngineStatus, FraudEngine, ModelSnapshot};
pub use error::EngineError;
pub use logic::features::{FeatureProvider, TextStatsProvider, FEATURE_KEYS};
pub use logic::learning::buffer::BufferStatus;
pub use logic::learning::types::{
    FalsePositivePattern, Feedback, FeedbackReceipt, FeedbackSource, PageClass,
    RollbackConsideration, UrlPattern,
};
pub use logic::model::metrics::PerformanceMetrics;
pub use logic::model::state::{DomainBias, ModelState, Thresholds};
pub use logic::oracle::{BlacklistOracle, DomainOracle, OracleVerdict};
pub use logic::persistence::{
    memory::MemoryStore, sqlite::SqliteStore, ClassificationRules, PersistenceStore, RuleType,
    StoreError,
};
pub use logic::scoring::types::{DetectionMethod, RiskLevel, Verdict};
