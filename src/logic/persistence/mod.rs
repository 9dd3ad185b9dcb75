//! Persistence Module - Durable Store Adapters
//!
//! The store is an external collaborator: every call may fail, and failure
//! must leave in-memory defaults intact. Explicit request/response
//! operations - no callbacks - invoked off the classification hot path.

pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::learning::types::{FalsePositivePattern, Feedback};
use super::model::metrics::PerformanceMetrics;

// ============================================================================
// ERRORS
// ============================================================================

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

// ============================================================================
// RULE SETS
// ============================================================================

/// The three rule groups committed atomically at the end of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Weights,
    Thresholds,
    DomainRules,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Weights => "weights",
            RuleType::Thresholds => "thresholds",
            RuleType::DomainRules => "domain_rules",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "weights" => Some(RuleType::Weights),
            "thresholds" => Some(RuleType::Thresholds),
            "domain_rules" => Some(RuleType::DomainRules),
            _ => None,
        }
    }
}

/// One persisted rule set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRules {
    pub rule_type: RuleType,
    pub rules: serde_json::Value,
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Durable feedback, rules, pattern, and metric storage
pub trait PersistenceStore: Send + Sync {
    fn store_user_feedback(&self, feedback: &Feedback) -> StoreResult<()>;

    fn store_false_positive_pattern(&self, pattern: &FalsePositivePattern) -> StoreResult<()>;

    fn get_learning_patterns(&self) -> StoreResult<Vec<FalsePositivePattern>>;

    fn get_classification_rules(&self) -> StoreResult<Vec<ClassificationRules>>;

    fn update_classification_rules(
        &self,
        rule_type: RuleType,
        payload: serde_json::Value,
    ) -> StoreResult<()>;

    /// Most recent first
    fn get_user_feedback_history(&self, limit: usize) -> StoreResult<Vec<Feedback>>;

    /// Rolling performance summary over the window (ms); None when there is
    /// not enough stored feedback to compute one
    fn get_performance_metrics(&self, window_ms: Option<i64>)
        -> StoreResult<Option<PerformanceMetrics>>;
}
