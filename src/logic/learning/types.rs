//! Learning Types
//!
//! Feedback records và derived artifacts.
//! KHÔNG chứa logic - chỉ data structures.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::oracle::extract_domain;

// ============================================================================
// PAGE CLASSIFICATION
// ============================================================================

/// Classification labels exchanged with the caller.
/// `fraudulent` / `job_posting` are the positive (fraud-direction) labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageClass {
    JobPosting,
    LandingPage,
    Fraudulent,
    Legitimate,
}

impl PageClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageClass::JobPosting => "job_posting",
            PageClass::LandingPage => "landing_page",
            PageClass::Fraudulent => "fraudulent",
            PageClass::Legitimate => "legitimate",
        }
    }

    /// Fraud-direction label? Determines false-positive vs false-negative
    /// bookkeeping when the system was wrong.
    pub fn is_positive(&self) -> bool {
        matches!(self, PageClass::JobPosting | PageClass::Fraudulent)
    }
}

impl std::fmt::Display for PageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// FEEDBACK
// ============================================================================

/// How the feedback reached us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    /// User explicitly reported the page as fraudulent
    ManualReport,
    /// User corrected a system verdict
    Correction,
    /// User confirmed a system verdict
    Confirmation,
}

/// One confirmed/corrected verdict from the caller. Immutable; archived to
/// the persistence store as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub classification_id: String,
    pub url: String,
    pub system_classification: PageClass,
    pub user_classification: PageClass,
    pub was_correct: bool,
    /// Confidence the system reported for its verdict, in [0, 1]
    pub system_confidence: f64,
    /// Feature values over the documented key set (unknown keys ignored)
    pub features: HashMap<String, f64>,
    pub source: FeedbackSource,
    pub timestamp: DateTime<Utc>,
}

impl Feedback {
    /// Lower-cased host of the feedback url, None when unparsable
    pub fn domain(&self) -> Option<String> {
        extract_domain(&self.url)
    }

    /// System flagged fraud, user says it was fine
    pub fn is_false_positive(&self) -> bool {
        !self.was_correct && self.system_classification.is_positive()
    }

    /// System missed fraud
    pub fn is_false_negative(&self) -> bool {
        !self.was_correct && !self.system_classification.is_positive()
    }

    /// The specific page-type error that yields a false-positive pattern:
    /// system said job_posting, user said landing_page
    pub fn is_page_type_false_positive(&self) -> bool {
        !self.was_correct
            && self.system_classification == PageClass::JobPosting
            && self.user_classification == PageClass::LandingPage
    }
}

/// Returned by `process_feedback`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    pub processed: bool,
    /// Critical adaptation fired or a batch pass was triggered
    pub adaptation_triggered: bool,
    pub current_accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// FALSE POSITIVE PATTERN
// ============================================================================

/// Mined url signature element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlPattern {
    pub pattern: String,
    pub confidence: f64,
}

/// Mined url/content signature associated with prior incorrect fraud flags.
/// Write-only derived artifact, persisted for the page-analysis layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FalsePositivePattern {
    pub id: String,
    pub domain: String,
    pub url_patterns: Vec<UrlPattern>,
    /// Where the pattern came from (critical_feedback, batch_url_mining)
    pub source: String,
    pub accuracy: f64,
    pub false_positive_reduction: f64,
    pub created_at: DateTime<Utc>,
}

impl FalsePositivePattern {
    pub fn new(domain: String, url_patterns: Vec<UrlPattern>, source: &str, accuracy: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            domain,
            url_patterns,
            source: source.to_string(),
            accuracy,
            false_positive_reduction: 0.0,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// ROLLBACK CONSIDERATION
// ============================================================================

/// Record produced when a batch candidate is discarded for regressing
/// accuracy. Log-only: the previous state remains authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackConsideration {
    pub at: DateTime<Utc>,
    pub baseline_accuracy: f64,
    pub observed_accuracy: f64,
    pub feedback_count: usize,
}
