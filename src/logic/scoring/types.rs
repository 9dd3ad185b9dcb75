//! Scoring Types
//!
//! Core types cho fraud classification.
//! KHÔNG chứa logic - chỉ data structures.

use serde::{Deserialize, Serialize};

// ============================================================================
// RISK LEVEL
// ============================================================================

/// Risk levels for a classified posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Legitimacy signals dominate, no action needed
    VeryLow,
    /// Weak fraud signals, below analysis thresholds
    Low,
    /// Fraud signals present, flag with reduced confidence
    Medium,
    /// Strong fraud signals, flag immediately
    High,
    /// Classification could not be established
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "very_low",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Unknown => "unknown",
        }
    }

    pub fn severity_level(&self) -> u8 {
        match self {
            RiskLevel::VeryLow => 0,
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::Unknown => 1,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// DETECTION METHOD
// ============================================================================

/// Which pipeline stage produced the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Stage 1: exact domain blacklist hit
    DomainBlacklist,
    /// Stage 2: weighted keyword scoring was decisive
    NlpAnalysis,
    /// Stage 3: no stage was decisive, escalated to manual review
    Inconclusive,
    /// Pipeline-level failure (should not normally occur)
    Error,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::DomainBlacklist => "domain_blacklist",
            DetectionMethod::NlpAnalysis => "nlp_analysis",
            DetectionMethod::Inconclusive => "inconclusive",
            DetectionMethod::Error => "error",
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// LEXICAL BREAKDOWN
// ============================================================================

/// Breakdown of how the lexical score was calculated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalBreakdown {
    pub fraud_score: f64,
    pub legitimate_score: f64,
    /// Domain bias applied before clamping (0 when no url / no learned bias)
    pub domain_bias: f64,
    /// clamp(fraud - legitimate + bias, 0, 1)
    pub normalized_score: f64,
    /// Fraud groups that matched at least one keyword
    pub matched_groups: Vec<String>,
    /// Legitimacy groups that matched at least one keyword
    pub matched_legitimacy: Vec<String>,
}

impl Default for LexicalBreakdown {
    fn default() -> Self {
        Self {
            fraud_score: 0.0,
            legitimate_score: 0.0,
            domain_bias: 0.0,
            normalized_score: 0.0,
            matched_groups: vec![],
            matched_legitimacy: vec![],
        }
    }
}

// ============================================================================
// STAGE OUTCOMES
// ============================================================================

/// Outcome of the domain-blacklist stage. The orchestrator - not the stage -
/// decides whether to continue (never-block-on-collaborator-failure is an
/// explicit policy here, not a swallowed exception).
#[derive(Debug, Clone)]
pub enum DomainStage {
    /// Blacklist hit - decisive, short-circuits the pipeline
    Hit(Verdict),
    /// Domain known, not blacklisted
    Miss,
    /// Stage could not run (no url, malformed url, oracle failure)
    Skipped(&'static str),
}

/// Outcome of the lexical stage
#[derive(Debug, Clone)]
pub struct LexicalStage {
    pub breakdown: LexicalBreakdown,
    /// Set when risk level is high/medium - decisive
    pub decisive: Option<Verdict>,
}

// ============================================================================
// VERDICT
// ============================================================================

/// Result of one classification call. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub is_fraud: bool,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub score: f64,
    pub method: DetectionMethod,
    /// Deterministic audit text, fixed priority order
    pub reasons: Vec<String>,
    pub needs_manual_review: bool,
}

impl Default for Verdict {
    fn default() -> Self {
        Self {
            is_fraud: false,
            risk_level: RiskLevel::Unknown,
            confidence: 0.0,
            score: 0.0,
            method: DetectionMethod::Error,
            reasons: vec![],
            needs_manual_review: true,
        }
    }
}
