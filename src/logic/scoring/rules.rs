//! Fraud Lexicon & Risk Mapping Rules
//!
//! Định nghĩa keyword groups và risk cutoffs cho lexical scoring.
//! KHÔNG chứa logic classify - chỉ constants và config.

use serde::{Deserialize, Serialize};

// ============================================================================
// RISK CUTOFFS (evaluated high → low on the normalized score)
// ============================================================================

/// At or above this = High risk (decisive fraud)
pub const HIGH_RISK_CUTOFF: f64 = 0.7;

/// At or above this = Medium risk (decisive fraud, reduced confidence)
pub const MEDIUM_RISK_CUTOFF: f64 = 0.4;

/// At or above this = Low risk, below = Very Low
pub const LOW_RISK_CUTOFF: f64 = 0.2;

/// Confidence factor for medium-risk verdicts
pub const MEDIUM_CONFIDENCE_FACTOR: f64 = 0.8;

/// Confidence assigned to a domain blacklist hit
pub const DOMAIN_HIT_CONFIDENCE: f64 = 0.95;

/// Confidence assigned to an inconclusive fallback verdict
pub const INCONCLUSIVE_CONFIDENCE: f64 = 0.1;

// ============================================================================
// KEYWORD GROUPS
// ============================================================================

/// One weighted keyword group. Matching is case-insensitive substring
/// containment; match_ratio = matched / keywords.len().
#[derive(Debug, Clone)]
pub struct PatternGroup {
    pub name: &'static str,
    pub weight: f64,
    pub keywords: &'static [&'static str],
}

/// Fraud indicator groups, declared in reason-priority order:
/// salary > payment > communication > urgency > vagueness > company.
pub const FRAUD_PATTERNS: &[PatternGroup] = &[
    PatternGroup {
        name: "unrealistic_salary",
        weight: 0.9,
        keywords: &["earn $", "guaranteed", "per day", "unlimited income", "make money fast"],
    },
    PatternGroup {
        name: "upfront_payment",
        weight: 0.85,
        keywords: &["registration fee", "processing fee", "training fee", "starter kit", "pay upfront"],
    },
    PatternGroup {
        name: "suspicious_communication",
        weight: 0.7,
        keywords: &["whatsapp", "telegram", "contact us on", "personal email"],
    },
    PatternGroup {
        name: "urgency_tactics",
        weight: 0.6,
        keywords: &["immediately", "act now", "urgent", "limited positions"],
    },
    PatternGroup {
        name: "vague_description",
        weight: 0.5,
        keywords: &["no experience", "anyone can apply", "simple tasks", "work from home"],
    },
    PatternGroup {
        name: "company_legitimacy",
        weight: 0.4,
        keywords: &["no interview", "instant hire", "cash only"],
    },
];

/// Legitimacy indicator groups (absolute weights, subtracted from the
/// fraud score).
pub const LEGITIMACY_PATTERNS: &[PatternGroup] = &[
    PatternGroup {
        name: "professional_requirements",
        weight: 0.8,
        keywords: &["years experience", "degree", "qualifications", "skills required"],
    },
    PatternGroup {
        name: "compensation_details",
        weight: 0.6,
        keywords: &["benefits", "401k", "health insurance", "salary range"],
    },
    PatternGroup {
        name: "company_presence",
        weight: 0.5,
        keywords: &["company culture", "about us", "our mission", "careers page"],
    },
];

// ============================================================================
// CONFIGURABLE RULES (for runtime adjustment)
// ============================================================================

/// Risk cutoffs for classification (configurable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRules {
    /// At or above this = High
    pub high_cutoff: f64,
    /// At or above this = Medium
    pub medium_cutoff: f64,
    /// At or above this = Low, below = VeryLow
    pub low_cutoff: f64,
    /// Confidence factor applied to medium verdicts
    pub medium_confidence_factor: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            high_cutoff: HIGH_RISK_CUTOFF,
            medium_cutoff: MEDIUM_RISK_CUTOFF,
            low_cutoff: LOW_RISK_CUTOFF,
            medium_confidence_factor: MEDIUM_CONFIDENCE_FACTOR,
        }
    }
}

impl ScoringRules {
    /// High sensitivity - lower cutoffs, more fraud flags
    pub fn high_sensitivity() -> Self {
        Self {
            high_cutoff: 0.6,
            medium_cutoff: 0.3,
            ..Default::default()
        }
    }

    /// Low sensitivity - higher cutoffs, fewer fraud flags
    pub fn low_sensitivity() -> Self {
        Self {
            high_cutoff: 0.8,
            medium_cutoff: 0.5,
            ..Default::default()
        }
    }
}
