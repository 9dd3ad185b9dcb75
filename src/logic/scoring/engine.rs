//! Scoring Engine
//!
//! CHỈ chứa logic classify - không có types, không có learning.
//! Input: text, optional url, ModelState snapshot, DomainOracle
//! Output: Verdict
//!
//! Three ordered stages, first decisive stage wins:
//! 1. Domain blacklist (short-circuits on a hit)
//! 2. Weighted keyword scoring (decisive for high/medium risk)
//! 3. Inconclusive fallback (manual review)

use super::rules::{
    PatternGroup, ScoringRules, DOMAIN_HIT_CONFIDENCE, FRAUD_PATTERNS, INCONCLUSIVE_CONFIDENCE,
    LEGITIMACY_PATTERNS,
};
use super::types::{
    DetectionMethod, DomainStage, LexicalBreakdown, LexicalStage, RiskLevel, Verdict,
};
use crate::logic::model::state::ModelState;
use crate::logic::oracle::{extract_domain, DomainOracle};

// ============================================================================
// SCORING ENGINE
// ============================================================================

/// Stateless pipeline over immutable ModelState snapshots
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    rules: ScoringRules,
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: ScoringRules) -> Self {
        Self { rules }
    }

    /// Main classification function
    ///
    /// CORE LOGIC - Deterministic and Explainable. Never mutates state;
    /// tolerates non-normalized feature weights in the snapshot.
    pub fn classify(
        &self,
        text: &str,
        url: Option<&str>,
        state: &ModelState,
        oracle: &dyn DomainOracle,
    ) -> Verdict {
        let domain = url.and_then(extract_domain);
        if url.is_some() && domain.is_none() {
            log::debug!("Unparsable url, skipping domain stage");
        }

        // Stage 1: domain blacklist. A hit is never overridden downstream.
        match self.domain_stage(domain.as_deref(), oracle) {
            DomainStage::Hit(verdict) => return verdict,
            DomainStage::Miss => {}
            DomainStage::Skipped(reason) => {
                log::debug!("Domain stage skipped: {}", reason);
            }
        }

        // Stage 2: lexical scoring. Empty text means the stage cannot run.
        if text.trim().is_empty() {
            log::debug!("Empty text, skipping lexical stage");
            return inconclusive_verdict(LexicalBreakdown::default(), "Empty text", &self.rules);
        }

        let lexical = self.lexical_stage(text, domain.as_deref(), state);
        if let Some(verdict) = lexical.decisive {
            return verdict;
        }

        // Stage 3: inconclusive fallback, carrying stage 2 results for audit
        inconclusive_verdict(lexical.breakdown, "No stage was decisive", &self.rules)
    }

    /// Stage 1: query the blacklist oracle. Oracle failure is logged and
    /// ignored - an outage never blocks classification.
    fn domain_stage(&self, domain: Option<&str>, oracle: &dyn DomainOracle) -> DomainStage {
        let Some(domain) = domain else {
            return DomainStage::Skipped("no usable host");
        };

        match oracle.is_fraudulent(domain) {
            Ok(verdict) if verdict.is_fraudulent => {
                let source = verdict.source.unwrap_or_else(|| "blacklist".to_string());
                DomainStage::Hit(Verdict {
                    is_fraud: true,
                    risk_level: RiskLevel::High,
                    confidence: DOMAIN_HIT_CONFIDENCE,
                    score: 1.0,
                    method: DetectionMethod::DomainBlacklist,
                    reasons: vec![format!("Domain {} is blacklisted ({})", domain, source)],
                    needs_manual_review: false,
                })
            }
            Ok(_) => DomainStage::Miss,
            Err(e) => {
                log::warn!("Domain oracle unavailable: {}", e);
                DomainStage::Skipped("oracle failure")
            }
        }
    }

    /// Stage 2: weighted keyword scoring with a symmetric legitimacy pass
    fn lexical_stage(&self, text: &str, domain: Option<&str>, state: &ModelState) -> LexicalStage {
        let lower = text.to_lowercase();

        let (fraud_score, matched_groups) = score_groups(&lower, FRAUD_PATTERNS);
        let (legitimate_score, matched_legitimacy) = score_groups(&lower, LEGITIMACY_PATTERNS);

        let domain_bias = domain.map(|d| state.bias_for(d)).unwrap_or(0.0);
        let normalized_score =
            (fraud_score - legitimate_score + domain_bias).clamp(0.0, 1.0);

        let breakdown = LexicalBreakdown {
            fraud_score,
            legitimate_score,
            domain_bias,
            normalized_score,
            matched_groups: matched_groups.iter().map(|m| m.name.to_string()).collect(),
            matched_legitimacy: matched_legitimacy.iter().map(|m| m.name.to_string()).collect(),
        };

        let (risk_level, is_fraud, confidence) = map_risk(normalized_score, &self.rules);

        let decisive = matches!(risk_level, RiskLevel::High | RiskLevel::Medium).then(|| Verdict {
            is_fraud,
            risk_level,
            confidence,
            score: normalized_score,
            method: DetectionMethod::NlpAnalysis,
            reasons: build_reasons(&matched_groups, &matched_legitimacy, &breakdown, risk_level),
            needs_manual_review: confidence < state.thresholds.confidence,
        });

        LexicalStage { breakdown, decisive }
    }
}

// ============================================================================
// RISK MAPPING
// ============================================================================

/// Map a normalized score to (risk level, is_fraud, confidence).
/// Evaluated high → low.
pub fn map_risk(score: f64, rules: &ScoringRules) -> (RiskLevel, bool, f64) {
    if score >= rules.high_cutoff {
        (RiskLevel::High, true, score)
    } else if score >= rules.medium_cutoff {
        (RiskLevel::Medium, true, rules.medium_confidence_factor * score)
    } else if score >= rules.low_cutoff {
        (RiskLevel::Low, false, 1.0 - score)
    } else {
        (RiskLevel::VeryLow, false, 1.0 - score)
    }
}

// ============================================================================
// GROUP SCORING
// ============================================================================

/// One matched group with its match counts
struct GroupMatch {
    name: &'static str,
    matched: usize,
    total: usize,
}

/// Sum weight * match_ratio over all groups; groups are walked in declared
/// order, which doubles as the reason priority order.
fn score_groups(lower_text: &str, groups: &[PatternGroup]) -> (f64, Vec<GroupMatch>) {
    let mut score = 0.0;
    let mut matches = Vec::new();

    for group in groups {
        let matched = group
            .keywords
            .iter()
            .filter(|k| lower_text.contains(*k))
            .count();
        if matched == 0 {
            continue;
        }

        let match_ratio = matched as f64 / group.keywords.len() as f64;
        score += group.weight * match_ratio;
        matches.push(GroupMatch {
            name: group.name,
            matched,
            total: group.keywords.len(),
        });
    }

    (score, matches)
}

/// Deterministic audit text, fixed priority order:
/// salary > payment > communication > urgency > vagueness > company,
/// then legitimacy matches, then the final score line.
fn build_reasons(
    matched_groups: &[GroupMatch],
    matched_legitimacy: &[GroupMatch],
    breakdown: &LexicalBreakdown,
    risk_level: RiskLevel,
) -> Vec<String> {
    let mut reasons = Vec::new();

    for m in matched_groups {
        reasons.push(format!("Matched {} ({}/{} keywords)", m.name, m.matched, m.total));
    }
    for m in matched_legitimacy {
        reasons.push(format!(
            "Legitimacy signal {} ({}/{} keywords)",
            m.name, m.matched, m.total
        ));
    }
    if breakdown.domain_bias.abs() > f64::EPSILON {
        reasons.push(format!("Domain bias applied: {:+.2}", breakdown.domain_bias));
    }
    reasons.push(format!(
        "Final score: {:.2} ({} risk)",
        breakdown.normalized_score, risk_level
    ));

    reasons
}

fn inconclusive_verdict(breakdown: LexicalBreakdown, note: &str, rules: &ScoringRules) -> Verdict {
    let (risk_level, _, _) = map_risk(breakdown.normalized_score, rules);
    let mut reasons: Vec<String> = breakdown
        .matched_groups
        .iter()
        .map(|name| format!("Matched {}", name))
        .collect();
    reasons.push(format!(
        "{} - score {:.2}, escalated to manual review",
        note, breakdown.normalized_score
    ));

    Verdict {
        is_fraud: false,
        risk_level,
        confidence: INCONCLUSIVE_CONFIDENCE,
        score: breakdown.normalized_score,
        method: DetectionMethod::Inconclusive,
        reasons,
        needs_manual_review: true,
    }
}

// ============================================================================
// TESTS
// ============================================================================
