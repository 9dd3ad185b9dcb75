//! Feature Keys & Provider
//!
//! **Closed, documented feature key set** - feedback feature maps are typed
//! `name → number` over these keys; unknown keys are explicitly ignored,
//! never silently trusted.
//!
//! The real density/structural extractor lives in the page-analysis layer
//! (external collaborator). `TextStatsProvider` is a deterministic stand-in
//! so embedders without it still produce well-formed feedback.

use std::collections::HashMap;

use super::scoring::rules::FRAUD_PATTERNS;

// ============================================================================
// FEATURE LAYOUT
// ============================================================================

/// The closed feature key set, in canonical order.
pub const FEATURE_KEYS: &[&str] = &[
    "keyword_density",
    "caps_ratio",
    "exclamation_density",
    "contact_channel_score",
    "salary_figure_score",
    "urgency_score",
    "link_density",
    "text_length_norm",
];

/// Number of features in the layout
pub const FEATURE_COUNT: usize = FEATURE_KEYS.len();

/// Check whether a feature name belongs to the documented key set
pub fn is_known_feature(name: &str) -> bool {
    FEATURE_KEYS.contains(&name)
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Maps page/text to numeric signals. Deterministic for identical input.
pub trait FeatureProvider: Send + Sync {
    fn extract(&self, text: &str) -> HashMap<String, f64>;
}

// ============================================================================
// TEXT STATS PROVIDER
// ============================================================================

/// Simple deterministic provider computing the full key set from raw text.
#[derive(Debug, Clone, Default)]
pub struct TextStatsProvider;

impl FeatureProvider for TextStatsProvider {
    fn extract(&self, text: &str) -> HashMap<String, f64> {
        let lower = text.to_lowercase();
        let words = lower.split_whitespace().count().max(1) as f64;

        let letters = text.chars().filter(|c| c.is_alphabetic()).count().max(1) as f64;
        let uppercase = text.chars().filter(|c| c.is_uppercase()).count() as f64;

        let exclamations = text.matches('!').count() as f64;
        let links = lower.matches("http").count() as f64;

        // Fraud keyword hits across all groups
        let mut keyword_hits = 0usize;
        let mut urgency_hits = 0usize;
        let mut urgency_total = 1usize;
        for group in FRAUD_PATTERNS {
            let hits = group.keywords.iter().filter(|k| lower.contains(*k)).count();
            keyword_hits += hits;
            if group.name == "urgency_tactics" {
                urgency_hits = hits;
                urgency_total = group.keywords.len();
            }
        }

        let contact_channel = if lower.contains("whatsapp") || lower.contains("telegram") {
            1.0
        } else if lower.contains('@') {
            0.5
        } else {
            0.0
        };

        // "$<digit>" occurrences, saturating at 3
        let salary_figures = lower
            .match_indices('$')
            .filter(|(i, _)| {
                lower[i + 1..].chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false)
            })
            .count() as f64;

        let mut features = HashMap::new();
        features.insert("keyword_density".to_string(), (keyword_hits as f64 / words).min(1.0));
        features.insert("caps_ratio".to_string(), (uppercase / letters).min(1.0));
        features.insert("exclamation_density".to_string(), (exclamations / words).min(1.0));
        features.insert("contact_channel_score".to_string(), contact_channel);
        features.insert("salary_figure_score".to_string(), (salary_figures / 3.0).min(1.0));
        features.insert("urgency_score".to_string(), urgency_hits as f64 / urgency_total as f64);
        features.insert("link_density".to_string(), (links / words).min(1.0));
        features.insert("text_length_norm".to_string(), (words / 500.0).min(1.0));
        features
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_closed() {
        assert_eq!(FEATURE_COUNT, 8);
        assert!(is_known_feature("caps_ratio"));
        assert!(!is_known_feature("made_up_signal"));
    }

    #[test]
    fn test_provider_emits_full_key_set() {
        let provider = TextStatsProvider;
        let features = provider.extract("Earn $5000 NOW! Contact us on WhatsApp immediately");

        for key in FEATURE_KEYS {
            let value = features.get(*key).copied().unwrap_or(-1.0);
            assert!((0.0..=1.0).contains(&value), "{} out of range: {}", key, value);
        }

        assert!(features["contact_channel_score"] >= 1.0);
        assert!(features["salary_figure_score"] > 0.0);
        assert!(features["exclamation_density"] > 0.0);
    }

    #[test]
    fn test_provider_is_deterministic() {
        let provider = TextStatsProvider;
        let a = provider.extract("Standard job with benefits and a degree requirement");
        let b = provider.extract("Standard job with benefits and a degree requirement");
        assert_eq!(a, b);
    }
}
