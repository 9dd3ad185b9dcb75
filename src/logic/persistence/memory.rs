//! In-Memory Store
//!
//! Backing store for tests and embedders without a database. Supports
//! failure injection so degraded-store behavior is testable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::Mutex;

use super::{ClassificationRules, PersistenceStore, RuleType, StoreError, StoreResult};
use crate::logic::learning::types::{FalsePositivePattern, Feedback};
use crate::logic::model::metrics::PerformanceMetrics;

#[derive(Default)]
pub struct MemoryStore {
    feedback: Mutex<Vec<Feedback>>,
    patterns: Mutex<Vec<FalsePositivePattern>>,
    rules: Mutex<HashMap<String, serde_json::Value>>,
    fail_all: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every store call fail until re-enabled
    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.lock().len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.lock().len()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PersistenceStore for MemoryStore {
    fn store_user_feedback(&self, feedback: &Feedback) -> StoreResult<()> {
        self.check_available()?;
        self.feedback.lock().push(feedback.clone());
        Ok(())
    }

    fn store_false_positive_pattern(&self, pattern: &FalsePositivePattern) -> StoreResult<()> {
        self.check_available()?;
        self.patterns.lock().push(pattern.clone());
        Ok(())
    }

    fn get_learning_patterns(&self) -> StoreResult<Vec<FalsePositivePattern>> {
        self.check_available()?;
        Ok(self.patterns.lock().clone())
    }

    fn get_classification_rules(&self) -> StoreResult<Vec<ClassificationRules>> {
        self.check_available()?;
        let rules = self.rules.lock();
        Ok(rules
            .iter()
            .filter_map(|(key, payload)| {
                RuleType::from_str(key).map(|rule_type| ClassificationRules {
                    rule_type,
                    rules: payload.clone(),
                })
            })
            .collect())
    }

    fn update_classification_rules(
        &self,
        rule_type: RuleType,
        payload: serde_json::Value,
    ) -> StoreResult<()> {
        self.check_available()?;
        self.rules
            .lock()
            .insert(rule_type.as_str().to_string(), payload);
        Ok(())
    }

    fn get_user_feedback_history(&self, limit: usize) -> StoreResult<Vec<Feedback>> {
        self.check_available()?;
        let feedback = self.feedback.lock();
        Ok(feedback.iter().rev().take(limit).cloned().collect())
    }

    fn get_performance_metrics(
        &self,
        window_ms: Option<i64>,
    ) -> StoreResult<Option<PerformanceMetrics>> {
        self.check_available()?;
        let feedback = self.feedback.lock();

        let cutoff = window_ms.map(|w| Utc::now().timestamp_millis() - w);
        let rows: Vec<&Feedback> = feedback
            .iter()
            .filter(|fb| match cutoff {
                Some(cutoff) => fb.timestamp.timestamp_millis() >= cutoff,
                None => true,
            })
            .collect();

        Ok(summarize(&rows))
    }
}

/// Compute a performance summary from raw feedback rows
pub(crate) fn summarize(rows: &[&Feedback]) -> Option<PerformanceMetrics> {
    if rows.is_empty() {
        return None;
    }

    let total = rows.len() as f64;
    let mut correct = 0u64;
    let mut tp = 0u64;
    let mut fp = 0u64;
    let mut fn_ = 0u64;

    for fb in rows {
        let positive = fb.system_classification.is_positive();
        if fb.was_correct {
            correct += 1;
            if positive {
                tp += 1;
            }
        } else if positive {
            fp += 1;
        } else {
            fn_ += 1;
        }
    }

    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        1.0
    };
    let recall = if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        1.0
    };

    Some(PerformanceMetrics {
        accuracy: correct as f64 / total,
        precision,
        recall,
        false_positive_rate: fp as f64 / total,
        false_negative_rate: fn_ as f64 / total,
        total_samples: rows.len() as u64,
        last_calculated: Utc::now(),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::learning::types::{FeedbackSource, PageClass};
    use std::collections::HashMap;

    fn feedback(correct: bool, system: PageClass) -> Feedback {
        Feedback {
            classification_id: uuid::Uuid::new_v4().to_string(),
            url: "https://jobs.example.com/x".to_string(),
            system_classification: system,
            user_classification: if correct { system } else { PageClass::Legitimate },
            was_correct: correct,
            system_confidence: 0.9,
            features: HashMap::new(),
            source: FeedbackSource::Correction,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_roundtrip_and_history_order() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let mut fb = feedback(true, PageClass::Fraudulent);
            fb.classification_id = format!("id-{}", i);
            store.store_user_feedback(&fb).unwrap();
        }

        let history = store.get_user_feedback_history(3).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].classification_id, "id-4");
    }

    #[test]
    fn test_metrics_summary() {
        let store = MemoryStore::new();
        store.store_user_feedback(&feedback(true, PageClass::Fraudulent)).unwrap();
        store.store_user_feedback(&feedback(true, PageClass::Legitimate)).unwrap();
        store.store_user_feedback(&feedback(false, PageClass::Fraudulent)).unwrap();
        store.store_user_feedback(&feedback(false, PageClass::Legitimate)).unwrap();

        let metrics = store.get_performance_metrics(None).unwrap().unwrap();
        assert!((metrics.accuracy - 0.5).abs() < 1e-9);
        assert!((metrics.false_positive_rate - 0.25).abs() < 1e-9);
        assert!((metrics.false_negative_rate - 0.25).abs() < 1e-9);
        assert_eq!(metrics.total_samples, 4);
    }

    #[test]
    fn test_empty_store_has_no_metrics() {
        let store = MemoryStore::new();
        assert!(store.get_performance_metrics(None).unwrap().is_none());
    }

    #[test]
    fn test_failure_injection() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(store.store_user_feedback(&feedback(true, PageClass::Fraudulent)).is_err());

        store.set_failing(false);
        assert!(store.store_user_feedback(&feedback(true, PageClass::Fraudulent)).is_ok());
    }
}
