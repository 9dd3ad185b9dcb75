//! FraudEngine Facade
//!
//! Owns the live model and wires the pipeline together: scoring reads
//! immutable `Arc<ModelState>` snapshots, learning publishes replacements by
//! swapping the Arc. In-flight classifications finish against their captured
//! snapshot; readers are never blocked by adaptation.
//!
//! Caller-facing operations never return errors: `classify` always yields a
//! Verdict and `process_feedback` always yields a receipt. Collaborator
//! failures degrade to last-known-good state and are logged.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::constants::{is_batch_learning_enabled, REGRESSION_TOLERANCE, VALIDATION_WINDOW_MS};
use crate::error::{EngineError, EngineResult};
use crate::logic::features::{FeatureProvider, TextStatsProvider};
use crate::logic::learning::batch::{build_candidate, mine, BatchOutcome};
use crate::logic::learning::buffer::BufferStatus;
use crate::logic::learning::engine::LearningEngine;
use crate::logic::learning::types::{
    Feedback, FeedbackReceipt, RollbackConsideration,
};
use crate::logic::model::metrics::PerformanceMetrics;
use crate::logic::model::state::ModelState;
use crate::logic::oracle::DomainOracle;
use crate::logic::persistence::{PersistenceStore, RuleType};
use crate::logic::scoring::engine::ScoringEngine;
use crate::logic::scoring::types::Verdict;

// ============================================================================
// STATUS
// ============================================================================

/// Engine lifecycle / adaptation status, surfaced through diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Initializing,
    /// Persisted rules loaded and applied
    Ready,
    /// Store empty or unreachable at startup, running on defaults
    ReadyWithDefaults,
    /// Critical adaptation in progress
    Adapting,
    /// Batch candidate under validation
    BatchValidating,
    /// Last batch candidate committed
    Committed,
    /// Last batch candidate discarded for regressing accuracy
    RolledBack,
}

/// Full diagnostic snapshot returned by `model_state`
#[derive(Debug, Clone, Serialize)]
pub struct ModelSnapshot {
    pub state: ModelState,
    pub metrics: PerformanceMetrics,
    pub buffer: BufferStatus,
    pub status: EngineStatus,
    pub rollback_considerations: Vec<RollbackConsideration>,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct FraudEngine {
    scoring: ScoringEngine,
    state: RwLock<Arc<ModelState>>,
    learning: Mutex<LearningEngine>,
    store: Arc<dyn PersistenceStore>,
    oracle: Arc<dyn DomainOracle>,
    features: Box<dyn FeatureProvider>,
    status: RwLock<EngineStatus>,
    batch_running: AtomicBool,
}

impl FraudEngine {
    /// Build the engine over a store and a blacklist oracle, with the
    /// built-in text-stats feature provider.
    pub fn new(store: Arc<dyn PersistenceStore>, oracle: Arc<dyn DomainOracle>) -> Arc<Self> {
        Self::with_provider(store, oracle, Box::new(TextStatsProvider))
    }

    pub fn with_provider(
        store: Arc<dyn PersistenceStore>,
        oracle: Arc<dyn DomainOracle>,
        features: Box<dyn FeatureProvider>,
    ) -> Arc<Self> {
        let mut state = ModelState::default();
        let status = match store.get_classification_rules() {
            Ok(rule_sets) if !rule_sets.is_empty() => {
                state.apply_rules(&rule_sets);
                log::info!("Loaded {} persisted rule set(s)", rule_sets.len());
                EngineStatus::Ready
            }
            Ok(_) => {
                log::info!("No persisted rules, starting with defaults");
                EngineStatus::ReadyWithDefaults
            }
            Err(e) => {
                // A broken store never blocks startup
                log::warn!("Rule load failed ({}), starting with defaults", e);
                EngineStatus::ReadyWithDefaults
            }
        };

        Arc::new(Self {
            scoring: ScoringEngine::new(),
            state: RwLock::new(Arc::new(state)),
            learning: Mutex::new(LearningEngine::new()),
            store,
            oracle,
            features,
            status: RwLock::new(status),
            batch_running: AtomicBool::new(false),
        })
    }

    // ========================================================================
    // CLASSIFICATION
    // ========================================================================

    /// Classify one page. Lock-free read path: the snapshot is captured once
    /// and concurrent adaptation cannot affect this call.
    pub fn classify(&self, text: &str, url: Option<&str>) -> Verdict {
        let snapshot = self.state.read().clone();
        self.scoring.classify(text, url, &snapshot, self.oracle.as_ref())
    }

    /// Extract the documented feature set from raw text, for embedders
    /// building feedback without their own analyzer
    pub fn extract_features(&self, text: &str) -> std::collections::HashMap<String, f64> {
        self.features.extract(text)
    }

    // ========================================================================
    // FEEDBACK
    // ========================================================================

    /// Process one user feedback. Always returns a receipt; archive failures
    /// and collaborator outages are logged, never surfaced.
    ///
    /// Critical feedback adapts the model synchronously - the weight delta is
    /// observable before this call returns. Reaching buffer capacity kicks
    /// off a background batch pass.
    pub fn process_feedback(self: &Arc<Self>, mut feedback: Feedback) -> FeedbackReceipt {
        if !(0.0..=1.0).contains(&feedback.system_confidence) {
            let err = EngineError::MalformedInput(format!(
                "confidence {:.3} out of range",
                feedback.system_confidence
            ));
            log::warn!("{} on feedback {}, clamping", err, feedback.classification_id);
            feedback.system_confidence = feedback.system_confidence.clamp(0.0, 1.0);
        }

        if let Err(e) = self.store.store_user_feedback(&feedback) {
            // Archive is best-effort; learning proceeds from memory
            log::warn!("Feedback archive failed: {}", e);
        }

        let mut learning = self.learning.lock();
        let outcome = learning.ingest(&feedback);

        if outcome.critical {
            let prior = *self.status.read();
            *self.status.write() = EngineStatus::Adapting;
            let snapshot = self.state.read().clone();
            let (next, pattern) = learning.apply_critical(&snapshot, &feedback);
            *self.state.write() = Arc::new(next);
            // Back to the ready state we were in before the nudge
            self.restore_status(EngineStatus::Adapting, prior);

            if let Some(pattern) = pattern {
                log::info!(
                    "Critical feedback produced false-positive pattern for {}",
                    pattern.domain
                );
                if let Err(e) = self.store.store_false_positive_pattern(&pattern) {
                    log::warn!("Pattern persist failed: {}", e);
                }
            }
        }
        drop(learning);

        if outcome.buffer_full && is_batch_learning_enabled() {
            self.spawn_batch();
        }

        FeedbackReceipt {
            processed: true,
            adaptation_triggered: outcome.critical || outcome.buffer_full,
            current_accuracy: outcome.accuracy,
            timestamp: Utc::now(),
        }
    }

    // ========================================================================
    // BATCH LEARNING
    // ========================================================================

    /// Run one batch pass on the calling thread. No-op when a pass is
    /// already in flight - at most one batch runs at a time.
    pub fn run_batch_now(&self) -> BatchOutcome {
        if self
            .batch_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Batch already running, skipping");
            return BatchOutcome::default();
        }

        let outcome = self.run_batch_inner();
        self.batch_running.store(false, Ordering::SeqCst);
        outcome
    }

    fn spawn_batch(self: &Arc<Self>) {
        if self
            .batch_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let engine = Arc::clone(self);
        std::thread::spawn(move || {
            let outcome = engine.run_batch_inner();
            engine.batch_running.store(false, Ordering::SeqCst);
            log::info!(
                "Background batch finished: {} feedback(s), committed={}, rolled_back={}",
                outcome.feedback_count,
                outcome.committed,
                outcome.rolled_back
            );
        });
    }

    fn run_batch_inner(&self) -> BatchOutcome {
        let entries = self.learning.lock().buffer().unprocessed();
        if entries.is_empty() {
            return BatchOutcome::default();
        }

        let mut outcome = BatchOutcome {
            feedback_count: entries.len(),
            ..Default::default()
        };

        let snapshot = self.state.read().clone();
        let learning_rate = self.learning.lock().learning_rate();
        let stats = mine(&entries);
        let (mut candidate, patterns) = build_candidate(&snapshot, &stats, learning_rate);
        outcome.patterns_mined = patterns.len();

        let prior = *self.status.read();
        *self.status.write() = EngineStatus::BatchValidating;
        match self.validate_candidate() {
            Ok(()) => {
                candidate.last_update = Utc::now();
                *self.state.write() = Arc::new(candidate);
                self.persist_committed(&patterns);
                *self.status.write() = EngineStatus::Committed;
                outcome.committed = true;
            }
            Err(EngineError::ValidationRegression { baseline, observed }) => {
                let record = RollbackConsideration {
                    at: Utc::now(),
                    baseline_accuracy: baseline,
                    observed_accuracy: observed,
                    feedback_count: entries.len(),
                };
                self.learning.lock().record_rollback(record);
                *self.status.write() = EngineStatus::RolledBack;
                outcome.rolled_back = true;
            }
            Err(e) => {
                // Validation summary unavailable: keep the previous committed
                // state, not counted as a rollback
                log::warn!("Batch validation skipped: {}", e);
                self.restore_status(EngineStatus::BatchValidating, prior);
            }
        }

        // Entries are consumed either way; stale processed ones get evicted
        let ids: HashSet<String> = entries
            .iter()
            .map(|fb| fb.classification_id.clone())
            .collect();
        let mut learning = self.learning.lock();
        learning.buffer_mut().mark_processed(&ids);
        learning.buffer_mut().evict_stale(Utc::now());

        outcome
    }

    /// Check the stored rolling summary against pre-batch live accuracy.
    /// A summary more than the tolerance below baseline rejects the
    /// candidate.
    fn validate_candidate(&self) -> EngineResult<()> {
        let summary = self
            .store
            .get_performance_metrics(Some(VALIDATION_WINDOW_MS))
            .map_err(|e| EngineError::CollaboratorUnavailable(e.to_string()))?
            .ok_or_else(|| {
                EngineError::CollaboratorUnavailable("no stored summary to validate against".into())
            })?;

        let baseline = self.learning.lock().metrics().accuracy;
        let observed = summary.accuracy;
        if observed < baseline - REGRESSION_TOLERANCE {
            return Err(EngineError::ValidationRegression { baseline, observed });
        }
        Ok(())
    }

    /// Persist the three rule payloads and mined patterns. Failures leave
    /// the in-memory state governing, just not durable yet.
    fn persist_committed(&self, patterns: &[crate::logic::learning::types::FalsePositivePattern]) {
        let state = self.state.read().clone();

        let writes = [
            (RuleType::Weights, state.weights_payload()),
            (RuleType::Thresholds, state.thresholds_payload()),
            (RuleType::DomainRules, state.domain_rules_payload()),
        ];
        for (rule_type, payload) in writes {
            if let Err(e) = self.store.update_classification_rules(rule_type, payload) {
                let err = EngineError::PersistenceFailure(e.to_string());
                log::warn!("{} rules not persisted: {}", rule_type.as_str(), err);
            }
        }

        for pattern in patterns {
            if let Err(e) = self.store.store_false_positive_pattern(pattern) {
                log::warn!("Mined pattern not persisted: {}", e);
            }
        }
    }

    /// Put `prior` back only while the status still reads `expected`; a
    /// concurrent writer that got there first keeps its value.
    fn restore_status(&self, expected: EngineStatus, prior: EngineStatus) {
        let mut status = self.status.write();
        if *status == expected {
            *status = prior;
        }
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    pub fn status(&self) -> EngineStatus {
        *self.status.read()
    }

    /// Full diagnostic snapshot: model state, live metrics, buffer status,
    /// rollback considerations
    pub fn model_state(&self) -> ModelSnapshot {
        let learning = self.learning.lock();
        ModelSnapshot {
            state: (**self.state.read()).clone(),
            metrics: learning.metrics(),
            buffer: learning.buffer_status(),
            status: *self.status.read(),
            rollback_considerations: learning.rollbacks().to_vec(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::learning::types::{FeedbackSource, PageClass};
    use crate::logic::oracle::BlacklistOracle;
    use crate::logic::persistence::memory::MemoryStore;
    use std::collections::HashMap;

    fn engine_with(store: Arc<MemoryStore>) -> Arc<FraudEngine> {
        FraudEngine::new(store, Arc::new(BlacklistOracle::new()))
    }

    fn feedback(url: &str, correct: bool, confidence: f64) -> Feedback {
        Feedback {
            classification_id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            system_classification: PageClass::Fraudulent,
            user_classification: if correct {
                PageClass::Fraudulent
            } else {
                PageClass::Legitimate
            },
            was_correct: correct,
            system_confidence: confidence,
            features: HashMap::from([("caps_ratio".to_string(), 0.6)]),
            source: FeedbackSource::Correction,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_store_starts_with_defaults() {
        let engine = engine_with(Arc::new(MemoryStore::new()));
        assert_eq!(engine.status(), EngineStatus::ReadyWithDefaults);
        assert!((engine.model_state().state.weights_sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_persisted_rules_are_loaded() {
        let store = Arc::new(MemoryStore::new());
        store
            .update_classification_rules(
                RuleType::Weights,
                serde_json::json!({ "feature_weights": { "caps_ratio": 0.3 } }),
            )
            .unwrap();

        let engine = engine_with(store);
        assert_eq!(engine.status(), EngineStatus::Ready);
        assert!(
            (engine.model_state().state.feature_weights["caps_ratio"] - 0.3).abs() < 1e-9
        );
    }

    #[test]
    fn test_broken_store_still_starts() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);

        let engine = engine_with(store);
        assert_eq!(engine.status(), EngineStatus::ReadyWithDefaults);

        // Classification and feedback both keep working
        let verdict = engine.classify("Earn $9999 guaranteed, pay a registration fee now", None);
        assert!(verdict.is_fraud);
        let receipt = engine.process_feedback(feedback("https://a.example/x", true, 0.9));
        assert!(receipt.processed);
    }

    #[test]
    fn test_critical_feedback_adapts_synchronously() {
        let engine = engine_with(Arc::new(MemoryStore::new()));
        let before = engine.model_state().state;

        let receipt = engine.process_feedback(feedback("https://a.example/x", false, 0.9));

        assert!(receipt.adaptation_triggered);
        let after = engine.model_state().state;
        assert!(after.feature_weights["caps_ratio"] < before.feature_weights["caps_ratio"]);
        assert!(after.last_update > before.last_update);
    }

    #[test]
    fn test_out_of_range_confidence_is_clamped() {
        let engine = engine_with(Arc::new(MemoryStore::new()));
        let receipt = engine.process_feedback(feedback("https://a.example/x", true, 3.5));
        assert!(receipt.processed);
        assert!(!receipt.adaptation_triggered);
    }

    #[test]
    fn test_status_restore_yields_to_concurrent_writer() {
        let engine = engine_with(Arc::new(MemoryStore::new()));

        *engine.status.write() = EngineStatus::Adapting;
        engine.restore_status(EngineStatus::Adapting, EngineStatus::ReadyWithDefaults);
        assert_eq!(engine.status(), EngineStatus::ReadyWithDefaults);

        // A batch that finished in between keeps its outcome
        *engine.status.write() = EngineStatus::Committed;
        engine.restore_status(EngineStatus::Adapting, EngineStatus::ReadyWithDefaults);
        assert_eq!(engine.status(), EngineStatus::Committed);
    }

    #[test]
    fn test_batch_guard_skips_concurrent_pass() {
        let engine = engine_with(Arc::new(MemoryStore::new()));
        engine.process_feedback(feedback("https://a.example/x", true, 0.5));

        engine.batch_running.store(true, Ordering::SeqCst);
        let outcome = engine.run_batch_now();
        assert_eq!(outcome.feedback_count, 0);
        assert!(!outcome.committed);
        engine.batch_running.store(false, Ordering::SeqCst);

        let outcome = engine.run_batch_now();
        assert_eq!(outcome.feedback_count, 1);
    }

    #[test]
    fn test_batch_without_stored_summary_skips_commit() {
        // Store archives fail silently, so no rolling summary exists
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(Arc::clone(&store));
        store.set_failing(true);

        engine.process_feedback(feedback("https://a.example/x", true, 0.5));
        store.set_failing(false);
        assert_eq!(store.feedback_count(), 0);

        let before = engine.model_state().state.last_update;
        let outcome = engine.run_batch_now();

        assert!(!outcome.committed);
        assert!(!outcome.rolled_back);
        assert_eq!(engine.model_state().state.last_update, before);
        // Entries were consumed regardless
        assert_eq!(engine.model_state().buffer.unprocessed, 0);
    }
}
