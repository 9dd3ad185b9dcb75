//! SQLite Store
//!
//! Default durable store: feedback archive, mined patterns, committed rule
//! sets. Whole records are stored as JSON payloads (rebuilt on read); the
//! columns used by queries are kept alongside.

use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use super::memory::summarize;
use super::{ClassificationRules, PersistenceStore, RuleType, StoreError, StoreResult};
use crate::logic::learning::types::{FalsePositivePattern, Feedback};
use crate::logic::model::metrics::PerformanceMetrics;

const DB_FILE_NAME: &str = "fraudguard.db";

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open the store at the default app-data location
    pub fn open_default() -> StoreResult<Self> {
        Self::open(&DEFAULT_DB_PATH)
    }

    /// Fully in-memory database (tests)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS user_feedback (
                classification_id TEXT NOT NULL,
                timestamp_ms      INTEGER NOT NULL,
                was_correct       INTEGER NOT NULL,
                system_positive   INTEGER NOT NULL,
                payload           TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_feedback_ts ON user_feedback(timestamp_ms);

            CREATE TABLE IF NOT EXISTS fp_patterns (
                id         TEXT PRIMARY KEY,
                domain     TEXT NOT NULL,
                payload    TEXT NOT NULL,
                created_ms INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS classification_rules (
                rule_type  TEXT PRIMARY KEY,
                payload    TEXT NOT NULL,
                updated_ms INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }
}

static DEFAULT_DB_PATH: Lazy<PathBuf> = Lazy::new(|| {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("FraudGuard")
        .join(DB_FILE_NAME)
});

impl PersistenceStore for SqliteStore {
    fn store_user_feedback(&self, feedback: &Feedback) -> StoreResult<()> {
        let payload = serde_json::to_string(feedback)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO user_feedback
             (classification_id, timestamp_ms, was_correct, system_positive, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feedback.classification_id,
                feedback.timestamp.timestamp_millis(),
                feedback.was_correct as i64,
                feedback.system_classification.is_positive() as i64,
                payload,
            ],
        )?;
        Ok(())
    }

    fn store_false_positive_pattern(&self, pattern: &FalsePositivePattern) -> StoreResult<()> {
        let payload = serde_json::to_string(pattern)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO fp_patterns (id, domain, payload, created_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                pattern.id,
                pattern.domain,
                payload,
                pattern.created_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn get_learning_patterns(&self) -> StoreResult<Vec<FalsePositivePattern>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT payload FROM fp_patterns ORDER BY created_ms DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut patterns = Vec::new();
        for payload in rows {
            match serde_json::from_str(&payload?) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => log::warn!("Skipping unreadable pattern row: {}", e),
            }
        }
        Ok(patterns)
    }

    fn get_classification_rules(&self) -> StoreResult<Vec<ClassificationRules>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT rule_type, payload FROM classification_rules")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut rule_sets = Vec::new();
        for row in rows {
            let (type_str, payload) = row?;
            let Some(rule_type) = RuleType::from_str(&type_str) else {
                log::warn!("Skipping unknown rule type: {}", type_str);
                continue;
            };
            match serde_json::from_str(&payload) {
                Ok(rules) => rule_sets.push(ClassificationRules { rule_type, rules }),
                Err(e) => log::warn!("Skipping unreadable {} rules: {}", type_str, e),
            }
        }
        Ok(rule_sets)
    }

    fn update_classification_rules(
        &self,
        rule_type: RuleType,
        payload: serde_json::Value,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO classification_rules (rule_type, payload, updated_ms)
             VALUES (?1, ?2, ?3)",
            params![
                rule_type.as_str(),
                payload.to_string(),
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn get_user_feedback_history(&self, limit: usize) -> StoreResult<Vec<Feedback>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT payload FROM user_feedback ORDER BY timestamp_ms DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, String>(0))?;

        let mut history = Vec::new();
        for payload in rows {
            match serde_json::from_str(&payload?) {
                Ok(feedback) => history.push(feedback),
                Err(e) => log::warn!("Skipping unreadable feedback row: {}", e),
            }
        }
        Ok(history)
    }

    fn get_performance_metrics(
        &self,
        window_ms: Option<i64>,
    ) -> StoreResult<Option<PerformanceMetrics>> {
        let cutoff = window_ms
            .map(|w| Utc::now().timestamp_millis() - w)
            .unwrap_or(i64::MIN);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT payload FROM user_feedback WHERE timestamp_ms >= ?1",
        )?;
        let rows = stmt.query_map(params![cutoff], |row| row.get::<_, String>(0))?;

        let mut feedback = Vec::new();
        for payload in rows {
            if let Ok(fb) = serde_json::from_str::<Feedback>(&payload?) {
                feedback.push(fb);
            }
        }

        let refs: Vec<&Feedback> = feedback.iter().collect();
        Ok(summarize(&refs))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::learning::types::{FeedbackSource, PageClass, UrlPattern};
    use std::collections::HashMap;

    fn feedback(id: &str, correct: bool) -> Feedback {
        Feedback {
            classification_id: id.to_string(),
            url: "https://jobs.example.com/posting/9".to_string(),
            system_classification: PageClass::Fraudulent,
            user_classification: if correct {
                PageClass::Fraudulent
            } else {
                PageClass::Legitimate
            },
            was_correct: correct,
            system_confidence: 0.85,
            features: HashMap::from([("caps_ratio".to_string(), 0.4)]),
            source: FeedbackSource::Correction,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_feedback_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        store.store_user_feedback(&feedback("a", true)).unwrap();
        store.store_user_feedback(&feedback("b", false)).unwrap();

        let history = store.get_user_feedback_history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert!((history[0].features["caps_ratio"] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_metrics_from_feedback() {
        let store = SqliteStore::in_memory().unwrap();
        store.store_user_feedback(&feedback("a", true)).unwrap();
        store.store_user_feedback(&feedback("b", true)).unwrap();
        store.store_user_feedback(&feedback("c", false)).unwrap();

        let metrics = store
            .get_performance_metrics(Some(60_000))
            .unwrap()
            .unwrap();
        assert!((metrics.accuracy - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.total_samples, 3);
    }

    #[test]
    fn test_rules_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let payload = serde_json::json!({ "feature_weights": { "caps_ratio": 0.2 } });
        store
            .update_classification_rules(RuleType::Weights, payload.clone())
            .unwrap();
        // Overwrite is an upsert, not a duplicate
        store
            .update_classification_rules(RuleType::Weights, payload)
            .unwrap();

        let rules = store.get_classification_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule_type, RuleType::Weights);
    }

    #[test]
    fn test_pattern_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let pattern = FalsePositivePattern::new(
            "jobs.example.com".to_string(),
            vec![UrlPattern {
                pattern: "careers".to_string(),
                confidence: 0.7,
            }],
            "batch_url_mining",
            0.7,
        );
        store.store_false_positive_pattern(&pattern).unwrap();

        let patterns = store.get_learning_patterns().unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].domain, "jobs.example.com");
    }

    #[test]
    fn test_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fraudguard.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.store_user_feedback(&feedback("a", true)).unwrap();
        }

        // Reopen - data survives
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_user_feedback_history(10).unwrap().len(), 1);
    }
}
