//! Domain Oracle - Blacklist Lookups
//!
//! Mục đích: exact-match blacklist check cho stage 1 của pipeline.
//! Advisory, not authoritative - một outage không bao giờ block classification.
//!
//! `BlacklistOracle` giữ in-memory set, hỗ trợ sync từ plain-text feeds.

use std::collections::HashSet;

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;

// ============================================================================
// FEED SOURCES
// ============================================================================

/// Plain-text blacklist feeds (one domain per line, '#' comments)
pub const FEED_SOURCES: &[FeedSource] = &[
    FeedSource {
        name: "URLhaus",
        url: "https://urlhaus.abuse.ch/downloads/hostfile/",
        enabled: true,
    },
    FeedSource {
        name: "Custom",
        url: "",
        enabled: false,
    },
];

#[derive(Debug, Clone)]
pub struct FeedSource {
    pub name: &'static str,
    pub url: &'static str,
    pub enabled: bool,
}

// ============================================================================
// ORACLE TRAIT
// ============================================================================

/// Blacklist lookup result
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OracleVerdict {
    pub is_fraudulent: bool,
    pub domain: String,
    pub source: Option<String>,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// External blacklist oracle. Fails fast; advisory, not authoritative.
pub trait DomainOracle: Send + Sync {
    fn is_fraudulent(&self, domain: &str) -> Result<OracleVerdict, OracleError>;
}

// ============================================================================
// BLACKLIST ORACLE
// ============================================================================

/// In-memory exact-match blacklist with optional feed sync
pub struct BlacklistOracle {
    domains: RwLock<HashSet<String>>,
    last_sync: RwLock<Option<i64>>,
}

impl BlacklistOracle {
    pub fn new() -> Self {
        Self {
            domains: RwLock::new(HashSet::new()),
            last_sync: RwLock::new(None),
        }
    }

    pub fn with_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = domains
            .into_iter()
            .map(|d| d.into().to_lowercase())
            .collect();
        Self {
            domains: RwLock::new(set),
            last_sync: RwLock::new(None),
        }
    }

    pub fn add_domain(&self, domain: &str) {
        self.domains.write().insert(domain.to_lowercase());
    }

    pub fn remove_domain(&self, domain: &str) {
        self.domains.write().remove(&domain.to_lowercase());
    }

    pub fn len(&self) -> usize {
        self.domains.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.read().is_empty()
    }

    /// Timestamp (unix seconds) of the last successful feed sync
    pub fn last_sync(&self) -> Option<i64> {
        *self.last_sync.read()
    }

    /// Sync every enabled feed source. Per-feed failures are logged and
    /// skipped - the feeds are advisory. Returns the total entries added.
    pub fn sync_all(&self) -> usize {
        let mut added = 0;
        for feed in FEED_SOURCES.iter().filter(|f| f.enabled && !f.url.is_empty()) {
            match self.sync_from_feed(feed.url) {
                Ok(n) => added += n,
                Err(e) => log::warn!("Feed {} sync failed: {}", feed.name, e),
            }
        }
        added
    }

    /// Sync domains from a plain-text feed (blocking network I/O).
    /// Returns the number of entries added.
    pub fn sync_from_feed(&self, url: &str) -> Result<usize, OracleError> {
        let body = ureq::get(url)
            .timeout(std::time::Duration::from_secs(10))
            .call()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?
            .into_string()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        let mut added = 0;
        let mut domains = self.domains.write();
        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            // hostfile format: "127.0.0.1 bad.example" or bare domain
            let domain = line.split_whitespace().last().unwrap_or(line);
            if domain.contains('.') && domains.insert(domain.to_lowercase()) {
                added += 1;
            }
        }
        drop(domains);

        *self.last_sync.write() = Some(Utc::now().timestamp());
        log::info!("Blacklist feed sync: {} new domains from {}", added, url);
        Ok(added)
    }
}

impl Default for BlacklistOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainOracle for BlacklistOracle {
    fn is_fraudulent(&self, domain: &str) -> Result<OracleVerdict, OracleError> {
        let hit = self.domains.read().contains(&domain.to_lowercase());
        Ok(OracleVerdict {
            is_fraudulent: hit,
            domain: domain.to_lowercase(),
            source: hit.then(|| "local_blacklist".to_string()),
        })
    }
}

// ============================================================================
// URL PARSING
// ============================================================================

/// Extract the lower-cased host from a url. Returns None for unparsable
/// input - the caller skips the domain stage instead of failing.
pub fn extract_domain(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() || url.contains(char::is_whitespace) {
        return None;
    }

    // Strip scheme
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };

    // Strip path / query / fragment
    let end = rest
        .find(['/', '?', '#'])
        .unwrap_or(rest.len());
    let authority = &rest[..end];

    // Strip userinfo and port
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host);

    if host.is_empty() || host.starts_with('.') || host.ends_with('.') {
        return None;
    }

    Some(host.to_lowercase())
}

// ============================================================================
// TESTS
// ============================================================================
