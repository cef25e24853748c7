//! Cached, fault-tolerant quote refresh.
//!
//! A refresh never fails: fetch errors, timeouts and unmatched identifiers
//! come back as warnings and the affected proxies resolve to no movement.

use super::manual::ManualQuotes;
use super::{QuoteSnapshot, QuoteSource};
use crate::error::QuoteError;
use chrono::{DateTime, Local};
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct QuoteService {
    source: Box<dyn QuoteSource>,
    cache: Cache<String, f64>,
    timeout: Duration,
    overrides: ManualQuotes,
}

/// Result of one refresh cycle.
#[derive(Debug, Clone)]
pub struct Refresh {
    pub snapshot: QuoteSnapshot,
    pub warnings: Vec<String>,
    pub fetched_at: DateTime<Local>,
    /// Identifiers served from the cache rather than the source.
    pub cached: usize,
}

impl QuoteService {
    pub fn new(
        source: Box<dyn QuoteSource>,
        ttl: Duration,
        timeout: Duration,
        overrides: ManualQuotes,
    ) -> Self {
        Self {
            source,
            cache: Cache::builder().time_to_live(ttl).max_capacity(1000).build(),
            timeout,
            overrides,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Resolves `identifiers`, serving fresh cache entries unless `force`.
    /// Manual overrides win over fetched values.
    pub async fn refresh(&self, identifiers: &[String], force: bool) -> Refresh {
        let mut snapshot = QuoteSnapshot::new();
        let mut warnings = Vec::new();
        let mut missing = Vec::new();
        let mut cached = 0;

        for id in dedup(identifiers) {
            if !force {
                if let Some(pct) = self.cache.get(&id).await {
                    snapshot.insert(&id, pct);
                    cached += 1;
                    continue;
                }
            }
            missing.push(id);
        }

        // proxies the user typed in need no upstream call
        let to_fetch: Vec<String> = missing
            .iter()
            .filter(|id| self.overrides.get(id).is_none())
            .cloned()
            .collect();

        if !to_fetch.is_empty() {
            debug!(
                "Fetching {} proxies from {} ({} cached)",
                to_fetch.len(),
                self.source.name(),
                cached
            );
            match self.fetch_with_timeout(&to_fetch).await {
                Ok(fetched) => {
                    for id in &to_fetch {
                        match fetched.get(id) {
                            Some(pct) => {
                                self.cache.insert(id.clone(), pct).await;
                                snapshot.insert(id, pct);
                            }
                            None => {
                                warn!("No quote for {id} from {}", self.source.name());
                                warnings.push(format!("No quote for {id}, assuming 0.00%"));
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Quote refresh from {} failed: {e}", self.source.name());
                    warnings.push(format!(
                        "Quote refresh from {} failed ({e}), assuming 0.00% for {} proxies",
                        self.source.name(),
                        to_fetch.len()
                    ));
                }
            }
        }

        snapshot.merge(self.overrides.snapshot_for(identifiers));

        info!(
            "Refreshed {} of {} proxies",
            snapshot.len(),
            dedup(identifiers).len()
        );
        Refresh {
            snapshot,
            warnings,
            fetched_at: Local::now(),
            cached,
        }
    }

    async fn fetch_with_timeout(&self, identifiers: &[String]) -> Result<QuoteSnapshot, QuoteError> {
        match tokio::time::timeout(self.timeout, self.source.fetch(identifiers)).await {
            Ok(result) => result,
            Err(_) => Err(QuoteError::Timeout(self.timeout.as_secs())),
        }
    }
}

fn dedup(identifiers: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(identifiers.len());
    for id in identifiers {
        if !seen.contains(id) {
            seen.push(id.clone());
        }
    }
    seen
}
