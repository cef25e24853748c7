//! Plain-text quote feed.
//!
//! One request returns one line per symbol:
//! `var hq_str_sh510300="name,open,prior_close,current,high,low,...";`

use super::{change_pct, ListedSymbol, QuoteSnapshot, QuoteSource};
use crate::error::QuoteError;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const FEED_URL: &str = "https://hq.sinajs.cn/list=";
const FEED_REFERER: &str = "https://finance.sina.com.cn";
const BATCH_SIZE: usize = 50;

const PRIOR_CLOSE_FIELD: usize = 2;
const CURRENT_FIELD: usize = 3;

pub struct SinaFeed {
    client: Client,
    base_url: String,
}

impl SinaFeed {
    pub fn new(timeout: Duration) -> Result<Self, QuoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(FEED_REFERER));
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: FEED_URL.to_string(),
        })
    }

    /// Points the feed at another host, e.g. a local test server.
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = format!("{}/list=", url.trim_end_matches('/'));
        self
    }

    async fn fetch_batch(&self, symbols: &[String]) -> Result<HashMap<String, f64>, QuoteError> {
        let url = format!("{}{}", self.base_url, symbols.join(","));
        debug!("Requesting {} symbols from quote feed", symbols.len());
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(QuoteError::Status(response.status()));
        }
        // The feed is GBK encoded; only the ASCII numeric fields matter here.
        let body = response.bytes().await?;
        Ok(parse_feed(&String::from_utf8_lossy(&body)))
    }
}

/// Parses a feed body into feed symbol -> percent change. Lines that are
/// empty, truncated or carry an unusable prior close are skipped.
pub fn parse_feed(body: &str) -> HashMap<String, f64> {
    let mut changes = HashMap::new();
    for line in body.lines() {
        let Some((head, payload)) = line.split_once('=') else {
            continue;
        };
        let Some(symbol) = head.trim().strip_prefix("var hq_str_") else {
            continue;
        };
        let payload = payload.trim().trim_end_matches(';').trim_matches('"');
        let fields: Vec<&str> = payload.split(',').collect();
        if fields.len() <= CURRENT_FIELD {
            continue;
        }
        let prior = fields[PRIOR_CLOSE_FIELD].trim().parse::<f64>();
        let current = fields[CURRENT_FIELD].trim().parse::<f64>();
        if let (Ok(prior), Ok(current)) = (prior, current) {
            if let Some(pct) = change_pct(prior, current) {
                changes.insert(symbol.to_string(), pct);
            }
        }
    }
    changes
}

#[async_trait]
impl QuoteSource for SinaFeed {
    fn name(&self) -> &'static str {
        "sina"
    }

    async fn fetch(&self, identifiers: &[String]) -> Result<QuoteSnapshot, QuoteError> {
        let mut by_feed_symbol: HashMap<String, Vec<&String>> = HashMap::new();
        for identifier in identifiers {
            match ListedSymbol::parse(identifier) {
                Some(listed) => by_feed_symbol
                    .entry(listed.feed_symbol())
                    .or_default()
                    .push(identifier),
                None => debug!("{identifier} has no domestic market prefix, skipping"),
            }
        }

        let mut snapshot = QuoteSnapshot::new();
        if by_feed_symbol.is_empty() {
            return Ok(snapshot);
        }

        let symbols: Vec<String> = by_feed_symbol.keys().cloned().collect();
        let batches: Vec<&[String]> = symbols.chunks(BATCH_SIZE).collect();
        let results = join_all(batches.iter().map(|batch| self.fetch_batch(batch))).await;

        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(changes) => {
                    for (symbol, pct) in changes {
                        if let Some(ids) = by_feed_symbol.get(&symbol) {
                            for id in ids {
                                snapshot.insert(id, pct);
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Quote feed batch failed: {e}");
                    errors.push(e);
                }
            }
        }

        // tolerate partial failure; only error if every batch failed
        if snapshot.is_empty() && errors.len() == batches.len() {
            if let Some(e) = errors.into_iter().next() {
                return Err(e);
            }
        }
        Ok(snapshot)
    }
}
