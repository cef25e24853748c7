//! Bulk JSON market snapshot.
//!
//! A single GET with `secids=1.510300,0.159915` returns
//! `{"data":{"diff":[{"f12":"510300","f13":1,"f3":1.25}]}}`, where `f3` is
//! the percent change and `f12`/`f13` identify code and market.

use super::{ListedSymbol, QuoteSnapshot, QuoteSource};
use crate::error::QuoteError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const SNAPSHOT_URL: &str = "https://push2.eastmoney.com/api/qt/ulist.np/get";
const FIELDS: &str = "f12,f13,f3";

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    data: Option<SnapshotData>,
}

#[derive(Debug, Deserialize)]
struct SnapshotData {
    #[serde(default)]
    diff: Vec<SnapshotRow>,
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    f12: String,
    f13: Option<u8>,
    /// Percent change; the endpoint sends `"-"` for suspended instruments.
    f3: Option<serde_json::Value>,
}

pub struct EastmoneySnapshot {
    client: Client,
    url: String,
}

impl EastmoneySnapshot {
    pub fn new(timeout: Duration) -> Result<Self, QuoteError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: SNAPSHOT_URL.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: &str) -> Self {
        self.url = format!("{}/api/qt/ulist.np/get", url.trim_end_matches('/'));
        self
    }
}

/// Parses a snapshot body into secid (`1.510300`) -> percent change.
pub fn parse_snapshot(body: &str) -> Result<HashMap<String, f64>, QuoteError> {
    let response: SnapshotResponse =
        serde_json::from_str(body).map_err(|e| QuoteError::Parse(e.to_string()))?;

    let mut changes = HashMap::new();
    let Some(data) = response.data else {
        return Ok(changes);
    };
    for row in data.diff {
        let pct = match row.f3 {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let (Some(market), Some(pct)) = (row.f13, pct) {
            if pct.is_finite() {
                changes.insert(format!("{}.{}", market, row.f12), pct);
            }
        }
    }
    Ok(changes)
}

#[async_trait]
impl QuoteSource for EastmoneySnapshot {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    async fn fetch(&self, identifiers: &[String]) -> Result<QuoteSnapshot, QuoteError> {
        let mut by_secid: HashMap<String, Vec<&String>> = HashMap::new();
        for identifier in identifiers {
            if let Some(listed) = ListedSymbol::parse(identifier) {
                by_secid.entry(listed.secid()).or_default().push(identifier);
            } else {
                debug!("{identifier} has no domestic market prefix, skipping");
            }
        }

        let mut snapshot = QuoteSnapshot::new();
        if by_secid.is_empty() {
            return Ok(snapshot);
        }

        let secids: Vec<&str> = by_secid.keys().map(String::as_str).collect();
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("secids", secids.join(",").as_str()),
                ("fields", FIELDS),
                ("fltt", "2"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QuoteError::Status(response.status()));
        }
        let body = response.text().await?;

        for (secid, pct) in parse_snapshot(&body)? {
            if let Some(ids) = by_secid.get(&secid) {
                for id in ids {
                    snapshot.insert(id, pct);
                }
            }
        }
        Ok(snapshot)
    }
}
