//! Proxy quote sources.
//!
//! Every source maps the identifiers found in the holdings table (proxy
//! symbols) to a signed percentage change for the current session.
//! Identifiers a source cannot resolve are simply absent from the result.

use crate::error::QuoteError;
use async_trait::async_trait;
use std::collections::HashMap;

pub mod eastmoney;
pub mod manual;
pub mod service;
pub mod sina;
pub mod yahoo;

#[cfg(test)]
mod test_server;

pub use service::{QuoteService, Refresh};

/// Identifier -> percentage change (`1.25` means +1.25%).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSnapshot {
    changes: HashMap<String, f64>,
}

impl QuoteSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-finite values are dropped so they can never reach the valuation.
    pub fn insert(&mut self, identifier: &str, change_pct: f64) {
        if change_pct.is_finite() {
            self.changes.insert(identifier.to_string(), change_pct);
        }
    }

    pub fn get(&self, identifier: &str) -> Option<f64> {
        self.changes.get(identifier).copied()
    }

    /// Missing identifiers mean "no movement".
    pub fn change_or_zero(&self, identifier: &str) -> f64 {
        self.get(identifier).unwrap_or(0.0)
    }

    pub fn merge(&mut self, other: QuoteSnapshot) {
        self.changes.extend(other.changes);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl FromIterator<(String, f64)> for QuoteSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut snapshot = QuoteSnapshot::new();
        for (identifier, change) in iter {
            snapshot.insert(&identifier, change);
        }
        snapshot
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches changes for `identifiers`. Unresolved identifiers are left
    /// out of the snapshot; an `Err` means the whole call failed.
    async fn fetch(&self, identifiers: &[String]) -> Result<QuoteSnapshot, QuoteError>;
}

/// Domestic exchange a fund code is listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Shanghai,
    Shenzhen,
}

impl Market {
    /// Prefix used by the plain-text quote feed.
    pub fn prefix(&self) -> &'static str {
        match self {
            Market::Shanghai => "sh",
            Market::Shenzhen => "sz",
        }
    }

    /// Market id used by the JSON snapshot endpoint.
    pub fn secid(&self) -> u8 {
        match self {
            Market::Shanghai => 1,
            Market::Shenzhen => 0,
        }
    }

    /// Codes starting with 5 or 6 trade in Shanghai, 0, 1 or 3 in Shenzhen.
    pub fn infer(code: &str) -> Option<Market> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        match code.as_bytes()[0] {
            b'5' | b'6' => Some(Market::Shanghai),
            b'0' | b'1' | b'3' => Some(Market::Shenzhen),
            _ => None,
        }
    }
}

/// A listed code with its market, e.g. `sh510300`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedSymbol {
    pub market: Market,
    pub code: String,
}

impl ListedSymbol {
    /// Accepts bare numeric codes (market inferred) and codes already
    /// carrying an `sh`/`sz` prefix.
    pub fn parse(identifier: &str) -> Option<ListedSymbol> {
        let trimmed = identifier.trim();
        let lower = trimmed.to_ascii_lowercase();
        let (market, code) = if let Some(code) = lower.strip_prefix("sh") {
            (Market::Shanghai, code)
        } else if let Some(code) = lower.strip_prefix("sz") {
            (Market::Shenzhen, code)
        } else {
            (Market::infer(&lower)?, lower.as_str())
        };
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(ListedSymbol {
            market,
            code: code.to_string(),
        })
    }

    pub fn feed_symbol(&self) -> String {
        format!("{}{}", self.market.prefix(), self.code)
    }

    pub fn secid(&self) -> String {
        format!("{}.{}", self.market.secid(), self.code)
    }
}

/// Percent change from prior close to current price. A zero current price
/// means the instrument has not traded yet today and counts as no move.
pub fn change_pct(prior_close: f64, current: f64) -> Option<f64> {
    if !(prior_close.is_finite() && prior_close > 0.0) || !current.is_finite() {
        return None;
    }
    let current = if current == 0.0 { prior_close } else { current };
    Some((current - prior_close) / prior_close * 100.0)
}
