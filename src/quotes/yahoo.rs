//! Yahoo Finance source for proxies outside the domestic exchanges,
//! e.g. `GLD` or `^GSPC`.

use super::{change_pct, QuoteSnapshot, QuoteSource};
use crate::error::QuoteError;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;
use yahoo_finance_api as yahoo;

pub struct YahooSource {
    connector: yahoo::YahooConnector,
}

impl YahooSource {
    pub fn new() -> Result<Self, QuoteError> {
        Ok(Self {
            connector: yahoo::YahooConnector::new()?,
        })
    }

    // Change between the last two daily closes.
    async fn daily_change(&self, symbol: &str) -> Result<Option<f64>, QuoteError> {
        let response = self.connector.get_quote_range(symbol, "1d", "5d").await?;
        let quotes = response.quotes()?;
        Ok(last_two_closes_change(&quotes.iter().map(|q| q.close).collect::<Vec<_>>()))
    }
}

fn last_two_closes_change(closes: &[f64]) -> Option<f64> {
    match closes {
        [.., prev, last] => change_pct(*prev, *last),
        _ => None,
    }
}

#[async_trait]
impl QuoteSource for YahooSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch(&self, identifiers: &[String]) -> Result<QuoteSnapshot, QuoteError> {
        let tasks = identifiers.iter().map(|id| self.daily_change(id));
        let results = join_all(tasks).await;

        let mut snapshot = QuoteSnapshot::new();
        let mut errors = Vec::new();
        for (identifier, result) in identifiers.iter().zip(results) {
            match result {
                Ok(Some(pct)) => snapshot.insert(identifier, pct),
                Ok(None) => warn!("Not enough closes returned for {identifier}"),
                Err(e) => {
                    warn!("Error getting quote for {identifier}: {e}");
                    errors.push(e);
                }
            }
        }

        if snapshot.is_empty() && !errors.is_empty() && errors.len() == identifiers.len() {
            if let Some(e) = errors.into_iter().next() {
                return Err(e);
            }
        }
        Ok(snapshot)
    }
}
