use super::{QuoteSnapshot, QuoteSource};
use crate::error::QuoteError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Changes typed in by the user, one number per proxy.
#[derive(Debug, Clone, Default)]
pub struct ManualQuotes {
    entries: HashMap<String, f64>,
}

impl ManualQuotes {
    pub fn new(entries: HashMap<String, f64>) -> Self {
        Self { entries }
    }

    pub fn set(&mut self, identifier: &str, change_pct: f64) {
        self.entries.insert(identifier.to_string(), change_pct);
    }

    pub fn get(&self, identifier: &str) -> Option<f64> {
        self.entries.get(identifier).copied()
    }

    /// Entries restricted to `identifiers`.
    pub fn snapshot_for(&self, identifiers: &[String]) -> QuoteSnapshot {
        identifiers
            .iter()
            .filter_map(|id| self.entries.get(id).map(|pct| (id.clone(), *pct)))
            .collect()
    }
}

/// Parses a `SYMBOL=PCT` argument, e.g. `sh000300=1.25`.
pub fn parse_entry(entry: &str) -> Option<(String, f64)> {
    let (symbol, pct) = entry.split_once('=')?;
    let symbol = symbol.trim();
    let pct = pct.trim().trim_end_matches('%').parse::<f64>().ok()?;
    if symbol.is_empty() || !pct.is_finite() {
        return None;
    }
    Some((symbol.to_string(), pct))
}

#[async_trait]
impl QuoteSource for ManualQuotes {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn fetch(&self, identifiers: &[String]) -> Result<QuoteSnapshot, QuoteError> {
        Ok(self.snapshot_for(identifiers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        assert_eq!(parse_entry("sh000300=1.25"), Some(("sh000300".to_string(), 1.25)));
        assert_eq!(parse_entry(" Gold = -0.5% "), Some(("Gold".to_string(), -0.5)));
        assert_eq!(parse_entry("missing"), None);
        assert_eq!(parse_entry("=1.0"), None);
        assert_eq!(parse_entry("x=abc"), None);
        assert_eq!(parse_entry("x=NaN"), None);
    }

    #[tokio::test]
    async fn test_fetch_returns_requested_entries() {
        let mut manual = ManualQuotes::default();
        manual.set("Semiconductor", 2.4);
        manual.set("Gold", -0.3);
        let snapshot = manual
            .fetch(&["Semiconductor".to_string(), "Oil".to_string()])
            .await
            .unwrap();
        assert_eq!(snapshot.get("Semiconductor"), Some(2.4));
        assert_eq!(snapshot.get("Gold"), None);
        assert_eq!(snapshot.len(), 1);
    }
}
