use crate::error::HoldingsError;
use crate::holding::{HoldingRecord, InstrumentKind};

/// In-memory holdings table, keyed by fund name. Last write wins.
#[derive(Debug, Clone, Default)]
pub struct HoldingsStore {
    rows: Vec<HoldingRecord>,
}

impl HoldingsStore {
    pub fn new() -> HoldingsStore {
        HoldingsStore { rows: Vec::new() }
    }

    /// Builds a store from a loaded holdings file. A fund listed twice is
    /// rejected rather than silently collapsed onto its last row.
    pub fn from_records(records: Vec<HoldingRecord>) -> Result<HoldingsStore, HoldingsError> {
        let mut store = HoldingsStore::new();
        for record in records {
            if let Some(previous) = store.upsert(record) {
                return Err(HoldingsError::DuplicateFund(previous.get_name().to_string()));
            }
        }
        Ok(store)
    }

    pub fn list(&self) -> &[HoldingRecord] {
        &self.rows
    }

    #[cfg(test)]
    pub fn get(&self, fund_name: &str) -> Option<&HoldingRecord> {
        self.rows.iter().find(|r| r.get_name() == fund_name)
    }

    /// Inserts a row or replaces the row with the same fund name, keeping its
    /// position. Returns the replaced row.
    pub fn upsert(&mut self, record: HoldingRecord) -> Option<HoldingRecord> {
        match self.rows.iter().position(|r| r.get_name() == record.get_name()) {
            Some(i) => Some(std::mem::replace(&mut self.rows[i], record)),
            None => {
                self.rows.push(record);
                None
            }
        }
    }

    pub fn remove(&mut self, fund_name: &str) -> Option<HoldingRecord> {
        let i = self.rows.iter().position(|r| r.get_name() == fund_name)?;
        Some(self.rows.remove(i))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct proxy symbols in row order.
    pub fn proxy_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for row in &self.rows {
            let symbol = row.get_proxy_symbol();
            if !symbols.iter().any(|s| s == symbol) {
                symbols.push(symbol.to_string());
            }
        }
        symbols
    }

    /// A small mixed portfolio for trying the tool without a holdings file.
    pub fn demo() -> HoldingsStore {
        use InstrumentKind::{OffExchange, OnExchange};

        let rows = [
            ("Grid Equipment A", "012345", OffExchange, "sz399808", 15, 1.15, 1.2189, 20000.0),
            ("Oil & Gas ETF", "513350", OnExchange, "513350", 2, 1.43, 1.4026, 10000.0),
            ("CSI A500 Feeder", "019000", OffExchange, "sh000300", 3, 1.245, 1.2414, 30000.0),
            ("Semiconductor Select", "005678", OffExchange, "512480", 45, 1.35, 1.6878, 10000.0),
            ("Gold Feeder", "000216", OffExchange, "518880", 5, 3.85, 3.6984, 5000.0),
            ("STAR 50 Feeder", "588000", OffExchange, "588000", 2, 1.0, 0.98, 20000.0),
        ];

        let mut store = HoldingsStore::new();
        for (name, code, kind, proxy, days, cost, nav, shares) in rows {
            if let Ok(record) = HoldingRecord::new(name, kind, proxy, days, cost, nav, shares) {
                store.upsert(record.with_fund_code(code));
            }
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, days: i64) -> HoldingRecord {
        HoldingRecord::new(name, InstrumentKind::OffExchange, "510300", days, 1.0, 1.0, 100.0).unwrap()
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut store = HoldingsStore::new();
        assert!(store.upsert(record("A", 1)).is_none());
        assert!(store.upsert(record("B", 2)).is_none());

        let old = store.upsert(record("A", 9)).unwrap();
        assert_eq!(old.get_holding_days(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.list()[0].get_name(), "A");
        assert_eq!(store.get("A").unwrap().get_holding_days(), 9);
    }

    #[test]
    fn test_remove() {
        let mut store = HoldingsStore::from_records(vec![record("A", 1), record("B", 2)]).unwrap();
        assert_eq!(store.remove("A").unwrap().get_name(), "A");
        assert!(store.remove("A").is_none());
        assert_eq!(store.len(), 1);
        assert!(store.get("A").is_none());
    }

    #[test]
    fn test_from_records_rejects_duplicate_fund() {
        let lots = vec![record("Gold", 1), record("B", 2), record("Gold", 40)];
        match HoldingsStore::from_records(lots) {
            Err(HoldingsError::DuplicateFund(name)) => assert_eq!(name, "Gold"),
            other => panic!("expected duplicate fund error, got {other:?}"),
        }
    }

    #[test]
    fn test_proxy_symbols_are_distinct() {
        let store = HoldingsStore::from_records(vec![record("A", 1), record("B", 2)]).unwrap();
        assert_eq!(store.proxy_symbols(), vec!["510300".to_string()]);
    }

    #[test]
    fn test_demo_is_complete() {
        let store = HoldingsStore::demo();
        assert_eq!(store.len(), 6);
        assert_eq!(store.get("Oil & Gas ETF").unwrap().get_kind(), InstrumentKind::OnExchange);
    }
}
