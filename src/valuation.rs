//! Intraday NAV estimation.
//!
//! An off-exchange fund publishes its NAV after the close, so during the
//! session its move is estimated from a proxy: `prior_nav` scaled by the
//! proxy's change times a damping factor for tracking error.

use crate::fee::{self, FeeStatus};
use crate::holding::{HoldingRecord, InstrumentKind};
use crate::quotes::QuoteSnapshot;
use crate::store::HoldingsStore;

pub const DEFAULT_DAMPING_FACTOR: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationParams {
    pub damping_factor: f64,
}

impl Default for ValuationParams {
    fn default() -> Self {
        Self {
            damping_factor: DEFAULT_DAMPING_FACTOR,
        }
    }
}

/// A holding with its estimated valuation and fee tier. Rebuilt on every
/// refresh, never edited.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub holding: HoldingRecord,
    pub live_change_pct: f64,
    pub estimated_nav: f64,
    pub market_value: f64,
    pub estimated_pnl_pct: f64,
    pub fee_status: FeeStatus,
    pub fee_rate_pct: f64,
    pub unlock_progress: f64,
    pub days_until_free: u32,
}

impl DerivedRow {
    pub fn kind(&self) -> InstrumentKind {
        self.holding.get_kind()
    }

    /// Mark-to-market move since the last confirmed NAV.
    pub fn daily_pnl(&self) -> f64 {
        self.market_value - self.holding.prior_value()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.market_value - self.holding.total_cost()
    }
}

pub fn estimate_nav(prior_nav: f64, live_change_pct: f64, damping_factor: f64) -> f64 {
    prior_nav * (1.0 + live_change_pct / 100.0 * damping_factor)
}

/// Values one holding given its already-resolved proxy change. The record
/// guarantees positive cost basis and prior NAV.
pub fn value_holding(record: &HoldingRecord, live_change_pct: f64, params: &ValuationParams) -> DerivedRow {
    let live_change_pct = if live_change_pct.is_finite() { live_change_pct } else { 0.0 };
    let estimated_nav = estimate_nav(record.get_prior_nav(), live_change_pct, params.damping_factor);
    let market_value = estimated_nav * record.get_shares();
    let cost_basis = record.get_cost_basis();
    let estimated_pnl_pct = (estimated_nav - cost_basis) / cost_basis * 100.0;
    let assessment = fee::assess(record.get_kind(), record.get_holding_days());

    DerivedRow {
        holding: record.clone(),
        live_change_pct,
        estimated_nav,
        market_value,
        estimated_pnl_pct,
        fee_status: assessment.status,
        fee_rate_pct: assessment.fee_rate_pct,
        unlock_progress: assessment.unlock_progress,
        days_until_free: assessment.days_until_free,
    }
}

/// Values every row of the store against one quote snapshot.
pub fn derive_rows(store: &HoldingsStore, quotes: &QuoteSnapshot, params: &ValuationParams) -> Vec<DerivedRow> {
    store
        .list()
        .iter()
        .map(|record| value_holding(record, quotes.change_or_zero(record.get_proxy_symbol()), params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid_fund() -> HoldingRecord {
        HoldingRecord::new("Grid Equipment A", InstrumentKind::OffExchange, "sz399808", 15, 1.15, 1.2189, 20000.0)
            .unwrap()
    }

    #[test]
    fn test_estimated_nav_applies_damping() {
        let row = value_holding(&grid_fund(), 2.0, &ValuationParams::default());
        assert!((row.estimated_nav - 1.2189 * 1.019).abs() < 1e-12);
        assert!((row.estimated_nav - 1.2420591).abs() < 1e-6);
        assert!((row.market_value - row.estimated_nav * 20000.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimated_pnl_against_cost_basis() {
        let row = value_holding(&grid_fund(), 2.0, &ValuationParams::default());
        let expected = (row.estimated_nav - 1.15) / 1.15 * 100.0;
        assert!((row.estimated_pnl_pct - expected).abs() < 1e-12);
        assert!((row.estimated_pnl_pct - 8.01).abs() < 0.01);
        assert_eq!(row.fee_status, FeeStatus::Warned);
        assert_eq!(row.fee_rate_pct, 0.5);
    }

    #[test]
    fn test_missing_quote_keeps_prior_nav() {
        let store = HoldingsStore::from_records(vec![grid_fund()]).unwrap();
        let rows = derive_rows(&store, &QuoteSnapshot::new(), &ValuationParams::default());
        assert_eq!(rows[0].live_change_pct, 0.0);
        assert_eq!(rows[0].estimated_nav, 1.2189);
        assert_eq!(rows[0].daily_pnl(), 0.0);
    }

    #[test]
    fn test_resolves_by_proxy_symbol() {
        let store = HoldingsStore::from_records(vec![grid_fund()]).unwrap();
        let quotes: QuoteSnapshot = [("sz399808".to_string(), -1.0)].into_iter().collect();
        let rows = derive_rows(&store, &quotes, &ValuationParams::default());
        assert_eq!(rows[0].live_change_pct, -1.0);
        assert!(rows[0].daily_pnl() < 0.0);
    }

    #[test]
    fn test_damping_is_configurable() {
        let params = ValuationParams { damping_factor: 1.0 };
        let row = value_holding(&grid_fund(), 2.0, &params);
        assert!((row.estimated_nav - 1.2189 * 1.02).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_change_counts_as_flat() {
        let row = value_holding(&grid_fund(), f64::NAN, &ValuationParams::default());
        assert_eq!(row.estimated_nav, 1.2189);
    }

    proptest! {
        #[test]
        fn prop_valuation_is_idempotent(change in -20.0f64..20.0, days in 0i64..400) {
            let record = HoldingRecord::new("P", InstrumentKind::OffExchange, "510300", days, 1.3, 1.25, 1000.0).unwrap();
            let store = HoldingsStore::from_records(vec![record]).unwrap();
            let quotes: QuoteSnapshot = [("510300".to_string(), change)].into_iter().collect();
            let params = ValuationParams::default();
            prop_assert_eq!(derive_rows(&store, &quotes, &params), derive_rows(&store, &quotes, &params));
        }

        #[test]
        fn prop_fee_ignores_price(change in -20.0f64..20.0, days in 0i64..400) {
            let record = HoldingRecord::new("P", InstrumentKind::OffExchange, "510300", days, 1.3, 1.25, 1000.0).unwrap();
            let moved = value_holding(&record, change, &ValuationParams::default());
            let flat = value_holding(&record, 0.0, &ValuationParams::default());
            prop_assert_eq!(moved.fee_status, flat.fee_status);
            prop_assert_eq!(moved.fee_rate_pct, flat.fee_rate_pct);
            prop_assert_eq!(moved.unlock_progress, flat.unlock_progress);
        }
    }
}
