use crate::fee::FeeStatus;
use crate::holding::InstrumentKind;
use crate::valuation::DerivedRow;
use std::fmt;

pub const DEFAULT_UNDERWATER_PNL_PCT: f64 = 5.0;
pub const DEFAULT_VOLATILITY_TRIGGER_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvisoryThresholds {
    /// Loss (as a positive percentage) below which a free holding is flagged.
    pub underwater_pnl_pct: f64,
    /// Absolute proxy move that marks an exchange-traded holding as volatile.
    pub volatility_trigger_pct: f64,
}

impl Default for AdvisoryThresholds {
    fn default() -> Self {
        Self {
            underwater_pnl_pct: DEFAULT_UNDERWATER_PNL_PCT,
            volatility_trigger_pct: DEFAULT_VOLATILITY_TRIGGER_PCT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    HardLock,
    Underwater,
    Hold,
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Advice::HardLock => "hard lock, no action permitted",
            Advice::Underwater => "attention: under water outside lock window",
            Advice::Hold => "hold",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volatility {
    High,
    Normal,
}

impl fmt::Display for Volatility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Volatility::High => write!(f, "high-volatility trigger"),
            Volatility::Normal => write!(f, "normal"),
        }
    }
}

pub fn advise(row: &DerivedRow, thresholds: &AdvisoryThresholds) -> Advice {
    match row.fee_status {
        FeeStatus::Locked => Advice::HardLock,
        FeeStatus::Free if row.estimated_pnl_pct < -thresholds.underwater_pnl_pct => Advice::Underwater,
        _ => Advice::Hold,
    }
}

/// Only exchange-traded rows get a volatility tag.
pub fn volatility(row: &DerivedRow, thresholds: &AdvisoryThresholds) -> Option<Volatility> {
    if row.kind() != InstrumentKind::OnExchange {
        return None;
    }
    if row.live_change_pct.abs() > thresholds.volatility_trigger_pct {
        Some(Volatility::High)
    } else {
        Some(Volatility::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holding::HoldingRecord;
    use crate::valuation::{value_holding, ValuationParams};

    fn row(kind: InstrumentKind, days: i64, cost: f64, change: f64) -> DerivedRow {
        let record = HoldingRecord::new("T", kind, "510300", days, cost, 1.0, 100.0).unwrap();
        value_holding(&record, change, &ValuationParams::default())
    }

    #[test]
    fn test_locked_is_hard_lock_even_when_deep_under_water() {
        let t = AdvisoryThresholds::default();
        assert_eq!(advise(&row(InstrumentKind::OffExchange, 3, 2.0, 0.0), &t), Advice::HardLock);
    }

    #[test]
    fn test_free_under_water() {
        let t = AdvisoryThresholds::default();
        // nav 1.0 vs cost 1.1 is roughly -9%
        assert_eq!(advise(&row(InstrumentKind::OffExchange, 40, 1.1, 0.0), &t), Advice::Underwater);
        // -4.76% is inside the threshold
        assert_eq!(advise(&row(InstrumentKind::OffExchange, 40, 1.05, 0.0), &t), Advice::Hold);
    }

    #[test]
    fn test_warned_under_water_is_hold() {
        let t = AdvisoryThresholds::default();
        assert_eq!(advise(&row(InstrumentKind::OffExchange, 10, 1.5, 0.0), &t), Advice::Hold);
    }

    #[test]
    fn test_exempt_is_hold() {
        let t = AdvisoryThresholds::default();
        assert_eq!(advise(&row(InstrumentKind::OnExchange, 0, 2.0, 0.0), &t), Advice::Hold);
    }

    #[test]
    fn test_volatility_tag() {
        let t = AdvisoryThresholds::default();
        assert_eq!(volatility(&row(InstrumentKind::OnExchange, 1, 1.0, -2.5), &t), Some(Volatility::High));
        assert_eq!(volatility(&row(InstrumentKind::OnExchange, 1, 1.0, 2.0), &t), Some(Volatility::Normal));
        assert_eq!(volatility(&row(InstrumentKind::OffExchange, 1, 1.0, 5.0), &t), None);
    }

    #[test]
    fn test_display_text() {
        assert_eq!(Advice::HardLock.to_string(), "hard lock, no action permitted");
        assert_eq!(Advice::Underwater.to_string(), "attention: under water outside lock window");
        assert_eq!(Volatility::High.to_string(), "high-volatility trigger");
    }
}
