//! Redemption-fee lock-in schedule.
//!
//! Off-exchange funds pay a punitive fee when redeemed inside the first week
//! and a reduced one until day 30. Exchange-traded funds are exempt. The
//! tier is a function of holding days alone, never of price.

use crate::holding::InstrumentKind;
use std::fmt;

pub const LOCK_DAYS: u32 = 7;
pub const WARN_DAYS: u32 = 30;

pub const LOCKED_FEE_PCT: f64 = 1.5;
pub const WARNED_FEE_PCT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeStatus {
    /// Exchange-traded, no minimum holding period.
    Exempt,
    Locked,
    Warned,
    Free,
}

impl FeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Exempt => "exempt",
            FeeStatus::Locked => "locked",
            FeeStatus::Warned => "warned",
            FeeStatus::Free => "free",
        }
    }

    pub fn fee_rate_pct(&self) -> f64 {
        match self {
            FeeStatus::Locked => LOCKED_FEE_PCT,
            FeeStatus::Warned => WARNED_FEE_PCT,
            FeeStatus::Exempt | FeeStatus::Free => 0.0,
        }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fee tier of a holding together with how far it is through that tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeAssessment {
    pub status: FeeStatus,
    pub fee_rate_pct: f64,
    /// Fraction of the current tier already elapsed, in `[0, 1]`.
    pub unlock_progress: f64,
    pub days_until_free: u32,
}

pub fn assess(kind: InstrumentKind, holding_days: u32) -> FeeAssessment {
    let status = match kind {
        InstrumentKind::OnExchange => FeeStatus::Exempt,
        InstrumentKind::OffExchange if holding_days < LOCK_DAYS => FeeStatus::Locked,
        InstrumentKind::OffExchange if holding_days < WARN_DAYS => FeeStatus::Warned,
        InstrumentKind::OffExchange => FeeStatus::Free,
    };

    let days = f64::from(holding_days);
    let unlock_progress = match status {
        FeeStatus::Locked => (days / f64::from(LOCK_DAYS)).min(1.0),
        FeeStatus::Warned => (days / f64::from(WARN_DAYS)).min(1.0),
        FeeStatus::Exempt | FeeStatus::Free => 1.0,
    };

    let days_until_free = match status {
        FeeStatus::Locked | FeeStatus::Warned => WARN_DAYS - holding_days,
        FeeStatus::Exempt | FeeStatus::Free => 0,
    };

    FeeAssessment {
        status,
        fee_rate_pct: status.fee_rate_pct(),
        unlock_progress,
        days_until_free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tier_boundaries() {
        let six = assess(InstrumentKind::OffExchange, 6);
        assert_eq!(six.status, FeeStatus::Locked);
        assert_eq!(six.fee_rate_pct, 1.5);
        assert!((six.unlock_progress - 6.0 / 7.0).abs() < 1e-12);

        let seven = assess(InstrumentKind::OffExchange, 7);
        assert_eq!(seven.status, FeeStatus::Warned);
        assert_eq!(seven.fee_rate_pct, 0.5);
        assert!((seven.unlock_progress - 7.0 / 30.0).abs() < 1e-12);

        let twenty_nine = assess(InstrumentKind::OffExchange, 29);
        assert_eq!(twenty_nine.status, FeeStatus::Warned);
        assert_eq!(twenty_nine.fee_rate_pct, 0.5);
        assert_eq!(twenty_nine.days_until_free, 1);

        let thirty = assess(InstrumentKind::OffExchange, 30);
        assert_eq!(thirty.status, FeeStatus::Free);
        assert_eq!(thirty.fee_rate_pct, 0.0);
        assert_eq!(thirty.unlock_progress, 1.0);
        assert_eq!(thirty.days_until_free, 0);
    }

    #[test]
    fn test_day_zero_is_locked() {
        let zero = assess(InstrumentKind::OffExchange, 0);
        assert_eq!(zero.status, FeeStatus::Locked);
        assert_eq!(zero.unlock_progress, 0.0);
        assert_eq!(zero.days_until_free, 30);
    }

    proptest! {
        #[test]
        fn prop_on_exchange_always_exempt(days in any::<u32>()) {
            let a = assess(InstrumentKind::OnExchange, days);
            prop_assert_eq!(a.status, FeeStatus::Exempt);
            prop_assert_eq!(a.fee_rate_pct, 0.0);
            prop_assert_eq!(a.unlock_progress, 1.0);
        }

        #[test]
        fn prop_off_exchange_rate_in_schedule(days in 0u32..10_000) {
            let a = assess(InstrumentKind::OffExchange, days);
            prop_assert!([1.5, 0.5, 0.0].contains(&a.fee_rate_pct));
            prop_assert!((0.0..=1.0).contains(&a.unlock_progress));
            prop_assert_eq!(a, assess(InstrumentKind::OffExchange, days));
        }

        #[test]
        fn prop_fee_never_increases_with_time(days in 0u32..1_000) {
            let today = assess(InstrumentKind::OffExchange, days);
            let tomorrow = assess(InstrumentKind::OffExchange, days + 1);
            prop_assert!(tomorrow.fee_rate_pct <= today.fee_rate_pct);
        }
    }
}
