use crate::error::{HoldingsError, ValidationError};
use serde::Deserialize;
use std::fmt;

/// Whether a fund is redeemed at end-of-day NAV or traded on an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum InstrumentKind {
    OffExchange,
    OnExchange,
}

impl InstrumentKind {
    pub fn all() -> [InstrumentKind; 2] {
        [InstrumentKind::OffExchange, InstrumentKind::OnExchange]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::OffExchange => "off-exchange",
            InstrumentKind::OnExchange => "on-exchange",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// On-disk shape of a holding. Converted into a `HoldingRecord` only after
/// validation, so an invalid row never reaches the store.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawHolding {
    fund_name: String,
    #[serde(default)]
    fund_code: Option<String>,
    instrument_kind: InstrumentKind,
    proxy_symbol: String,
    holding_days: i64,
    cost_basis: f64,
    prior_nav: f64,
    shares_held: f64,
}

impl TryFrom<RawHolding> for HoldingRecord {
    type Error = ValidationError;

    fn try_from(raw: RawHolding) -> Result<Self, Self::Error> {
        let mut record = HoldingRecord::new(
            &raw.fund_name,
            raw.instrument_kind,
            &raw.proxy_symbol,
            raw.holding_days,
            raw.cost_basis,
            raw.prior_nav,
            raw.shares_held,
        )?;
        record.fund_code = raw.fund_code.filter(|c| !c.trim().is_empty());
        Ok(record)
    }
}

/// One row of the holdings table.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingRecord {
    fund_name: String,
    fund_code: Option<String>,
    instrument_kind: InstrumentKind,
    proxy_symbol: String,
    holding_days: u32,
    cost_basis: f64,
    prior_nav: f64,
    shares_held: f64,
}

impl HoldingRecord {
    /// Builds a validated record. Cost basis and prior NAV must be positive
    /// and finite, shares non-negative, holding days non-negative.
    pub fn new(
        fund_name: &str,
        instrument_kind: InstrumentKind,
        proxy_symbol: &str,
        holding_days: i64,
        cost_basis: f64,
        prior_nav: f64,
        shares_held: f64,
    ) -> Result<HoldingRecord, ValidationError> {
        let fund_name = fund_name.trim();
        if fund_name.is_empty() {
            return Err(ValidationError::FundNameRequired);
        }
        let proxy_symbol = proxy_symbol.trim();
        if proxy_symbol.is_empty() {
            return Err(ValidationError::ProxySymbolRequired(fund_name.to_string()));
        }
        if holding_days < 0 {
            return Err(ValidationError::NegativeHoldingDays(holding_days));
        }
        if !(cost_basis.is_finite() && cost_basis > 0.0) {
            return Err(ValidationError::NonPositiveCostBasis(cost_basis));
        }
        if !(prior_nav.is_finite() && prior_nav > 0.0) {
            return Err(ValidationError::NonPositivePriorNav(prior_nav));
        }
        if !(shares_held.is_finite() && shares_held >= 0.0) {
            return Err(ValidationError::NegativeShares(shares_held));
        }

        Ok(HoldingRecord {
            fund_name: fund_name.to_string(),
            fund_code: None,
            instrument_kind,
            proxy_symbol: proxy_symbol.to_string(),
            holding_days: u32::try_from(holding_days).unwrap_or(u32::MAX),
            cost_basis,
            prior_nav,
            shares_held,
        })
    }

    pub fn with_fund_code(mut self, code: &str) -> HoldingRecord {
        self.fund_code = Some(code.to_string());
        self
    }

    pub fn get_name(&self) -> &str {
        &self.fund_name
    }

    pub fn get_fund_code(&self) -> Option<&str> {
        self.fund_code.as_deref()
    }

    pub fn get_kind(&self) -> InstrumentKind {
        self.instrument_kind
    }

    pub fn get_proxy_symbol(&self) -> &str {
        &self.proxy_symbol
    }

    pub fn get_holding_days(&self) -> u32 {
        self.holding_days
    }

    pub fn get_cost_basis(&self) -> f64 {
        self.cost_basis
    }

    pub fn get_prior_nav(&self) -> f64 {
        self.prior_nav
    }

    pub fn get_shares(&self) -> f64 {
        self.shares_held
    }

    /// Value of the holding at the last confirmed NAV.
    pub fn prior_value(&self) -> f64 {
        self.prior_nav * self.shares_held
    }

    pub fn total_cost(&self) -> f64 {
        self.cost_basis * self.shares_held
    }
}

/// Parses a JSON array of holdings. Validation errors name the fund that
/// failed so the operator can fix the file.
pub fn from_string(data: &str) -> Result<Vec<HoldingRecord>, HoldingsError> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(data)?;
    raw.into_iter()
        .map(|value| {
            let fund = value
                .get("FundName")
                .and_then(|v| v.as_str())
                .unwrap_or("<unnamed>")
                .to_string();
            let raw: RawHolding = serde_json::from_value(value)?;
            HoldingRecord::try_from(raw).map_err(|source| HoldingsError::Invalid { fund, source })
        })
        .collect()
}

pub fn from_file(filename: &str) -> Result<Vec<HoldingRecord>, HoldingsError> {
    let data = std::fs::read_to_string(filename).map_err(|source| HoldingsError::Io {
        path: filename.to_string(),
        source,
    })?;
    from_string(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "FundName": "Grid Equipment A",
            "FundCode": "012345",
            "InstrumentKind": "OffExchange",
            "ProxySymbol": "sh000300",
            "HoldingDays": 15,
            "CostBasis": 1.15,
            "PriorNav": 1.2189,
            "SharesHeld": 20000
        },
        {
            "FundName": "Oil & Gas ETF",
            "InstrumentKind": "OnExchange",
            "ProxySymbol": "513350",
            "HoldingDays": 2,
            "CostBasis": 1.43,
            "PriorNav": 1.4026,
            "SharesHeld": 10000
        }
    ]"#;

    #[test]
    fn test_from_string() {
        let holdings = from_string(SAMPLE).unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].get_name(), "Grid Equipment A");
        assert_eq!(holdings[0].get_fund_code(), Some("012345"));
        assert_eq!(holdings[0].get_kind(), InstrumentKind::OffExchange);
        assert_eq!(holdings[0].get_holding_days(), 15);
        assert_eq!(holdings[1].get_fund_code(), None);
        assert_eq!(holdings[1].get_kind(), InstrumentKind::OnExchange);
    }

    #[test]
    fn test_rejects_zero_prior_nav() {
        let data = r#"[{"FundName": "Broken", "InstrumentKind": "OffExchange",
            "ProxySymbol": "x", "HoldingDays": 1, "CostBasis": 1.0,
            "PriorNav": 0.0, "SharesHeld": 1.0}]"#;
        match from_string(data) {
            Err(HoldingsError::Invalid { fund, source }) => {
                assert_eq!(fund, "Broken");
                assert_eq!(source, ValidationError::NonPositivePriorNav(0.0));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_negative_holding_days() {
        let data = r#"[{"FundName": "Early", "InstrumentKind": "OffExchange",
            "ProxySymbol": "x", "HoldingDays": -3, "CostBasis": 1.0,
            "PriorNav": 1.0, "SharesHeld": 1.0}]"#;
        assert!(matches!(
            from_string(data),
            Err(HoldingsError::Invalid {
                source: ValidationError::NegativeHoldingDays(-3),
                ..
            })
        ));
    }

    #[test]
    fn test_new_validates_cost_basis() {
        let err = HoldingRecord::new("A", InstrumentKind::OffExchange, "x", 0, -1.0, 1.0, 1.0)
            .unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveCostBasis(-1.0));

        let err = HoldingRecord::new("A", InstrumentKind::OffExchange, "x", 0, f64::NAN, 1.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveCostBasis(_)));
    }

    #[test]
    fn test_new_trims_names() {
        let record =
            HoldingRecord::new("  Gold Feeder ", InstrumentKind::OffExchange, " 518880 ", 5, 3.85, 3.6984, 5000.0)
                .unwrap();
        assert_eq!(record.get_name(), "Gold Feeder");
        assert_eq!(record.get_proxy_symbol(), "518880");
        assert!(HoldingRecord::new("   ", InstrumentKind::OnExchange, "x", 0, 1.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(from_string("not json"), Err(HoldingsError::Json(_))));
    }
}
