use crate::advisory::{AdvisoryThresholds, DEFAULT_UNDERWATER_PNL_PCT, DEFAULT_VOLATILITY_TRIGGER_PCT};
use crate::error::ConfigError;
use crate::valuation::{ValuationParams, DEFAULT_DAMPING_FACTOR};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const APP_NAME: &str = "fundwatch";
pub const CONFIG_NAME: &str = "config";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Manual,
    Sina,
    Eastmoney,
    Yahoo,
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Provider::Manual),
            "sina" => Ok(Provider::Sina),
            "eastmoney" => Ok(Provider::Eastmoney),
            "yahoo" => Ok(Provider::Yahoo),
            _ => Err(format!("Unknown quote provider: '{s}'")),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Manual => "manual",
            Provider::Sina => "sina",
            Provider::Eastmoney => "eastmoney",
            Provider::Yahoo => "yahoo",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub holdings_file: String,
    pub currency: String,
    pub provider: Provider,
    pub damping_factor: f64,
    pub underwater_pnl_pct: f64,
    pub volatility_trigger_pct: f64,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    /// Proxy -> percent change typed in by hand; wins over fetched quotes.
    pub manual_quotes: HashMap<String, f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            holdings_file: String::new(),
            currency: "CNY".to_string(),
            provider: Provider::Sina,
            damping_factor: DEFAULT_DAMPING_FACTOR,
            underwater_pnl_pct: DEFAULT_UNDERWATER_PNL_PCT,
            volatility_trigger_pct: DEFAULT_VOLATILITY_TRIGGER_PCT,
            cache_ttl_secs: 30,
            request_timeout_secs: 3,
            manual_quotes: HashMap::new(),
        }
    }
}

impl Config {
    /// Rejects values that would turn every estimate into NaN or Inf.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.damping_factor.is_finite() && self.damping_factor >= 0.0) {
            return Err(ConfigError::InvalidDampingFactor(self.damping_factor));
        }
        let thresholds = [
            ("underwater_pnl_pct", self.underwater_pnl_pct),
            ("volatility_trigger_pct", self.volatility_trigger_pct),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }

    pub fn valuation_params(&self) -> ValuationParams {
        ValuationParams {
            damping_factor: self.damping_factor,
        }
    }

    pub fn thresholds(&self) -> AdvisoryThresholds {
        AdvisoryThresholds {
            underwater_pnl_pct: self.underwater_pnl_pct.abs(),
            volatility_trigger_pct: self.volatility_trigger_pct.abs(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
