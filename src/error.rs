//! Error types for fundwatch_rs
//!
//! Entry validation is strict so the valuation code never divides by a
//! zero or negative NAV. Quote errors are never fatal: the quote service
//! turns them into operator warnings.

use thiserror::Error;

/// Validation errors for a holding record at entry time.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Fund name is required")]
    FundNameRequired,

    #[error("Proxy symbol is required for {0}")]
    ProxySymbolRequired(String),

    #[error("Cost basis must be positive, got {0}")]
    NonPositiveCostBasis(f64),

    #[error("Prior NAV must be positive, got {0}")]
    NonPositivePriorNav(f64),

    #[error("Shares held cannot be negative, got {0}")]
    NegativeShares(f64),

    #[error("Holding days cannot be negative, got {0}")]
    NegativeHoldingDays(i64),
}

/// Errors raised while loading the holdings table.
#[derive(Debug, Error)]
pub enum HoldingsError {
    #[error("Could not read holdings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Holdings JSON is not well-formatted: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid holding {fund}: {source}")]
    Invalid {
        fund: String,
        #[source]
        source: ValidationError,
    },

    #[error("Fund {0} appears more than once; merge its lots into one row")]
    DuplicateFund(String),
}

/// Config values that would make every estimate meaningless.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("damping_factor must be a finite number >= 0, got {0}")]
    InvalidDampingFactor(f64),

    #[error("{name} must be a finite number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Errors that can occur when fetching proxy quotes.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Yahoo Finance request failed: {0}")]
    Yahoo(#[from] yahoo_finance_api::YahooError),

    #[error("Upstream returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Quote fetch timed out after {0} seconds")]
    Timeout(u64),
}
