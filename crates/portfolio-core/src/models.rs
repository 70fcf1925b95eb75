use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::series::{DividendEvent, IndexSeries, InstrumentSeries};

/// One ticker's series plus its position in the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentInput {
    pub ticker: String,
    pub series: InstrumentSeries,
}

impl InstrumentInput {
    pub fn new(ticker: impl Into<String>, series: InstrumentSeries) -> Self {
        Self {
            ticker: ticker.into(),
            series,
        }
    }
}

/// Everything the engine needs for one portfolio analysis call.
///
/// Inputs are assumed already fetched and validated by the caller except for
/// the invariants the engine re-checks: weight/ticker alignment, index series
/// length, and matching first dates across instruments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRequest {
    pub instruments: Vec<InstrumentInput>,
    /// Shared benchmark used for beta; skipped when absent.
    pub index: Option<IndexSeries>,
    /// Positional weights; defaults to 1/N per ticker when omitted.
    /// Each weight must be positive, but they need not sum to 1.
    pub weights: Option<Vec<f64>>,
    /// Starting capital for the amount-change simulation; <= 0 disables it.
    pub initial_amount: f64,
    pub include_dividends: bool,
}

/// Per-instrument analysis output.
///
/// All rates are fractional (0.1 = 10%), amounts are in the input currency,
/// and dates derive 1:1 from the UTC interpretation of the timestamps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentReturnResult {
    pub ticker: String,
    pub prices: Vec<f64>,
    pub timestamps: Vec<i64>,
    pub dividends: Vec<DividendEvent>,
    pub price_return: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub beta: f64,
    pub max_drawdown: f64,
    pub max_drawdown_series: Vec<f64>,
    pub periodic_return_rates: Vec<f64>,
    /// Cumulative return curve including dividends.
    pub cumulative_returns: Vec<f64>,
    /// Cumulative return curve from prices only.
    pub cumulative_price_returns: Vec<f64>,
    pub amount_change_series: Vec<f64>,
    pub dividend_cash_series: Vec<f64>,
    /// Requested initial amount scaled by this instrument's weight.
    pub initial_allocated_amount: f64,
    pub dates: Vec<NaiveDate>,
}

/// Portfolio-level aggregation of the per-instrument results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioReturnResult {
    pub instruments: Vec<InstrumentReturnResult>,
    pub portfolio_price_return: f64,
    pub portfolio_total_return: f64,
    pub portfolio_cagr: f64,
    pub portfolio_volatility: f64,
    pub portfolio_sharpe_ratio: f64,
    /// Pearson correlation per unordered ticker pair, keyed "A-B".
    /// Present only when the portfolio holds at least two instruments.
    pub correlations: Option<BTreeMap<String, f64>>,
    /// Weighted cumulative return curve including dividends.
    pub portfolio_cumulative_returns: Vec<f64>,
    /// Weighted cumulative price-return curve.
    pub portfolio_cumulative_price_returns: Vec<f64>,
    /// Drawdown curve of the re-priced portfolio curve.
    pub max_drawdown_series: Vec<f64>,
    pub max_drawdown: f64,
    pub dates: Vec<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
