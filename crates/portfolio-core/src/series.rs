use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// A single dividend payment event.
///
/// The timestamp does not need to coincide with a price timestamp; the
/// calculator maps each event onto the enclosing price interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    /// Seconds since epoch (UTC).
    pub timestamp: i64,
    /// Amount paid per share, >= 0.
    pub amount: f64,
}

impl DividendEvent {
    pub fn new(timestamp: i64, amount: f64) -> Self {
        Self { timestamp, amount }
    }
}

/// Price history, parallel timestamps, and dividend events for one ticker.
///
/// Built once per analysis request from provider data and never mutated
/// afterwards. The constructor enforces the parallel-series and ordering
/// invariants so downstream calculations can index freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSeries {
    prices: Vec<f64>,
    timestamps: Vec<i64>,
    dividends: Vec<DividendEvent>,
}

impl InstrumentSeries {
    pub fn new(
        prices: Vec<f64>,
        timestamps: Vec<i64>,
        dividends: Vec<DividendEvent>,
    ) -> Result<Self, AnalysisError> {
        if prices.len() != timestamps.len() {
            return Err(AnalysisError::InvalidData(
                "prices and timestamps must have the same size".to_string(),
            ));
        }
        if timestamps.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AnalysisError::InvalidData(
                "timestamps must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            prices,
            timestamps,
            dividends,
        })
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn dividends(&self) -> &[DividendEvent] {
        &self.dividends
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.timestamps.first().copied()
    }
}

/// Benchmark price series used only for beta.
///
/// Must match the length of every instrument series it is compared against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSeries {
    prices: Vec<f64>,
}

impl IndexSeries {
    pub fn new(prices: Vec<f64>) -> Self {
        Self { prices }
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
