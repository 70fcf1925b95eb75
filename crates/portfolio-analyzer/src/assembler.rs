//! Builds one instrument-level result from an aligned price/timestamp/dividend
//! series, running every calculator step for a single ticker.

use chrono::{DateTime, NaiveDate};
use portfolio_core::{
    AnalysisError, DividendEvent, InstrumentReturnResult, InstrumentSeries, ReturnRate,
};
use return_calculator::{
    beta, cagr, cumulative_amounts, cumulative_returns, max_drawdowns, max_value,
    periodic_return_rates, price_return, sharpe_ratio, total_return, volatility, years_between,
};
use tracing::{debug, error};

/// Calendar date of an epoch-second timestamp, interpreted in UTC.
pub fn to_naive_date(timestamp: i64) -> NaiveDate {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// One date per timestamp, no deduplication.
pub fn extract_dates(timestamps: &[i64]) -> Vec<NaiveDate> {
    timestamps.iter().map(|&ts| to_naive_date(ts)).collect()
}

fn rates_of(return_rates: &[ReturnRate]) -> Vec<f64> {
    return_rates.iter().map(|r| r.rate()).collect()
}

/// Compute the full `InstrumentReturnResult` for one ticker.
///
/// `index_prices` must match the series length when supplied; beta is 0 when
/// no benchmark is given. An empty price series yields a zero-valued result
/// with the ticker preserved rather than an error.
pub fn instrument_return(
    include_dividends: bool,
    ticker: &str,
    series: &InstrumentSeries,
    index_prices: Option<&[f64]>,
    initial_amount: f64,
    weight: f64,
) -> Result<InstrumentReturnResult, AnalysisError> {
    if let Some(index) = index_prices {
        if index.len() != series.len() {
            return Err(AnalysisError::InvalidData(
                "prices and index prices must have the same size".to_string(),
            ));
        }
    }

    if series.is_empty() {
        error!("{ticker} prices is empty");
        return Ok(InstrumentReturnResult {
            ticker: ticker.to_string(),
            ..Default::default()
        });
    }

    let prices = series.prices();
    let timestamps = series.timestamps();
    let dividends: &[DividendEvent] = if include_dividends {
        series.dividends()
    } else {
        &[]
    };

    let price_return = price_return(prices)?;
    let total_return = total_return(prices, timestamps, dividends)?;

    let start_price = prices[0];
    let end_value = start_price * total_return.rate() + start_price;
    let years = years_between(timestamps);
    debug!("{ticker} start_price:{start_price} end_value:{end_value} years:{years}");

    let cagr_rate = if years > 0.0 && start_price > 0.0 && end_value > 0.0 {
        cagr(start_price, end_value, years)?.rate()
    } else {
        0.0
    };

    let periodic = periodic_return_rates(prices, timestamps, dividends)?;
    let volatility = volatility(&periodic);
    debug!("{ticker} volatility:{volatility}");
    let sharpe = sharpe_ratio(&periodic, 0.0)?;

    let cumulative_rates = rates_of(&cumulative_returns(prices, timestamps, dividends)?);
    let cumulative_price_rates = rates_of(&cumulative_returns(prices, timestamps, &[])?);

    let drawdowns = max_drawdowns(prices)?;
    let max_drawdown = max_value(&drawdowns);

    let beta_value = match index_prices {
        Some(index) => {
            let index_rates = rates_of(&cumulative_returns(index, timestamps, &[])?);
            beta(&cumulative_price_rates, &index_rates)?
        }
        None => 0.0,
    };

    let amounts = cumulative_amounts(
        include_dividends,
        prices,
        timestamps,
        series.dividends(),
        initial_amount,
        weight,
    )?;

    Ok(InstrumentReturnResult {
        ticker: ticker.to_string(),
        prices: prices.to_vec(),
        timestamps: timestamps.to_vec(),
        dividends: series.dividends().to_vec(),
        price_return: price_return.rate(),
        total_return: total_return.rate(),
        cagr: cagr_rate,
        volatility,
        sharpe_ratio: sharpe,
        beta: beta_value,
        max_drawdown,
        max_drawdown_series: drawdowns,
        periodic_return_rates: rates_of(&periodic),
        cumulative_returns: cumulative_rates,
        cumulative_price_returns: cumulative_price_rates,
        amount_change_series: amounts.iter().map(|a| a.amount()).collect(),
        dividend_cash_series: amounts.iter().map(|a| a.cash).collect(),
        initial_allocated_amount: initial_amount * weight,
        dates: extract_dates(timestamps),
    })
}
