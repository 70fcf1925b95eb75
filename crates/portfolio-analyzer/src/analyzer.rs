//! Portfolio-level aggregation: weighted combination of instrument results,
//! pairwise correlations, and the end-to-end analysis entry point.

use std::collections::BTreeMap;

use portfolio_core::{
    AnalysisError, InstrumentInput, InstrumentReturnResult, PortfolioRequest,
    PortfolioReturnResult,
};
use rayon::prelude::*;
use return_calculator::{max_drawdowns, max_value, prices_from_returns};
use tracing::debug;

use crate::assembler::{instrument_return, to_naive_date};

/// Weighted sum of per-instrument returns.
pub fn weighted_return(returns: &[f64], weights: &[f64]) -> Result<f64, AnalysisError> {
    if returns.len() != weights.len() {
        return Err(AnalysisError::InvalidData(
            "returns and weights must have the same size".to_string(),
        ));
    }
    Ok(returns.iter().zip(weights).map(|(r, w)| r * w).sum())
}

/// Square root of the weighted squared deviations of each instrument's return
/// around the simple (unweighted) mean of the returns.
///
/// The unweighted mean in the deviation term is intentional; downstream
/// thresholds are calibrated against it.
pub fn weighted_volatility(returns: &[f64], weights: &[f64]) -> Result<f64, AnalysisError> {
    if returns.is_empty() {
        return Err(AnalysisError::InsufficientData(
            "returns cannot be empty".to_string(),
        ));
    }
    if returns.len() != weights.len() {
        return Err(AnalysisError::InvalidData(
            "returns and weights must have the same size".to_string(),
        ));
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance: f64 = returns
        .iter()
        .zip(weights)
        .map(|(r, w)| w * (r - mean).powi(2))
        .sum();
    Ok(variance.sqrt())
}

/// Portfolio Sharpe ratio over pre-aggregated figures. Errors when the
/// portfolio volatility is zero.
pub fn sharpe_ratio(
    portfolio_return: f64,
    portfolio_volatility: f64,
    risk_free_rate: f64,
) -> Result<f64, AnalysisError> {
    if portfolio_volatility == 0.0 {
        return Err(AnalysisError::CalculationError(
            "cannot compute Sharpe ratio when portfolio volatility is zero".to_string(),
        ));
    }
    Ok((portfolio_return - risk_free_rate) / portfolio_volatility)
}

/// Pearson correlation of two equal-length return series, using population
/// statistics (divisor n).
pub fn correlation(returns1: &[f64], returns2: &[f64]) -> Result<f64, AnalysisError> {
    if returns1.is_empty() || returns2.is_empty() {
        return Err(AnalysisError::InsufficientData(
            "return series cannot be empty".to_string(),
        ));
    }
    if returns1.len() != returns2.len() {
        return Err(AnalysisError::InvalidData(
            "both return series must have the same size".to_string(),
        ));
    }
    if returns1.len() < 2 {
        return Err(AnalysisError::InsufficientData(
            "at least 2 returns are required to calculate correlation".to_string(),
        ));
    }

    let n = returns1.len() as f64;
    let mean1 = returns1.iter().sum::<f64>() / n;
    let mean2 = returns2.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut sum_squares1 = 0.0;
    let mut sum_squares2 = 0.0;
    for (r1, r2) in returns1.iter().zip(returns2) {
        let diff1 = r1 - mean1;
        let diff2 = r2 - mean2;
        covariance += diff1 * diff2;
        sum_squares1 += diff1 * diff1;
        sum_squares2 += diff2 * diff2;
    }

    let std_dev1 = (sum_squares1 / n).sqrt();
    let std_dev2 = (sum_squares2 / n).sqrt();
    if std_dev1 == 0.0 || std_dev2 == 0.0 {
        return Err(AnalysisError::CalculationError(
            "cannot calculate correlation when standard deviation is zero".to_string(),
        ));
    }

    Ok((covariance / n) / (std_dev1 * std_dev2))
}

/// Weighted cumulative return curve (dividends included) across instruments.
/// Empty when the instrument curves are not aligned to one length.
pub fn portfolio_cumulative_returns(
    results: &[InstrumentReturnResult],
    weights: &[f64],
) -> Vec<f64> {
    let curves: Vec<&[f64]> = results
        .iter()
        .map(|r| r.cumulative_returns.as_slice())
        .collect();
    weighted_curve(&curves, weights)
}

/// Weighted cumulative price-return curve across instruments.
pub fn portfolio_cumulative_price_returns(
    results: &[InstrumentReturnResult],
    weights: &[f64],
) -> Vec<f64> {
    let curves: Vec<&[f64]> = results
        .iter()
        .map(|r| r.cumulative_price_returns.as_slice())
        .collect();
    weighted_curve(&curves, weights)
}

fn weighted_curve(curves: &[&[f64]], weights: &[f64]) -> Vec<f64> {
    let Some(&first) = curves.first() else {
        return Vec::new();
    };
    let len = first.len();
    if len == 0 || curves.iter().any(|c| c.len() != len) {
        debug!("cumulative return curves are not aligned; skipping portfolio curve");
        return Vec::new();
    }
    (0..len)
        .map(|i| curves.iter().zip(weights).map(|(c, w)| c[i] * w).sum())
        .collect()
}

fn resolve_weights(count: usize, weights: Option<&[f64]>) -> Result<Vec<f64>, AnalysisError> {
    match weights {
        Some(given) => {
            if given.len() != count {
                return Err(AnalysisError::InvalidData(
                    "the number of weights must match the number of tickers".to_string(),
                ));
            }
            if given.iter().any(|w| *w <= 0.0) {
                return Err(AnalysisError::InvalidData(
                    "weights must be positive".to_string(),
                ));
            }
            Ok(given.to_vec())
        }
        None => Ok(vec![1.0 / count as f64; count]),
    }
}

fn validate_start_alignment(instruments: &[InstrumentInput]) -> Result<(), AnalysisError> {
    let first_dates: Vec<_> = instruments
        .iter()
        .filter_map(|input| input.series.first_timestamp())
        .map(to_naive_date)
        .collect();

    let Some(latest) = first_dates.iter().max().copied() else {
        return Ok(());
    };
    if first_dates.iter().any(|date| *date != latest) {
        return Err(AnalysisError::InvalidData(format!(
            "instrument series have different start dates; align them to the latest start date {latest}"
        )));
    }
    Ok(())
}

/// Run the full analysis: per-ticker results in parallel, then the weighted
/// portfolio aggregation and pairwise correlations.
///
/// Per-ticker work is independent; results are collected in input order so
/// the output stays deterministic.
pub fn analyze_portfolio(request: &PortfolioRequest) -> Result<PortfolioReturnResult, AnalysisError> {
    if request.instruments.is_empty() {
        return Err(AnalysisError::InvalidData(
            "at least one instrument is required".to_string(),
        ));
    }
    let weights = resolve_weights(request.instruments.len(), request.weights.as_deref())?;
    validate_start_alignment(&request.instruments)?;

    let index_prices = request.index.as_ref().map(|index| index.prices());

    let results: Vec<InstrumentReturnResult> = request
        .instruments
        .par_iter()
        .zip(weights.par_iter())
        .map(|(input, &weight)| {
            instrument_return(
                request.include_dividends,
                &input.ticker,
                &input.series,
                index_prices,
                request.initial_amount,
                weight,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let price_returns: Vec<f64> = results.iter().map(|r| r.price_return).collect();
    let total_returns: Vec<f64> = results.iter().map(|r| r.total_return).collect();
    let cagrs: Vec<f64> = results.iter().map(|r| r.cagr).collect();

    let portfolio_price_return = weighted_return(&price_returns, &weights)?;
    let portfolio_total_return = weighted_return(&total_returns, &weights)?;
    let portfolio_cagr = weighted_return(&cagrs, &weights)?;
    let portfolio_volatility = weighted_volatility(&total_returns, &weights)?;
    let portfolio_sharpe_ratio = sharpe_ratio(portfolio_total_return, portfolio_volatility, 0.0)?;

    let correlations = if results.len() >= 2 {
        let mut map = BTreeMap::new();
        for i in 0..results.len() {
            for j in (i + 1)..results.len() {
                let rates_i = &results[i].periodic_return_rates;
                let rates_j = &results[j].periodic_return_rates;
                // Pairs without enough aligned returns (an empty instrument
                // yields a zero result, not an error) are left out of the map
                if rates_i.len() < 2 || rates_i.len() != rates_j.len() {
                    debug!(
                        "skipping correlation for {}-{}: not enough aligned returns",
                        results[i].ticker, results[j].ticker
                    );
                    continue;
                }
                let key = format!("{}-{}", results[i].ticker, results[j].ticker);
                map.insert(key, correlation(rates_i, rates_j)?);
            }
        }
        Some(map)
    } else {
        None
    };

    let cumulative = portfolio_cumulative_returns(&results, &weights);
    let cumulative_price = portfolio_cumulative_price_returns(&results, &weights);

    let (max_drawdown_series, max_drawdown) = if cumulative_price.is_empty() {
        (Vec::new(), 0.0)
    } else {
        let repriced = prices_from_returns(&cumulative_price, 1.0);
        let series = max_drawdowns(&repriced)?;
        let max = max_value(&series);
        (series, max)
    };

    let dates = results
        .first()
        .map(|r| r.dates.clone())
        .unwrap_or_default();
    let start_date = dates.first().copied();
    let end_date = dates.last().copied();

    Ok(PortfolioReturnResult {
        instruments: results,
        portfolio_price_return,
        portfolio_total_return,
        portfolio_cagr,
        portfolio_volatility,
        portfolio_sharpe_ratio,
        correlations,
        portfolio_cumulative_returns: cumulative,
        portfolio_cumulative_price_returns: cumulative_price,
        max_drawdown_series,
        max_drawdown,
        dates,
        start_date,
        end_date,
    })
}
