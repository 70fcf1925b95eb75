//! Pure return and risk calculations over a single instrument's series.
//! Stateless functions, no I/O; every fallible path reports the violated
//! precondition through `AnalysisError`.

use portfolio_core::{Amount, AnalysisError, Cagr, DividendEvent, ReturnRate};
use statrs::statistics::Statistics;

/// Seconds in a calendar year (365 days, no leap adjustment).
pub const SECONDS_PER_YEAR: i64 = 365 * 24 * 60 * 60;

fn validate_prices_for_return(prices: &[f64]) -> Result<(), AnalysisError> {
    if prices.len() < 2 {
        return Err(AnalysisError::InsufficientData(
            "at least two prices are required".to_string(),
        ));
    }
    Ok(())
}

fn validate_parallel_series(prices: &[f64], timestamps: &[i64]) -> Result<(), AnalysisError> {
    if prices.is_empty() || timestamps.is_empty() {
        return Err(AnalysisError::InsufficientData(
            "prices and timestamps cannot be empty".to_string(),
        ));
    }
    if prices.len() != timestamps.len() {
        return Err(AnalysisError::InvalidData(
            "prices and timestamps must have the same size".to_string(),
        ));
    }
    Ok(())
}

fn sorted_by_date(dividends: &[DividendEvent]) -> Vec<DividendEvent> {
    let mut sorted = dividends.to_vec();
    sorted.sort_by_key(|d| d.timestamp);
    sorted
}

fn rates_of(return_rates: &[ReturnRate]) -> Vec<f64> {
    return_rates.iter().map(|r| r.rate()).collect()
}

fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.mean();
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Simple price return from the first to the last price in a series.
pub fn price_return(prices: &[f64]) -> Result<ReturnRate, AnalysisError> {
    validate_prices_for_return(prices)?;
    Ok(ReturnRate::new(prices[0], prices[prices.len() - 1]))
}

/// Total return including dividend cash in the simplified additive model:
/// `(end_price + dividend_sum - start_price) / start_price`.
///
/// Only dividends dated in `(t[0], t[last]]` count, the same window
/// `cumulative_returns` uses, so the last cumulative entry equals this rate.
/// Dividend cash is added raw, not reinvested; the reinvestment path is
/// `cumulative_amounts`.
pub fn total_return(
    prices: &[f64],
    timestamps: &[i64],
    dividends: &[DividendEvent],
) -> Result<ReturnRate, AnalysisError> {
    validate_parallel_series(prices, timestamps)?;
    validate_prices_for_return(prices)?;
    let start_ts = timestamps[0];
    let end_ts = timestamps[timestamps.len() - 1];
    let dividend_sum: f64 = dividends
        .iter()
        .filter(|d| d.timestamp > start_ts && d.timestamp <= end_ts)
        .map(|d| d.amount)
        .sum();
    let start_price = prices[0];
    let end_value = prices[prices.len() - 1] + dividend_sum;
    Ok(ReturnRate::new(start_price, end_value))
}

/// Compound annual growth rate for a positive start/end value pair.
pub fn cagr(start_value: f64, end_value: f64, years: f64) -> Result<Cagr, AnalysisError> {
    if start_value <= 0.0 {
        return Err(AnalysisError::InvalidData(
            "start value must be positive".to_string(),
        ));
    }
    if end_value <= 0.0 {
        return Err(AnalysisError::InvalidData(
            "end value must be positive".to_string(),
        ));
    }
    if years <= 0.0 {
        return Err(AnalysisError::InvalidData(
            "years must be positive".to_string(),
        ));
    }
    Ok(Cagr::new(start_value, end_value, years))
}

/// Elapsed whole years between the first and last timestamp, floored at 1.
pub fn years_between(timestamps: &[i64]) -> f64 {
    if timestamps.len() < 2 {
        return 1.0;
    }
    let elapsed = timestamps[timestamps.len() - 1] - timestamps[0];
    ((elapsed / SECONDS_PER_YEAR) as f64).max(1.0)
}

/// Return over each consecutive pair of price observations.
///
/// Dividend cash dated in `(t[i-1], t[i]]` is added to that period's rate as
/// yield on the period's opening price. Produces `n - 1` entries.
pub fn periodic_return_rates(
    prices: &[f64],
    timestamps: &[i64],
    dividends: &[DividendEvent],
) -> Result<Vec<ReturnRate>, AnalysisError> {
    validate_parallel_series(prices, timestamps)?;

    let sorted = sorted_by_date(dividends);
    let mut next = 0;
    while next < sorted.len() && sorted[next].timestamp <= timestamps[0] {
        next += 1;
    }

    let mut rates = Vec::with_capacity(prices.len().saturating_sub(1));
    for i in 1..prices.len() {
        let prev = prices[i - 1];
        if prev <= 0.0 {
            return Err(AnalysisError::InvalidData(format!(
                "price at index {} must be positive",
                i - 1
            )));
        }
        let mut dividend_sum = 0.0;
        while next < sorted.len() && sorted[next].timestamp <= timestamps[i] {
            dividend_sum += sorted[next].amount;
            next += 1;
        }
        let rate = (prices[i] - prev) / prev + dividend_sum / prev;
        rates.push(ReturnRate::from_rate(rate));
    }
    Ok(rates)
}

/// Cumulative return from the series' first point to each point, one entry
/// per price observation. The first entry is always 0.
///
/// Dividends dated in `(t[0], t[i]]` are folded in additively, matching
/// `total_return`'s model; with no dividends this is the pure price curve.
pub fn cumulative_returns(
    prices: &[f64],
    timestamps: &[i64],
    dividends: &[DividendEvent],
) -> Result<Vec<ReturnRate>, AnalysisError> {
    validate_parallel_series(prices, timestamps)?;
    let start_price = prices[0];
    if start_price <= 0.0 {
        return Err(AnalysisError::InvalidData(
            "start price must be positive for cumulative return calculation".to_string(),
        ));
    }

    let sorted = sorted_by_date(dividends);
    let start_ts = timestamps[0];
    let mut next = 0;
    let mut dividend_sum = 0.0;
    let mut curve = Vec::with_capacity(prices.len());
    for (&price, &ts) in prices.iter().zip(timestamps) {
        while next < sorted.len() && sorted[next].timestamp <= ts {
            if sorted[next].timestamp > start_ts {
                dividend_sum += sorted[next].amount;
            }
            next += 1;
        }
        curve.push(ReturnRate::new(start_price, price + dividend_sum));
    }
    Ok(curve)
}

/// Running-peak drawdown series: `(peak - price) / peak` per point.
///
/// Values are fractional magnitudes >= 0; the presentation layer applies the
/// negative sign convention.
pub fn max_drawdowns(prices: &[f64]) -> Result<Vec<f64>, AnalysisError> {
    if prices.is_empty() {
        return Err(AnalysisError::InsufficientData(
            "price series is empty".to_string(),
        ));
    }
    let mut peak = prices[0];
    let mut drawdowns = Vec::with_capacity(prices.len());
    for &price in prices {
        if price > peak {
            peak = price;
        }
        let drawdown = if peak == 0.0 {
            0.0
        } else {
            (peak - price) / peak
        };
        drawdowns.push(drawdown);
    }
    Ok(drawdowns)
}

/// Maximum of a list; 0 for an empty list.
pub fn max_value(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(f64::MIN, f64::max)
}

/// Volatility of a periodic return series: the population standard deviation
/// scaled by `sqrt(n - 1)`.
///
/// The scaling is intentional and calibrated against downstream Sharpe
/// thresholds; it is not an annualization factor.
pub fn volatility(periodic_return_rates: &[ReturnRate]) -> f64 {
    if periodic_return_rates.is_empty() {
        return 0.0;
    }
    let rates = rates_of(periodic_return_rates);
    let n = rates.len() as f64;
    population_std_dev(&rates) * (n - 1.0).sqrt()
}

/// Mean periodic return in excess of the risk-free rate, per unit of
/// volatility. Errors when the series has zero volatility.
pub fn sharpe_ratio(
    periodic_return_rates: &[ReturnRate],
    risk_free_rate: f64,
) -> Result<f64, AnalysisError> {
    let vol = volatility(periodic_return_rates);
    if vol == 0.0 {
        return Err(AnalysisError::CalculationError(
            "cannot compute Sharpe ratio when volatility is zero".to_string(),
        ));
    }
    let mean = rates_of(periodic_return_rates).mean();
    Ok((mean - risk_free_rate) / vol)
}

/// Beta of an instrument against a benchmark: covariance of the two return
/// series over the variance of the benchmark, both aligned by position.
pub fn beta(instrument_returns: &[f64], index_returns: &[f64]) -> Result<f64, AnalysisError> {
    if instrument_returns.len() != index_returns.len() || instrument_returns.len() < 2 {
        return Err(AnalysisError::InvalidData(
            "return series must have the same size and at least 2 elements".to_string(),
        ));
    }
    let mean_x = instrument_returns.mean();
    let mean_y = index_returns.mean();
    let n = instrument_returns.len() as f64;

    let mut covariance = 0.0;
    let mut index_variance = 0.0;
    for (x, y) in instrument_returns.iter().zip(index_returns) {
        covariance += (x - mean_x) * (y - mean_y);
        index_variance += (y - mean_y).powi(2);
    }
    covariance /= n;
    index_variance /= n;

    if index_variance == 0.0 {
        return Err(AnalysisError::CalculationError(
            "cannot compute beta against a constant index".to_string(),
        ));
    }
    Ok(covariance / index_variance)
}

/// Dividend-reinvestment simulation of an initial allocation over a series.
///
/// Holds `initial_amount * weight / prices[0]` shares from the first point.
/// When `include_dividends` is set, cash from events dated in `(t[i-1], t[i]]`
/// buys more shares at `prices[i]`. Each emitted `Amount` carries the share
/// count, the price, and the cumulative dividend cash seen so far.
///
/// Amount tracking is opt-in: `initial_amount <= 0` yields an empty series.
pub fn cumulative_amounts(
    include_dividends: bool,
    prices: &[f64],
    timestamps: &[i64],
    dividends: &[DividendEvent],
    initial_amount: f64,
    weight: f64,
) -> Result<Vec<Amount>, AnalysisError> {
    if initial_amount <= 0.0 {
        return Ok(Vec::new());
    }
    validate_parallel_series(prices, timestamps)?;
    let start_price = prices[0];
    if start_price <= 0.0 {
        return Err(AnalysisError::InvalidData(
            "start price must be positive for amount tracking".to_string(),
        ));
    }

    let sorted = if include_dividends {
        sorted_by_date(dividends)
    } else {
        Vec::new()
    };
    let mut next = 0;
    while next < sorted.len() && sorted[next].timestamp <= timestamps[0] {
        next += 1;
    }

    let mut shares = initial_amount * weight / start_price;
    let mut cash_seen = 0.0;
    let mut amounts = Vec::with_capacity(prices.len());
    amounts.push(Amount::new(shares, start_price, 0.0));

    for i in 1..prices.len() {
        let price = prices[i];
        let mut cash = 0.0;
        while next < sorted.len() && sorted[next].timestamp <= timestamps[i] {
            cash += shares * sorted[next].amount;
            next += 1;
        }
        if cash > 0.0 && price > 0.0 {
            shares += cash / price;
        }
        cash_seen += cash;
        amounts.push(Amount::new(shares, price, cash_seen));
    }
    Ok(amounts)
}

/// Re-price a return curve as absolute values over an initial amount.
pub fn prices_from_returns(rates: &[f64], initial_amount: f64) -> Vec<f64> {
    rates
        .iter()
        .map(|r| initial_amount + r * initial_amount)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    fn daily_timestamps(n: usize) -> Vec<i64> {
        (0..n as i64).map(|i| 1_700_000_000 + i * DAY).collect()
    }

    #[test]
    fn test_price_return_two_points() {
        let rr = price_return(&[100.0, 110.0]).unwrap();
        assert!((rr.rate() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_price_return_requires_two_prices() {
        assert!(matches!(
            price_return(&[100.0]),
            Err(AnalysisError::InsufficientData(_))
        ));
        assert!(matches!(
            price_return(&[]),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_total_return_without_dividends_equals_price_return() {
        let prices = [100.0, 110.0, 120.0];
        let ts = daily_timestamps(3);
        let total = total_return(&prices, &ts, &[]).unwrap();
        assert!((total.rate() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_total_return_adds_raw_dividend_cash() {
        let prices = [100.0, 110.0];
        let ts = daily_timestamps(2);
        let dividends = [DividendEvent::new(ts[0] + DAY / 2, 2.0)];
        let total = total_return(&prices, &ts, &dividends).unwrap();
        // (110 + 2 - 100) / 100
        assert!((total.rate() - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_total_return_ignores_out_of_window_dividends() {
        let prices = [100.0, 110.0];
        let ts = daily_timestamps(2);
        let dividends = [
            DividendEvent::new(ts[0], 5.0),
            DividendEvent::new(ts[0] + DAY / 2, 2.0),
            DividendEvent::new(ts[1] + DAY, 3.0),
        ];
        // Only the in-window 2.0 counts: (110 + 2 - 100) / 100
        let total = total_return(&prices, &ts, &dividends).unwrap();
        assert!((total.rate() - 0.12).abs() < 1e-12);

        // Same window as the cumulative curve
        let curve = cumulative_returns(&prices, &ts, &dividends).unwrap();
        assert!((curve[curve.len() - 1].rate() - total.rate()).abs() < 1e-12);
    }

    #[test]
    fn test_cagr_rejects_non_positive_inputs() {
        assert!(matches!(
            cagr(0.0, 110.0, 1.0),
            Err(AnalysisError::InvalidData(_))
        ));
        assert!(matches!(
            cagr(100.0, -5.0, 1.0),
            Err(AnalysisError::InvalidData(_))
        ));
        assert!(matches!(
            cagr(100.0, 110.0, 0.0),
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[test]
    fn test_years_between_floors_at_one() {
        let ts = daily_timestamps(10);
        assert!((years_between(&ts) - 1.0).abs() < 1e-12);

        let two_years = [0, 2 * SECONDS_PER_YEAR + DAY];
        assert!((years_between(&two_years) - 2.0).abs() < 1e-12);

        assert!((years_between(&[]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_periodic_return_rates_price_only() {
        let prices = [100.0, 110.0, 120.0];
        let ts = daily_timestamps(3);
        let rates = periodic_return_rates(&prices, &ts, &[]).unwrap();
        assert_eq!(rates.len(), 2);
        assert!((rates[0].rate() - 0.1).abs() < 1e-12);
        assert!((rates[1].rate() - 10.0 / 110.0).abs() < 1e-12);
    }

    #[test]
    fn test_periodic_return_rates_add_dividend_yield() {
        let prices = [100.0, 110.0];
        let ts = daily_timestamps(2);
        let dividends = [DividendEvent::new(ts[0] + DAY / 2, 2.0)];
        let rates = periodic_return_rates(&prices, &ts, &dividends).unwrap();
        assert_eq!(rates.len(), 1);
        // 0.1 price move plus 2/100 dividend yield
        assert!((rates[0].rate() - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_periodic_return_rates_ignore_dividends_at_or_before_start() {
        let prices = [100.0, 110.0];
        let ts = daily_timestamps(2);
        let dividends = [DividendEvent::new(ts[0], 5.0)];
        let rates = periodic_return_rates(&prices, &ts, &dividends).unwrap();
        assert!((rates[0].rate() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_cumulative_returns_price_only_curve() {
        let prices = [100.0, 110.0, 120.0];
        let ts = daily_timestamps(3);
        let curve = cumulative_returns(&prices, &ts, &[]).unwrap();
        let rates: Vec<f64> = curve.iter().map(|r| r.rate()).collect();
        assert_eq!(rates.len(), 3);
        assert!((rates[0] - 0.0).abs() < 1e-12);
        assert!((rates[1] - 0.1).abs() < 1e-12);
        assert!((rates[2] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_cumulative_returns_last_matches_price_return_without_dividends() {
        let prices = [100.0, 95.0, 130.0, 120.0];
        let ts = daily_timestamps(4);
        let curve = cumulative_returns(&prices, &ts, &[]).unwrap();
        let expected = price_return(&prices).unwrap().rate();
        assert!((curve[curve.len() - 1].rate() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cumulative_returns_fold_in_dividends_additively() {
        let prices = [100.0, 110.0, 108.0];
        let ts = daily_timestamps(3);
        let dividends = [DividendEvent::new(ts[1], 2.0)];
        let curve = cumulative_returns(&prices, &ts, &dividends).unwrap();
        assert!((curve[0].rate() - 0.0).abs() < 1e-12);
        // (110 + 2 - 100) / 100
        assert!((curve[1].rate() - 0.12).abs() < 1e-12);
        // (108 + 2 - 100) / 100
        assert!((curve[2].rate() - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_max_drawdowns_monotonic_series_has_no_drawdown() {
        let drawdowns = max_drawdowns(&[100.0, 110.0, 120.0, 130.0]).unwrap();
        assert!(drawdowns.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_max_drawdowns_tracks_running_peak() {
        let drawdowns = max_drawdowns(&[100.0, 110.0, 105.0, 95.0, 100.0, 115.0, 108.0]).unwrap();
        assert_eq!(drawdowns.len(), 7);
        // Worst decline: peak 110 down to 95
        assert!((max_value(&drawdowns) - 15.0 / 110.0).abs() < 1e-9);
        assert!(drawdowns.iter().all(|&d| d >= 0.0));
    }

    #[test]
    fn test_max_value_empty_is_zero() {
        assert_eq!(max_value(&[]), 0.0);
        assert!((max_value(&[0.1, 0.3, 0.2]) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_population_std_dev_scaled() {
        let rates = [ReturnRate::from_rate(0.1), ReturnRate::from_rate(0.2)];
        // population std dev = 0.05, scaled by sqrt(2 - 1)
        assert!((volatility(&rates) - 0.05).abs() < 1e-12);
        assert_eq!(volatility(&[]), 0.0);
    }

    #[test]
    fn test_sharpe_ratio_zero_risk_free() {
        let rates = [ReturnRate::from_rate(0.1), ReturnRate::from_rate(0.2)];
        let sharpe = sharpe_ratio(&rates, 0.0).unwrap();
        // mean 0.15 over volatility 0.05
        assert!((sharpe - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_sharpe_ratio_rejects_zero_volatility() {
        let flat = [ReturnRate::from_rate(0.1), ReturnRate::from_rate(0.1)];
        assert!(matches!(
            sharpe_ratio(&flat, 0.0),
            Err(AnalysisError::CalculationError(_))
        ));
    }

    #[test]
    fn test_beta_of_identical_series_is_one() {
        let returns = [0.0, 0.1, 0.2, 0.15];
        let b = beta(&returns, &returns).unwrap();
        assert!((b - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_beta_scales_with_amplified_moves() {
        let index = [0.0, 0.1, 0.2, 0.15];
        let doubled: Vec<f64> = index.iter().map(|r| r * 2.0).collect();
        let b = beta(&doubled, &index).unwrap();
        assert!((b - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_beta_rejects_constant_index() {
        let instrument = [0.0, 0.1, 0.2];
        let constant = [0.05, 0.05, 0.05];
        assert!(matches!(
            beta(&instrument, &constant),
            Err(AnalysisError::CalculationError(_))
        ));
    }

    #[test]
    fn test_beta_rejects_mismatched_lengths() {
        assert!(matches!(
            beta(&[0.1, 0.2], &[0.1]),
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[test]
    fn test_cumulative_amounts_without_dividends_track_prices() {
        let prices = [100.0, 110.0, 120.0];
        let ts = daily_timestamps(3);
        let amounts = cumulative_amounts(false, &prices, &ts, &[], 1000.0, 0.5).unwrap();
        assert_eq!(amounts.len(), 3);
        for (amount, &price) in amounts.iter().zip(&prices) {
            let expected = 1000.0 * 0.5 * price / prices[0];
            assert!((amount.amount() - expected).abs() < 1e-9);
            assert_eq!(amount.cash, 0.0);
        }
    }

    #[test]
    fn test_cumulative_amounts_reinvest_dividend_at_current_price() {
        let prices = [100.0, 110.0, 108.0];
        let ts = daily_timestamps(3);
        let dividends = [DividendEvent::new(ts[1], 2.0)];
        let amounts = cumulative_amounts(true, &prices, &ts, &dividends, 1000.0, 1.0).unwrap();

        assert!((amounts[0].amount() - 1000.0).abs() < 1e-9);
        // 10 shares earn 20 of cash, reinvested at 110
        assert!((amounts[1].amount() - 1120.0).abs() < 1e-3);
        assert!((amounts[2].amount() - 1099.636).abs() < 1e-3);
        assert!((amounts[1].cash - 20.0).abs() < 1e-9);
        assert!((amounts[2].cash - 20.0).abs() < 1e-9);

        let shares_before = 10.0;
        let expected_shares = shares_before + shares_before * 2.0 / 110.0;
        assert!((amounts[1].shares - expected_shares).abs() < 1e-9);
    }

    #[test]
    fn test_cumulative_amounts_flag_off_skips_dividends() {
        let prices = [100.0, 110.0, 108.0];
        let ts = daily_timestamps(3);
        let dividends = [DividendEvent::new(ts[1], 2.0)];
        let amounts = cumulative_amounts(false, &prices, &ts, &dividends, 1000.0, 1.0).unwrap();
        assert!((amounts[2].amount() - 1080.0).abs() < 1e-9);
        assert_eq!(amounts[2].cash, 0.0);
    }

    #[test]
    fn test_cumulative_amounts_opt_in() {
        let prices = [100.0, 110.0];
        let ts = daily_timestamps(2);
        let amounts = cumulative_amounts(true, &prices, &ts, &[], 0.0, 1.0).unwrap();
        assert!(amounts.is_empty());
    }

    #[test]
    fn test_cumulative_amounts_reject_non_positive_start_price() {
        let prices = [0.0, 110.0];
        let ts = daily_timestamps(2);
        assert!(matches!(
            cumulative_amounts(true, &prices, &ts, &[], 1000.0, 1.0),
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[test]
    fn test_prices_from_returns() {
        let prices = prices_from_returns(&[0.0, 0.1, 0.2], 1.0);
        assert!((prices[0] - 1.0).abs() < 1e-12);
        assert!((prices[1] - 1.1).abs() < 1e-12);
        assert!((prices[2] - 1.2).abs() < 1e-12);
    }
}
