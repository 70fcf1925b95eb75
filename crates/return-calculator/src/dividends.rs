//! Dividend helpers used standalone or by the return calculations.

use portfolio_core::DividendEvent;

/// Sum of all dividend amounts; 0 for an empty list.
pub fn total_dividends(dividends: &[DividendEvent]) -> f64 {
    dividends.iter().map(|d| d.amount).sum()
}

/// Events whose date falls inside `[start, end]`, inclusive on both ends.
pub fn filter_by_date_range(
    dividends: &[DividendEvent],
    start: i64,
    end: i64,
) -> Vec<DividendEvent> {
    dividends
        .iter()
        .filter(|d| d.timestamp >= start && d.timestamp <= end)
        .copied()
        .collect()
}

/// Total dividends over an average price; 0 when the list is empty or the
/// average price is non-positive.
pub fn dividend_yield(dividends: &[DividendEvent], average_price: f64) -> f64 {
    if dividends.is_empty() || average_price <= 0.0 {
        return 0.0;
    }
    total_dividends(dividends) / average_price
}

/// What-if estimate of the final value of reinvesting each dividend.
///
/// Each dividend buys shares at the first price point dated at or after the
/// event (or the last price when none follows); the shares are valued at the
/// final price. Independent of the stateful simulation in
/// `returns::cumulative_amounts`.
pub fn reinvested_value(dividends: &[DividendEvent], prices: &[f64], timestamps: &[i64]) -> f64 {
    if dividends.is_empty() || prices.is_empty() || timestamps.is_empty() {
        return 0.0;
    }

    let final_price = prices[prices.len() - 1];
    let mut total = 0.0;
    for dividend in dividends {
        let price_at_date = price_at_or_after(dividend.timestamp, prices, timestamps);
        if price_at_date > 0.0 {
            let shares_bought = dividend.amount / price_at_date;
            total += shares_bought * final_price;
        }
    }
    total
}

/// First price whose timestamp is at or after the target date; the last
/// price when the date falls past the series.
fn price_at_or_after(date: i64, prices: &[f64], timestamps: &[i64]) -> f64 {
    for (i, &ts) in timestamps.iter().enumerate() {
        if ts >= date {
            return prices[i];
        }
    }
    prices[prices.len() - 1]
}
