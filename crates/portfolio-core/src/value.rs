use serde::{Deserialize, Serialize};

/// Fractional return between a start and an end value.
///
/// `rate()` is `(end - start) / start`, so 0.1 means a 10% gain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReturnRate {
    start_value: f64,
    end_value: f64,
}

impl ReturnRate {
    pub fn new(start_value: f64, end_value: f64) -> Self {
        Self {
            start_value,
            end_value,
        }
    }

    /// Wrap a bare rate as a `ReturnRate` over the unit interval
    /// (`start = 1.0`, `end = 1.0 + rate`), so composed rates can be
    /// passed wherever a `ReturnRate` is expected.
    pub fn from_rate(rate: f64) -> Self {
        Self {
            start_value: 1.0,
            end_value: 1.0 + rate,
        }
    }

    pub fn rate(&self) -> f64 {
        (self.end_value - self.start_value) / self.start_value
    }
}

/// Compound annual growth rate implied by a start/end value over a year count.
///
/// All three inputs must be positive; callers guard before constructing
/// (see the assembler's zero fallback for `years <= 0`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cagr {
    start_value: f64,
    end_value: f64,
    years: f64,
}

impl Cagr {
    pub fn new(start_value: f64, end_value: f64, years: f64) -> Self {
        Self {
            start_value,
            end_value,
            years,
        }
    }

    /// CAGR = (end / start)^(1/years) - 1
    pub fn rate(&self) -> f64 {
        (self.end_value / self.start_value).powf(1.0 / self.years) - 1.0
    }
}

/// Share count and price at one point of a simulated holding.
///
/// `cash` is the cumulative dividend cash observed up to this point in the
/// reinvestment simulation; it is informational and feeds the dividend cash
/// series on the instrument result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Amount {
    pub shares: f64,
    pub price: f64,
    pub cash: f64,
}

impl Amount {
    pub fn new(shares: f64, price: f64, cash: f64) -> Self {
        Self {
            shares,
            price,
            cash,
        }
    }

    /// Market value of the holding at this point.
    pub fn amount(&self) -> f64 {
        self.shares * self.price
    }
}
