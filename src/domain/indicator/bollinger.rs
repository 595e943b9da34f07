//! Bollinger Bands.
//!
//! - Middle: Simple Moving Average (SMA) over n closes
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation (n - 1 denominator).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are undefined.

use crate::domain::indicator::window::RollingWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    multiplier: f64,
    closes: RollingWindow,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self {
            multiplier,
            closes: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<Bands> {
        self.closes.push(close);
        let middle = self.closes.mean()?;
        let stddev = self.closes.sample_std()?;
        Some(Bands {
            upper: middle + self.multiplier * stddev,
            middle,
            lower: middle - self.multiplier * stddev,
        })
    }
}
