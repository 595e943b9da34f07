//! Average True Range: rolling mean of true range over n bars.
//!
//! The first bar has no previous close, so its true range is high - low.
//! Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::window::RollingWindow;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    prev_close: Option<f64>,
    ranges: RollingWindow,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            prev_close: None,
            ranges: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        let tr = match self.prev_close {
            Some(prev) => bar.true_range(prev),
            None => bar.high - bar.low,
        };
        self.prev_close = Some(bar.close);
        self.ranges.push(tr);
        self.ranges.mean()
    }
}
