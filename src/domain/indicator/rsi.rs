//! RSI (Relative Strength Index).
//!
//! Simple rolling averages of gains and losses over the trailing n price
//! changes:
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! Degenerate windows: avg_loss == 0 gives 100, unless avg_gain is also 0
//! (flat prices), which gives the neutral 50.
//!
//! Warmup: first n bars are undefined (n price changes are needed).

use crate::domain::indicator::window::RollingWindow;

#[derive(Debug, Clone)]
pub struct Rsi {
    prev_close: Option<f64>,
    gains: RollingWindow,
    losses: RollingWindow,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            prev_close: None,
            gains: RollingWindow::new(period),
            losses: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev_close.replace(close)?;
        let change = close - prev;
        self.gains.push(if change > 0.0 { change } else { 0.0 });
        self.losses.push(if change < 0.0 { -change } else { 0.0 });

        let avg_gain = self.gains.mean()?;
        let avg_loss = self.losses.mean()?;
        Some(rsi_from_averages(avg_gain, avg_loss))
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut rsi = Rsi::new(period);
    closes.iter().map(|&c| rsi.update(c)).collect()
}
