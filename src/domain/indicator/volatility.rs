//! Return volatility: sample standard deviation of close-to-close
//! percentage returns over a fixed window.
//!
//! Warmup: `window` returns are needed, so the first `window` bars are
//! undefined.

use crate::domain::indicator::window::RollingWindow;

pub const DEFAULT_WINDOW: usize = 20;

#[derive(Debug, Clone)]
pub struct Volatility {
    prev_close: Option<f64>,
    returns: RollingWindow,
}

impl Volatility {
    pub fn new(window: usize) -> Self {
        Self {
            prev_close: None,
            returns: RollingWindow::new(window),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev_close.replace(close)?;
        if prev == 0.0 {
            return None;
        }
        self.returns.push(close / prev - 1.0);
        self.returns.sample_std()
    }
}
