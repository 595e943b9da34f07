//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: the line needs `slow` closes, the signal line a further
//! `signal - 1` (34 bars for the defaults).

use crate::domain::indicator::ema::Ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MacdValue {
    pub line: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        }
    }

    pub fn update(&mut self, close: f64) -> MacdValue {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        let line = match (fast, slow) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        };
        let signal = line.and_then(|l| self.signal.update(l));
        let histogram = match (line, signal) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        };
        MacdValue {
            line,
            signal,
            histogram,
        }
    }
}

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdValue> {
    let mut macd = Macd::new(fast, slow, signal);
    closes.iter().map(|&c| macd.update(c)).collect()
}
