//! Fixed-length rolling window shared by the windowed indicators.
//!
//! Each push is O(1) amortized; statistics are taken over the retained
//! values only, in insertion order, so results equal a from-scratch
//! recomputation over the same trailing slice.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            values: VecDeque::with_capacity(period + 1),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.period > 0 && self.values.len() == self.period
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arithmetic mean, once `period` values have been seen.
    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.period as f64)
    }

    /// Sample standard deviation (n - 1 denominator), once the window is full.
    pub fn sample_std(&self) -> Option<f64> {
        if !self.is_full() || self.period < 2 {
            return None;
        }
        let mean = self.values.iter().sum::<f64>() / self.period as f64;
        let variance = self
            .values
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (self.period - 1) as f64;
        Some(variance.sqrt())
    }
}
