#![allow(dead_code)]

use aitrader::domain::backtest::BacktestConfig;
use aitrader::domain::error::AitraderError;
pub use aitrader::domain::ohlcv::Bar;
use aitrader::domain::oracle::{ClassCounts, TrainingSummary};
use aitrader::domain::signal::Signal;
use aitrader::ports::data_port::DataPort;
use aitrader::ports::oracle_port::SignalOracle;
use chrono::{Duration, NaiveDate, NaiveDateTime};

pub struct MockDataPort {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, AitraderError> {
        if let Some(reason) = &self.error {
            return Err(AitraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| start.is_none_or(|s| b.timestamp >= s))
            .filter(|b| end.is_none_or(|e| b.timestamp <= e))
            .cloned()
            .collect())
    }
}

/// Oracle that always votes the same way.
pub struct ConstantVote(pub Signal);

impl SignalOracle for ConstantVote {
    fn name(&self) -> &str {
        "constant-vote"
    }

    fn train(&mut self, history: &[Bar]) -> Result<TrainingSummary, AitraderError> {
        Ok(TrainingSummary {
            accuracy: 1.0,
            sample_count: history.len(),
            class_counts: ClassCounts::default(),
        })
    }

    fn predict(&self, _window: &[Bar]) -> Result<Signal, AitraderError> {
        Ok(self.0)
    }
}

/// Votes the direction of the window's net move; optionally refuses to train
/// or fails every prediction.
pub struct ScriptedOracle {
    pub fail_training: bool,
    pub fail_predict: bool,
    pub trained_on: Option<usize>,
}

impl ScriptedOracle {
    pub fn momentum() -> Self {
        Self {
            fail_training: false,
            fail_predict: false,
            trained_on: None,
        }
    }

    pub fn broken() -> Self {
        Self {
            fail_predict: true,
            ..Self::momentum()
        }
    }

    pub fn untrainable() -> Self {
        Self {
            fail_training: true,
            ..Self::momentum()
        }
    }
}

impl SignalOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    fn train(&mut self, history: &[Bar]) -> Result<TrainingSummary, AitraderError> {
        if self.fail_training {
            return Err(AitraderError::Oracle {
                reason: "refusing to train".into(),
            });
        }
        self.trained_on = Some(history.len());
        Ok(TrainingSummary {
            accuracy: 0.5,
            sample_count: history.len(),
            class_counts: ClassCounts::default(),
        })
    }

    fn predict(&self, window: &[Bar]) -> Result<Signal, AitraderError> {
        if self.fail_predict {
            return Err(AitraderError::Oracle {
                reason: "prediction failed".into(),
            });
        }
        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            return Ok(Signal::Hold);
        };
        Ok(if last.close > first.close {
            Signal::Buy
        } else if last.close < first.close {
            Signal::Sell
        } else {
            Signal::Hold
        })
    }
}

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly bar number `index` with explicit prices.
pub fn ohlc_bar(index: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: start_time() + Duration::hours(index as i64),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// Bar with a half-point range around `close`.
pub fn make_bar(index: usize, close: f64) -> Bar {
    ohlc_bar(index, close, close + 0.5, close - 0.5, close)
}

pub fn flat_bars(n: usize) -> Vec<Bar> {
    (0..n).map(|i| ohlc_bar(i, 100.0, 100.0, 100.0, 100.0)).collect()
}

fn choppy_prefix() -> Vec<Bar> {
    (0..30)
        .map(|i| make_bar(i, 100.0 + (i % 2) as f64 * 0.5))
        .collect()
}

/// 30 choppy bars near 100, a gap down to 90 at index 30, then +1 per bar.
///
/// With default settings RSI crosses below 30 and the close sits under the
/// lower band at index 30.
pub fn drop_then_rise(n: usize) -> Vec<Bar> {
    let mut bars = choppy_prefix();
    bars.push(ohlc_bar(30, 100.0, 100.5, 89.5, 90.0));
    for k in 1..n.saturating_sub(30) {
        bars.push(make_bar(30 + k, 90.0 + k as f64));
    }
    bars
}

/// Same entry as [`drop_then_rise`], then a second leg down through the stop.
pub fn drop_then_crash(n: usize) -> Vec<Bar> {
    let mut bars = choppy_prefix();
    bars.push(ohlc_bar(30, 100.0, 100.5, 89.5, 90.0));
    bars.push(ohlc_bar(31, 88.0, 88.0, 84.5, 85.0));
    for i in 32..n {
        bars.push(make_bar(i, 85.0));
    }
    bars
}

/// Bars from a list of closes.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c))
        .collect()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig::default()
}
