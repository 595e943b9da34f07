//! Technical indicators.
//!
//! Every indicator is a streaming accumulator fed one bar at a time, so a
//! frame for bar i can only ever see bars 0..=i. Values that are still
//! warming up are `None`; downstream consumers treat `None` as "no opinion",
//! never as zero.
//!
//! - [`IndicatorConfig`]: periods and multipliers for every family
//! - [`IndicatorFrame`]: all indicator values for one bar
//! - [`IndicatorEngine`]: owns the accumulators and produces frames

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod volatility;
pub mod volume_profile;
pub mod window;

use chrono::NaiveDateTime;

use crate::domain::ohlcv::Bar;
use atr::Atr;
use bollinger::Bollinger;
use macd::Macd;
use rsi::Rsi;
use volatility::Volatility;
use volume_profile::VolumeProfile;
use window::RollingWindow;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    pub ma_period: usize,
    pub ma_fast: usize,
    pub ma_slow: usize,
    pub atr_period: usize,
    pub volatility_window: usize,
    pub volume_profile_bins: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            rsi_period: 14,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            bb_period: 20,
            bb_std: 2.0,
            ma_period: 20,
            ma_fast: 10,
            ma_slow: 30,
            atr_period: 14,
            volatility_window: volatility::DEFAULT_WINDOW,
            volume_profile_bins: 20,
        }
    }
}

impl IndicatorConfig {
    /// Number of bars after which every indicator family is defined.
    pub fn warmup_bars(&self) -> usize {
        [
            self.rsi_period + 1,
            self.macd_fast.max(self.macd_slow) + self.macd_signal.saturating_sub(1),
            self.bb_period,
            self.ma_period,
            self.ma_fast,
            self.ma_slow,
            self.atr_period,
            self.volatility_window + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub ma: Option<f64>,
    pub ma_fast: Option<f64>,
    pub ma_slow: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub atr: Option<f64>,
    pub volatility: Option<f64>,
    pub volume_profile_bucket: Option<usize>,
}

impl IndicatorFrame {
    /// True once every value in the frame is defined.
    pub fn is_complete(&self) -> bool {
        [
            self.rsi,
            self.macd,
            self.macd_signal,
            self.macd_hist,
            self.ma,
            self.ma_fast,
            self.ma_slow,
            self.bb_upper,
            self.bb_middle,
            self.bb_lower,
            self.atr,
            self.volatility,
        ]
        .iter()
        .all(Option::is_some)
            && self.volume_profile_bucket.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    rsi: Rsi,
    macd: Macd,
    bollinger: Bollinger,
    ma: RollingWindow,
    ma_fast: RollingWindow,
    ma_slow: RollingWindow,
    atr: Atr,
    volatility: Volatility,
    profile: VolumeProfile,
}

impl IndicatorEngine {
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            rsi: Rsi::new(config.rsi_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            bollinger: Bollinger::new(config.bb_period, config.bb_std),
            ma: RollingWindow::new(config.ma_period),
            ma_fast: RollingWindow::new(config.ma_fast),
            ma_slow: RollingWindow::new(config.ma_slow),
            atr: Atr::new(config.atr_period),
            volatility: Volatility::new(config.volatility_window),
            profile: VolumeProfile::new(config.volume_profile_bins),
        }
    }

    /// Advance every accumulator by one bar and return the frame for it.
    pub fn update(&mut self, bar: &Bar) -> IndicatorFrame {
        let close = bar.close;
        let macd = self.macd.update(close);
        let bands = self.bollinger.update(close);
        self.ma.push(close);
        self.ma_fast.push(close);
        self.ma_slow.push(close);

        IndicatorFrame {
            timestamp: bar.timestamp,
            close,
            rsi: self.rsi.update(close),
            macd: macd.line,
            macd_signal: macd.signal,
            macd_hist: macd.histogram,
            ma: self.ma.mean(),
            ma_fast: self.ma_fast.mean(),
            ma_slow: self.ma_slow.mean(),
            bb_upper: bands.map(|b| b.upper),
            bb_middle: bands.map(|b| b.middle),
            bb_lower: bands.map(|b| b.lower),
            atr: self.atr.update(bar),
            volatility: self.volatility.update(close),
            volume_profile_bucket: self.profile.update(close),
        }
    }
}

/// Frames for a whole bar series, one per bar.
pub fn compute_frames(bars: &[Bar], config: &IndicatorConfig) -> Vec<IndicatorFrame> {
    let mut engine = IndicatorEngine::new(config);
    bars.iter().map(|bar| engine.update(bar)).collect()
}
