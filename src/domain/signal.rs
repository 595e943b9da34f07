//! Per-bar signal generation.
//!
//! Each bar yields independent sub-signals from the indicator frame:
//!
//! - RSI crossover (edge-triggered against the previous frame)
//! - MACD line crossing its signal line (edge-triggered)
//! - Bollinger band breach (level)
//! - Close relative to the moving average (level, weighted policy only)
//!
//! A [`CombinePolicy`] folds them together with the oracle vote into one
//! [`Signal`]. Any undefined input makes the affected sub-signal `Hold`.

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::IndicatorFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    /// +1 / -1 / 0.
    pub fn direction(self) -> f64 {
        match self {
            Signal::Buy => 1.0,
            Signal::Sell => -1.0,
            Signal::Hold => 0.0,
        }
    }

    pub fn opposite(self) -> Signal {
        match self {
            Signal::Buy => Signal::Sell,
            Signal::Sell => Signal::Buy,
            Signal::Hold => Signal::Hold,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Buy => "buy",
            Signal::Sell => "sell",
            Signal::Hold => "hold",
        };
        f.write_str(s)
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Signal::Buy),
            "sell" => Ok(Signal::Sell),
            "hold" => Ok(Signal::Hold),
            other => Err(format!("unknown signal '{other}', expected buy, sell or hold")),
        }
    }
}

/// How technical sub-signals and the oracle vote combine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CombinePolicy {
    /// Technical rule AND oracle agreement.
    #[default]
    Conjunctive,
    /// Continuous blend; fires when |score| exceeds `threshold`.
    Weighted { oracle_weight: f64, threshold: f64 },
    /// At least three of RSI, MACD, Bollinger and oracle agree.
    Majority,
    /// Technical rule alone; the oracle vote is ignored.
    TechnicalOnly,
}

impl CombinePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            CombinePolicy::Conjunctive => "conjunctive",
            CombinePolicy::Weighted { .. } => "weighted",
            CombinePolicy::Majority => "majority",
            CombinePolicy::TechnicalOnly => "technical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubSignals {
    pub rsi: Signal,
    pub macd: Signal,
    pub bollinger: Signal,
    pub ma: Signal,
}

impl SubSignals {
    /// Buy if RSI and either MACD or Bollinger agree on Buy; Sell symmetric.
    pub fn technical(&self) -> Signal {
        for side in [Signal::Buy, Signal::Sell] {
            if self.rsi == side && (self.macd == side || self.bollinger == side) {
                return side;
            }
        }
        Signal::Hold
    }
}

/// Outcome for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalDecision {
    pub signal: Signal,
    /// Blend score in [-1, 1] for the weighted policy, otherwise the
    /// direction of `signal`.
    pub strength: f64,
    pub sub: SubSignals,
    pub technical: Signal,
    pub oracle: Signal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PrevFrame {
    rsi: Option<f64>,
    macd: Option<f64>,
    macd_signal: Option<f64>,
}

/// Stateful generator: remembers the previous frame for crossovers.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    thresholds: SignalThresholds,
    policy: CombinePolicy,
    prev: Option<PrevFrame>,
}

impl SignalGenerator {
    pub fn new(thresholds: SignalThresholds, policy: CombinePolicy) -> Self {
        Self {
            thresholds,
            policy,
            prev: None,
        }
    }

    pub fn policy(&self) -> CombinePolicy {
        self.policy
    }

    pub fn evaluate(&mut self, frame: &IndicatorFrame, oracle: Signal) -> SignalDecision {
        let prev = self.prev.replace(PrevFrame {
            rsi: frame.rsi,
            macd: frame.macd,
            macd_signal: frame.macd_signal,
        });

        let sub = SubSignals {
            rsi: self.rsi_cross(prev.and_then(|p| p.rsi), frame.rsi),
            macd: macd_cross(prev, frame),
            bollinger: band_breach(frame),
            ma: ma_level(frame),
        };
        let technical = sub.technical();

        let (signal, strength) = match self.policy {
            CombinePolicy::Conjunctive => {
                let s = if technical != Signal::Hold && technical == oracle {
                    technical
                } else {
                    Signal::Hold
                };
                (s, s.direction())
            }
            CombinePolicy::TechnicalOnly => (technical, technical.direction()),
            CombinePolicy::Majority => {
                let voters = [sub.rsi, sub.macd, sub.bollinger, oracle];
                let s = [Signal::Buy, Signal::Sell]
                    .into_iter()
                    .find(|side| voters.iter().filter(|v| *v == side).count() >= 3)
                    .unwrap_or(Signal::Hold);
                (s, s.direction())
            }
            CombinePolicy::Weighted {
                oracle_weight,
                threshold,
            } => {
                let score = (1.0 - oracle_weight) * self.technical_score(frame, &sub)
                    + oracle_weight * oracle.direction();
                let s = if score > threshold {
                    Signal::Buy
                } else if score < -threshold {
                    Signal::Sell
                } else {
                    Signal::Hold
                };
                (s, score)
            }
        };

        SignalDecision {
            signal,
            strength,
            sub,
            technical,
            oracle,
        }
    }

    fn rsi_cross(&self, prev: Option<f64>, curr: Option<f64>) -> Signal {
        let (Some(prev), Some(curr)) = (prev, curr) else {
            return Signal::Hold;
        };
        let t = &self.thresholds;
        if prev >= t.rsi_oversold && curr < t.rsi_oversold {
            Signal::Buy
        } else if prev <= t.rsi_overbought && curr > t.rsi_overbought {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    /// Weighted level score in [-1, 1]: RSI zone 0.3, MACD side 0.3,
    /// Bollinger breach 0.2, close vs MA 0.2.
    fn technical_score(&self, frame: &IndicatorFrame, sub: &SubSignals) -> f64 {
        let t = &self.thresholds;
        let rsi_level = match frame.rsi {
            Some(r) if r < t.rsi_oversold => 1.0,
            Some(r) if r > t.rsi_overbought => -1.0,
            _ => 0.0,
        };
        let macd_level = match (frame.macd, frame.macd_signal) {
            (Some(m), Some(s)) if m > s => 1.0,
            (Some(m), Some(s)) if m < s => -1.0,
            _ => 0.0,
        };
        0.3 * rsi_level + 0.3 * macd_level + 0.2 * sub.bollinger.direction() + 0.2 * sub.ma.direction()
    }
}

fn macd_cross(prev: Option<PrevFrame>, frame: &IndicatorFrame) -> Signal {
    let Some(prev) = prev else {
        return Signal::Hold;
    };
    let (Some(pm), Some(ps), Some(cm), Some(cs)) =
        (prev.macd, prev.macd_signal, frame.macd, frame.macd_signal)
    else {
        return Signal::Hold;
    };
    if cm > cs && pm <= ps {
        Signal::Buy
    } else if cm < cs && pm >= ps {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

fn band_breach(frame: &IndicatorFrame) -> Signal {
    match (frame.bb_lower, frame.bb_upper) {
        (Some(lower), _) if frame.close < lower => Signal::Buy,
        (_, Some(upper)) if frame.close > upper => Signal::Sell,
        _ => Signal::Hold,
    }
}

fn ma_level(frame: &IndicatorFrame) -> Signal {
    match frame.ma {
        Some(ma) if frame.close > ma => Signal::Buy,
        Some(ma) if frame.close < ma => Signal::Sell,
        _ => Signal::Hold,
    }
}
