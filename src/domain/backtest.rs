//! Backtest engine and event loop.
//!
//! Single pass over the bars. For each bar, in order:
//!
//! 1. train the oracle once the training window has closed
//! 2. advance the indicator engine
//! 3. ask the oracle for a vote on the trailing window
//! 4. combine into a signal
//! 5. step the position state machine and settle any realized trade
//! 6. record an equity point
//!
//! All mutable run state lives in [`SimulationContext`]; nothing a bar
//! produces can be observed by an earlier bar.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::error::AitraderError;
use crate::domain::indicator::{IndicatorConfig, IndicatorEngine, IndicatorFrame};
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::{validate_bars, Bar};
use crate::domain::oracle::{OracleAdapter, TrainingSummary};
use crate::domain::position::{PositionManager, RiskParams, Side, Trade, TradeKind, Transition};
use crate::domain::signal::{CombinePolicy, SignalDecision, SignalGenerator, SignalThresholds};
use crate::domain::sizing::{PositionSizer, SizingParams};
use crate::ports::oracle_port::SignalOracle;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    pub indicators: IndicatorConfig,
    pub thresholds: SignalThresholds,
    pub policy: CombinePolicy,
    pub risk: RiskParams,
    pub sizing: SizingParams,
    /// Bars reserved for oracle training; votes before this index are Hold.
    pub oracle_train_bars: usize,
    /// Trailing bars handed to the oracle per vote.
    pub oracle_window: usize,
    /// Prediction horizon in bars.
    pub horizon: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            indicators: IndicatorConfig::default(),
            thresholds: SignalThresholds::default(),
            policy: CombinePolicy::default(),
            risk: RiskParams::default(),
            sizing: SizingParams::default(),
            oracle_train_bars: 0,
            oracle_window: 11,
            horizon: 5,
        }
    }
}

impl BacktestConfig {
    /// Smallest bar count that yields a meaningful run.
    pub fn required_bars(&self) -> usize {
        self.indicators.warmup_bars() + self.horizon + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    /// Realized balance.
    pub balance: f64,
    pub side: Side,
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    InsufficientData { bars: usize, required: usize },
}

/// Per-kind trade counts and average entry prices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeAnalysis {
    pub counts: Vec<(TradeKind, usize)>,
    pub avg_long_entry: Option<f64>,
    pub avg_short_entry: Option<f64>,
}

impl TradeAnalysis {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let counts = TradeKind::ALL
            .iter()
            .map(|&kind| (kind, trades.iter().filter(|t| t.kind == kind).count()))
            .collect();
        let avg_entry = |kind: TradeKind| {
            let prices: Vec<f64> = trades
                .iter()
                .filter(|t| t.kind == kind)
                .map(|t| t.price)
                .collect();
            if prices.is_empty() {
                None
            } else {
                Some(prices.iter().sum::<f64>() / prices.len() as f64)
            }
        };
        Self {
            counts,
            avg_long_entry: avg_entry(TradeKind::Buy),
            avg_short_entry: avg_entry(TradeKind::Sell),
        }
    }

    pub fn count(&self, kind: TradeKind) -> usize {
        self.counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub status: RunStatus,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// One decision per bar, aligned with `equity_curve`.
    pub decisions: Vec<SignalDecision>,
    pub metrics: Metrics,
    pub analysis: TradeAnalysis,
    pub training: Option<TrainingSummary>,
    pub oracle_unavailable: usize,
}

impl BacktestResult {
    fn insufficient(initial_balance: f64, bars: usize, required: usize) -> Self {
        Self {
            status: RunStatus::InsufficientData { bars, required },
            initial_balance,
            final_balance: initial_balance,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            decisions: Vec::new(),
            metrics: Metrics::default(),
            analysis: TradeAnalysis::default(),
            training: None,
            oracle_unavailable: 0,
        }
    }
}

/// Mutable state of one run, owned by the loop.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub balance: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub decisions: Vec<SignalDecision>,
}

impl SimulationContext {
    pub fn new(initial_balance: f64, capacity: usize) -> Self {
        Self {
            balance: initial_balance,
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(capacity),
            decisions: Vec::with_capacity(capacity),
        }
    }

    fn settle(&mut self, transition: &Transition) {
        self.balance *= transition.balance_factor();
        self.trades.push(*transition.trade());
    }
}

fn step(
    ctx: &mut SimulationContext,
    manager: &mut PositionManager,
    bar: &Bar,
    frame: &IndicatorFrame,
    decision: SignalDecision,
) {
    if let Some(transition) = manager.on_bar(bar, frame, decision.signal, ctx.balance) {
        ctx.settle(&transition);
    }
    let position = manager.position();
    ctx.equity_curve.push(EquityPoint {
        timestamp: bar.timestamp,
        balance: ctx.balance,
        side: position.side,
        unrealized_pnl: position.unrealized_pnl(bar.close),
    });
    ctx.decisions.push(decision);
}

/// Run the strategy over `bars`.
///
/// Invalid bar sequences are rejected; too-short sequences produce an
/// `InsufficientData` result rather than an error.
pub fn run_backtest(
    bars: &[Bar],
    config: &BacktestConfig,
    oracle: &mut dyn SignalOracle,
) -> Result<BacktestResult, AitraderError> {
    validate_bars(bars)?;

    let required = config.required_bars();
    if bars.len() < required {
        warn!(bars = bars.len(), required, "insufficient data, nothing simulated");
        return Ok(BacktestResult::insufficient(
            config.initial_balance,
            bars.len(),
            required,
        ));
    }

    let mut engine = IndicatorEngine::new(&config.indicators);
    let mut generator = SignalGenerator::new(config.thresholds, config.policy);
    let mut manager = PositionManager::new(config.risk, PositionSizer::new(config.sizing));
    let mut adapter = OracleAdapter::new(oracle);
    let mut ctx = SimulationContext::new(config.initial_balance, bars.len());

    if config.oracle_train_bars >= bars.len() {
        warn!(
            train_bars = config.oracle_train_bars,
            bars = bars.len(),
            "oracle training window covers the whole series, oracle stays untrained"
        );
    }

    for (i, bar) in bars.iter().enumerate() {
        if i == config.oracle_train_bars {
            adapter.train(&bars[..i]);
        }
        let frame = engine.update(bar);
        let start = (i + 1).saturating_sub(config.oracle_window);
        let vote = adapter.vote(&bars[start..=i]);
        let decision = generator.evaluate(&frame, vote);
        step(&mut ctx, &mut manager, bar, &frame, decision);
    }

    let metrics = Metrics::compute(config.initial_balance, &ctx.equity_curve, &ctx.trades);
    info!(
        bars = bars.len(),
        trades = metrics.total_trades,
        total_return = metrics.total_return,
        max_drawdown = metrics.max_drawdown,
        oracle_unavailable = adapter.unavailable_votes(),
        "backtest complete"
    );

    Ok(BacktestResult {
        status: RunStatus::Completed,
        initial_balance: config.initial_balance,
        final_balance: ctx.balance,
        analysis: TradeAnalysis::from_trades(&ctx.trades),
        trades: ctx.trades,
        equity_curve: ctx.equity_curve,
        decisions: ctx.decisions,
        metrics,
        training: adapter.summary(),
        oracle_unavailable: adapter.unavailable_votes(),
    })
}
