//! Performance metrics over a finished run.

use serde::Serialize;

use super::backtest::EquityPoint;
use super::position::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Metrics {
    /// Percent.
    pub total_return: f64,
    /// Percent, from the running peak of the realized balance.
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    /// Percent of trade records that are winning exits.
    pub win_rate: f64,
    pub total_trades: usize,
    /// Hours between paired entry and exit records.
    pub avg_holding_time: f64,
}

impl Metrics {
    pub fn compute(initial_balance: f64, equity_curve: &[EquityPoint], trades: &[Trade]) -> Self {
        let final_balance = equity_curve
            .last()
            .map(|p| p.balance)
            .unwrap_or(initial_balance);

        let total_return = if initial_balance > 0.0 {
            (final_balance / initial_balance - 1.0) * 100.0
        } else {
            0.0
        };

        let wins = trades.iter().filter(|t| t.kind.is_win()).count();
        let win_rate = if trades.is_empty() {
            0.0
        } else {
            wins as f64 / trades.len() as f64 * 100.0
        };

        Metrics {
            total_return,
            max_drawdown: compute_drawdown(initial_balance, equity_curve) * 100.0,
            sharpe_ratio: compute_sharpe(equity_curve),
            win_rate,
            total_trades: trades.len(),
            avg_holding_time: average_holding_hours(trades),
        }
    }
}

/// Largest fractional decline from the running peak; the initial balance
/// seeds the peak.
fn compute_drawdown(initial_balance: f64, equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = initial_balance;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.balance > peak {
            peak = point.balance;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.balance) / peak);
        }
    }
    max_dd
}

/// sqrt(252) × mean / sample std of per-bar balance changes.
fn compute_sharpe(equity_curve: &[EquityPoint]) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter(|w| w[0].balance > 0.0)
        .map(|w| w[1].balance / w[0].balance - 1.0)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();
    if stddev > 0.0 {
        TRADING_DAYS_PER_YEAR.sqrt() * mean / stddev
    } else {
        0.0
    }
}

fn average_holding_hours(trades: &[Trade]) -> f64 {
    let mut open = None;
    let mut total_seconds = 0i64;
    let mut pairs = 0usize;
    for trade in trades {
        if trade.kind.is_entry() {
            open = Some(trade.timestamp);
        } else if let Some(entry) = open.take() {
            total_seconds += (trade.timestamp - entry).num_seconds();
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total_seconds as f64 / pairs as f64 / 3600.0
    }
}
