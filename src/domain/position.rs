//! Position lifecycle state machine.
//!
//! States are `Flat`, `Long` and `Short`. On every bar exits are evaluated
//! before entries, and at most one transition fires:
//!
//! | state | guard (in order)                           | emits               | fill          |
//! |-------|--------------------------------------------|---------------------|---------------|
//! | Long  | low <= stop_loss                           | `stop_loss`         | stop level    |
//! | Long  | high >= take_profit                        | `take_profit`       | target level  |
//! | Long  | close below extreme by > max_drawdown_pct  | `trailing_drawdown` | close         |
//! | Long  | Sell signal                                | `signal_exit`       | close         |
//! | Short | mirror of Long                             |                     |               |
//! | Flat  | Buy / Sell signal, cooldown elapsed        | `buy` / `sell`      | close         |
//!
//! A bar that exits ends Flat. Entries resume on the next bar, or
//! `cooldown_bars` bars later when a cooldown is configured.
//!
//! An exit multiplies the realized balance by the direction-adjusted price
//! ratio. With `scale_by_exposure` set, only the committed fraction of the
//! balance moves: `1 + exposure * (ratio - 1)`.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::indicator::IndicatorFrame;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::Signal;
use crate::domain::sizing::PositionSizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Flat,
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Flat => "flat",
            Side::Long => "long",
            Side::Short => "short",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub size: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    /// Best close seen since entry.
    pub favorable_extreme: f64,
    /// Fraction of balance committed at entry.
    pub exposure: f64,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.side == Side::Flat
    }

    /// Direction-adjusted price ratio: exit/entry for longs, entry/exit for shorts.
    pub fn price_ratio(&self, price: f64) -> f64 {
        match self.side {
            Side::Long => price / self.entry_price,
            Side::Short => self.entry_price / price,
            Side::Flat => 1.0,
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        self.size * self.entry_price * (self.price_ratio(price) - 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Buy,
    Sell,
    StopLoss,
    TakeProfit,
    TrailingDrawdown,
    SignalExit,
}

impl TradeKind {
    pub const ALL: [TradeKind; 6] = [
        TradeKind::Buy,
        TradeKind::Sell,
        TradeKind::StopLoss,
        TradeKind::TakeProfit,
        TradeKind::TrailingDrawdown,
        TradeKind::SignalExit,
    ];

    pub fn is_entry(self) -> bool {
        matches!(self, TradeKind::Buy | TradeKind::Sell)
    }

    /// Exit kinds counted as wins.
    pub fn is_win(self) -> bool {
        matches!(self, TradeKind::TakeProfit | TradeKind::TrailingDrawdown)
    }
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeKind::Buy => "buy",
            TradeKind::Sell => "sell",
            TradeKind::StopLoss => "stop_loss",
            TradeKind::TakeProfit => "take_profit",
            TradeKind::TrailingDrawdown => "trailing_drawdown",
            TradeKind::SignalExit => "signal_exit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trade {
    pub kind: TradeKind,
    pub price: f64,
    pub size: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParams {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_drawdown_pct: f64,
    pub use_atr_stop: bool,
    pub cooldown_bars: usize,
    pub scale_by_exposure: bool,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.03,
            take_profit_pct: 0.06,
            max_drawdown_pct: 0.05,
            use_atr_stop: false,
            cooldown_bars: 0,
            scale_by_exposure: false,
        }
    }
}

/// What a bar did to the position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Entered(Trade),
    Exited {
        trade: Trade,
        balance_factor: f64,
    },
}

impl Transition {
    pub fn trade(&self) -> &Trade {
        match self {
            Transition::Entered(trade) => trade,
            Transition::Exited { trade, .. } => trade,
        }
    }

    /// Multiplier applied to the realized balance.
    pub fn balance_factor(&self) -> f64 {
        match self {
            Transition::Entered(_) => 1.0,
            Transition::Exited { balance_factor, .. } => *balance_factor,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    risk: RiskParams,
    sizer: PositionSizer,
    position: Position,
    cooldown: usize,
}

impl PositionManager {
    pub fn new(risk: RiskParams, sizer: PositionSizer) -> Self {
        Self {
            risk,
            sizer,
            position: Position::flat(),
            cooldown: 0,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Advance the state machine by one bar.
    pub fn on_bar(
        &mut self,
        bar: &Bar,
        frame: &IndicatorFrame,
        signal: Signal,
        balance: f64,
    ) -> Option<Transition> {
        match self.position.side {
            Side::Flat => {
                if self.cooldown > 0 {
                    self.cooldown -= 1;
                    return None;
                }
                self.enter(bar, frame, signal, balance)
            }
            Side::Long | Side::Short => self.check_exits(bar, signal),
        }
    }

    fn enter(
        &mut self,
        bar: &Bar,
        frame: &IndicatorFrame,
        signal: Signal,
        balance: f64,
    ) -> Option<Transition> {
        let (side, kind) = match signal {
            Signal::Buy => (Side::Long, TradeKind::Buy),
            Signal::Sell => (Side::Short, TradeKind::Sell),
            Signal::Hold => return None,
        };
        let price = bar.close;
        let sizing = self.sizer.size(balance, price, frame.volatility, frame.atr);
        if sizing.size <= 0.0 {
            debug!(timestamp = %bar.timestamp, "entry skipped: zero size");
            return None;
        }

        let sign = if side == Side::Long { 1.0 } else { -1.0 };
        let pct_stop = price * (1.0 - sign * self.risk.stop_loss_pct);
        let stop_loss_price = match sizing.stop_distance {
            Some(d) if self.risk.use_atr_stop && price - sign * d > 0.0 => price - sign * d,
            _ => pct_stop,
        };

        self.position = Position {
            side,
            entry_price: price,
            size: sizing.size,
            stop_loss_price,
            take_profit_price: price * (1.0 + sign * self.risk.take_profit_pct),
            favorable_extreme: price,
            exposure: sizing.size * price / balance,
        };
        info!(
            timestamp = %bar.timestamp,
            side = %side,
            price,
            size = sizing.size,
            stop = stop_loss_price,
            target = self.position.take_profit_price,
            "position opened"
        );
        Some(Transition::Entered(Trade {
            kind,
            price,
            size: sizing.size,
            timestamp: bar.timestamp,
        }))
    }

    fn check_exits(&mut self, bar: &Bar, signal: Signal) -> Option<Transition> {
        let (kind, price) = self.exit_trigger(bar, signal)?;
        let closed = self.position;
        let price_ratio = closed.price_ratio(price);
        let balance_factor = if self.risk.scale_by_exposure {
            1.0 + closed.exposure * (price_ratio - 1.0)
        } else {
            price_ratio
        };
        let transition = Transition::Exited {
            trade: Trade {
                kind,
                price,
                size: closed.size,
                timestamp: bar.timestamp,
            },
            balance_factor,
        };
        info!(
            timestamp = %bar.timestamp,
            side = %closed.side,
            exit = %kind,
            entry = closed.entry_price,
            price,
            "position closed"
        );
        self.position = Position::flat();
        self.cooldown = self.risk.cooldown_bars;
        Some(transition)
    }

    /// First exit guard that fires, with its fill price.
    fn exit_trigger(&mut self, bar: &Bar, signal: Signal) -> Option<(TradeKind, f64)> {
        let pos = &mut self.position;
        let long = pos.side == Side::Long;

        let stopped = if long {
            bar.low <= pos.stop_loss_price
        } else {
            bar.high >= pos.stop_loss_price
        };
        if stopped {
            return Some((TradeKind::StopLoss, pos.stop_loss_price));
        }

        let target_hit = if long {
            bar.high >= pos.take_profit_price
        } else {
            bar.low <= pos.take_profit_price
        };
        if target_hit {
            return Some((TradeKind::TakeProfit, pos.take_profit_price));
        }

        let close = bar.close;
        let new_extreme = if long {
            close > pos.favorable_extreme
        } else {
            close < pos.favorable_extreme
        };
        if new_extreme {
            pos.favorable_extreme = close;
        } else {
            let giveback = if long {
                (pos.favorable_extreme - close) / pos.favorable_extreme
            } else {
                (close - pos.favorable_extreme) / pos.favorable_extreme
            };
            if giveback > self.risk.max_drawdown_pct {
                return Some((TradeKind::TrailingDrawdown, close));
            }
        }

        let entry_signal = if long { Signal::Buy } else { Signal::Sell };
        if signal == entry_signal.opposite() {
            return Some((TradeKind::SignalExit, close));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sizing::SizingParams;
    use chrono::{Duration, NaiveDate};

    fn ts(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(i)
    }

    fn bar(i: i64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: ts(i),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn flat_bar(i: i64, close: f64) -> Bar {
        bar(i, close, close, close)
    }

    fn frame(i: i64, close: f64) -> IndicatorFrame {
        IndicatorFrame {
            timestamp: ts(i),
            close,
            rsi: None,
            macd: None,
            macd_signal: None,
            macd_hist: None,
            ma: None,
            ma_fast: None,
            ma_slow: None,
            bb_upper: None,
            bb_middle: None,
            bb_lower: None,
            atr: Some(2.0),
            volatility: Some(0.0),
            volume_profile_bucket: None,
        }
    }

    fn manager(risk: RiskParams) -> PositionManager {
        let sizer = PositionSizer::new(SizingParams {
            max_position_fraction: 1.0,
            volatility_threshold: 1.0,
            atr_multiplier: 2.0,
        });
        PositionManager::new(risk, sizer)
    }

    fn open_long(pm: &mut PositionManager) {
        let t = pm.on_bar(&flat_bar(0, 100.0), &frame(0, 100.0), Signal::Buy, 10_000.0);
        assert!(matches!(t, Some(Transition::Entered(_))));
    }

    fn open_short(pm: &mut PositionManager) {
        let t = pm.on_bar(&flat_bar(0, 100.0), &frame(0, 100.0), Signal::Sell, 10_000.0);
        assert!(matches!(t, Some(Transition::Entered(_))));
    }

    #[test]
    fn flat_position_invariants() {
        let pos = Position::flat();
        assert!(pos.is_flat());
        assert_eq!(pos.size, 0.0);
        assert_eq!(pos.entry_price, 0.0);
        assert_eq!(pos.unrealized_pnl(123.0), 0.0);
    }

    #[test]
    fn buy_opens_long_with_levels() {
        let mut pm = manager(RiskParams::default());
        let t = pm
            .on_bar(&flat_bar(0, 100.0), &frame(0, 100.0), Signal::Buy, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::Buy);
        assert!((t.trade().size - 100.0).abs() < 1e-9);

        let pos = pm.position();
        assert_eq!(pos.side, Side::Long);
        assert!((pos.stop_loss_price - 97.0).abs() < 1e-9);
        assert!((pos.take_profit_price - 106.0).abs() < 1e-9);
        assert!((pos.favorable_extreme - 100.0).abs() < f64::EPSILON);
        assert!((pos.exposure - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sell_opens_short_with_inverted_levels() {
        let mut pm = manager(RiskParams::default());
        open_short(&mut pm);
        let pos = pm.position();
        assert_eq!(pos.side, Side::Short);
        assert!((pos.stop_loss_price - 103.0).abs() < 1e-9);
        assert!((pos.take_profit_price - 94.0).abs() < 1e-9);
    }

    #[test]
    fn hold_stays_flat() {
        let mut pm = manager(RiskParams::default());
        assert!(pm.on_bar(&flat_bar(0, 100.0), &frame(0, 100.0), Signal::Hold, 10_000.0).is_none());
        assert!(pm.position().is_flat());
    }

    #[test]
    fn stop_loss_fills_at_stop_level() {
        let mut pm = manager(RiskParams::default());
        open_long(&mut pm);
        let t = pm
            .on_bar(&bar(1, 99.0, 90.0, 91.0), &frame(1, 91.0), Signal::Hold, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::StopLoss);
        assert!((t.trade().price - 97.0).abs() < 1e-9);
        assert!((t.balance_factor() - 0.97).abs() < 1e-12);
        assert!(pm.position().is_flat());
        assert_eq!(pm.position().size, 0.0);
    }

    #[test]
    fn stop_loss_beats_take_profit_on_wide_bar() {
        let mut pm = manager(RiskParams::default());
        open_long(&mut pm);
        let t = pm
            .on_bar(&bar(1, 110.0, 90.0, 100.0), &frame(1, 100.0), Signal::Hold, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::StopLoss);
    }

    #[test]
    fn take_profit_fills_at_target() {
        let mut pm = manager(RiskParams::default());
        open_long(&mut pm);
        let t = pm
            .on_bar(&bar(1, 107.0, 101.0, 106.5), &frame(1, 106.5), Signal::Hold, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::TakeProfit);
        assert!((t.trade().price - 106.0).abs() < 1e-9);
        assert!((t.balance_factor() - 1.06).abs() < 1e-12);
    }

    #[test]
    fn trailing_drawdown_after_new_high() {
        let risk = RiskParams {
            stop_loss_pct: 0.5,
            take_profit_pct: 0.5,
            max_drawdown_pct: 0.05,
            ..RiskParams::default()
        };
        let mut pm = manager(risk);
        open_long(&mut pm);
        assert!(pm.on_bar(&flat_bar(1, 120.0), &frame(1, 120.0), Signal::Hold, 10_000.0).is_none());
        assert!((pm.position().favorable_extreme - 120.0).abs() < f64::EPSILON);
        // 4% off the high: still open
        assert!(pm.on_bar(&flat_bar(2, 115.2), &frame(2, 115.2), Signal::Hold, 10_000.0).is_none());
        let t = pm
            .on_bar(&flat_bar(3, 113.0), &frame(3, 113.0), Signal::Hold, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::TrailingDrawdown);
        assert!((t.trade().price - 113.0).abs() < f64::EPSILON);
    }

    #[test]
    fn opposing_signal_exits_at_close() {
        let mut pm = manager(RiskParams::default());
        open_long(&mut pm);
        let t = pm
            .on_bar(&flat_bar(1, 101.0), &frame(1, 101.0), Signal::Sell, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::SignalExit);
        assert!((t.trade().price - 101.0).abs() < f64::EPSILON);
        // exit bar never re-enters
        assert!(pm.position().is_flat());
    }

    #[test]
    fn same_direction_signal_keeps_position() {
        let mut pm = manager(RiskParams::default());
        open_long(&mut pm);
        assert!(pm.on_bar(&flat_bar(1, 101.0), &frame(1, 101.0), Signal::Buy, 10_000.0).is_none());
        assert_eq!(pm.position().side, Side::Long);
    }

    #[test]
    fn short_exits_mirror_long() {
        let mut pm = manager(RiskParams::default());
        open_short(&mut pm);
        let t = pm
            .on_bar(&bar(1, 104.0, 100.0, 103.5), &frame(1, 103.5), Signal::Hold, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::StopLoss);
        assert!((t.trade().price - 103.0).abs() < 1e-9);
        // entry/exit = 100/103
        assert!((t.balance_factor() - 100.0 / 103.0).abs() < 1e-12);

        let mut pm = manager(RiskParams::default());
        open_short(&mut pm);
        let t = pm
            .on_bar(&bar(1, 99.0, 93.0, 95.0), &frame(1, 95.0), Signal::Hold, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::TakeProfit);

        let mut pm = manager(RiskParams::default());
        open_short(&mut pm);
        let t = pm
            .on_bar(&flat_bar(1, 99.0), &frame(1, 99.0), Signal::Buy, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::SignalExit);
    }

    #[test]
    fn cooldown_delays_reentry() {
        let risk = RiskParams {
            cooldown_bars: 2,
            ..RiskParams::default()
        };
        let mut pm = manager(risk);
        open_long(&mut pm);
        pm.on_bar(&flat_bar(1, 101.0), &frame(1, 101.0), Signal::Sell, 10_000.0)
            .unwrap();
        assert!(pm.on_bar(&flat_bar(2, 101.0), &frame(2, 101.0), Signal::Buy, 10_000.0).is_none());
        assert!(pm.on_bar(&flat_bar(3, 101.0), &frame(3, 101.0), Signal::Buy, 10_000.0).is_none());
        assert!(pm.on_bar(&flat_bar(4, 101.0), &frame(4, 101.0), Signal::Buy, 10_000.0).is_some());
    }

    #[test]
    fn atr_stop_replaces_percentage_stop() {
        let risk = RiskParams {
            use_atr_stop: true,
            ..RiskParams::default()
        };
        let mut pm = manager(risk);
        open_long(&mut pm);
        // atr 2.0 × multiplier 2.0
        assert!((pm.position().stop_loss_price - 96.0).abs() < 1e-9);
    }

    fn quarter_sized(risk: RiskParams) -> PositionManager {
        let sizer = PositionSizer::new(SizingParams {
            max_position_fraction: 0.25,
            volatility_threshold: 1.0,
            atr_multiplier: 2.0,
        });
        PositionManager::new(risk, sizer)
    }

    #[test]
    fn stop_loss_costs_full_stop_distance_regardless_of_size() {
        let mut pm = quarter_sized(RiskParams::default());
        open_long(&mut pm);
        assert!((pm.position().exposure - 0.25).abs() < 1e-12);
        let t = pm
            .on_bar(&bar(1, 99.0, 90.0, 91.0), &frame(1, 91.0), Signal::Hold, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::StopLoss);
        assert!((t.trade().size - 25.0).abs() < 1e-9);
        assert!((t.balance_factor() - 0.97).abs() < 1e-12);
    }

    #[test]
    fn exposure_scaling_moves_only_committed_fraction() {
        let risk = RiskParams {
            scale_by_exposure: true,
            ..RiskParams::default()
        };
        let mut pm = quarter_sized(risk);
        open_long(&mut pm);
        let t = pm
            .on_bar(&bar(1, 107.0, 101.0, 106.5), &frame(1, 106.5), Signal::Hold, 10_000.0)
            .unwrap();
        assert_eq!(t.trade().kind, TradeKind::TakeProfit);
        // 1 + 0.25 × 0.06
        assert!((t.balance_factor() - 1.015).abs() < 1e-12);
    }

    #[test]
    fn unrealized_pnl_tracks_committed_capital() {
        let mut pm = manager(RiskParams::default());
        open_long(&mut pm);
        assert!((pm.position().unrealized_pnl(102.0) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn trade_kind_display_snake_case() {
        assert_eq!(TradeKind::StopLoss.to_string(), "stop_loss");
        assert_eq!(TradeKind::TrailingDrawdown.to_string(), "trailing_drawdown");
        assert!(TradeKind::TakeProfit.is_win());
        assert!(!TradeKind::SignalExit.is_win());
        assert!(TradeKind::Sell.is_entry());
    }
}
