//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod oracle;
pub mod sizing;
pub mod position;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
