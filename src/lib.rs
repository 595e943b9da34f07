//! aitrader: single-instrument strategy backtester.
//!
//! Technical signals gated by a pluggable predictive oracle drive a
//! bounded-risk position state machine, simulated bar by bar.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
