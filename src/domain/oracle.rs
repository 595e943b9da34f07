//! Oracle vote normalisation.
//!
//! [`OracleAdapter`] wraps a [`SignalOracle`] collaborator and turns every
//! failure mode (untrained, training error, prediction error) into a `Hold`
//! vote plus an "unavailable" count. Nothing the oracle does can abort a run.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ohlcv::Bar;
use crate::domain::signal::Signal;
use crate::ports::oracle_port::SignalOracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClassCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

impl ClassCounts {
    pub fn record(&mut self, label: Signal) {
        match label {
            Signal::Buy => self.buy += 1,
            Signal::Sell => self.sell += 1,
            Signal::Hold => self.hold += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.buy + self.sell + self.hold
    }
}

/// What a training pass reports back.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TrainingSummary {
    /// Hold-out accuracy in [0, 1].
    pub accuracy: f64,
    pub sample_count: usize,
    pub class_counts: ClassCounts,
}

pub struct OracleAdapter<'a> {
    oracle: &'a mut dyn SignalOracle,
    trained: bool,
    summary: Option<TrainingSummary>,
    unavailable: usize,
}

impl<'a> OracleAdapter<'a> {
    pub fn new(oracle: &'a mut dyn SignalOracle) -> Self {
        Self {
            oracle,
            trained: false,
            summary: None,
            unavailable: 0,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn summary(&self) -> Option<TrainingSummary> {
        self.summary
    }

    /// Number of votes replaced by `Hold` because the oracle was unusable.
    pub fn unavailable_votes(&self) -> usize {
        self.unavailable
    }

    /// Train on `history`. A failure leaves the adapter untrained.
    pub fn train(&mut self, history: &[Bar]) -> Option<TrainingSummary> {
        match self.oracle.train(history) {
            Ok(summary) => {
                info!(
                    oracle = self.oracle.name(),
                    bars = history.len(),
                    samples = summary.sample_count,
                    accuracy = summary.accuracy,
                    "oracle trained"
                );
                self.trained = true;
                self.summary = Some(summary);
                Some(summary)
            }
            Err(e) => {
                warn!(oracle = self.oracle.name(), error = %e, "oracle training failed");
                self.trained = false;
                None
            }
        }
    }

    pub fn vote(&mut self, window: &[Bar]) -> Signal {
        if !self.trained {
            self.unavailable += 1;
            return Signal::Hold;
        }
        match self.oracle.predict(window) {
            Ok(vote) => vote,
            Err(e) => {
                debug!(oracle = self.oracle.name(), error = %e, "oracle unavailable");
                self.unavailable += 1;
                Signal::Hold
            }
        }
    }
}
