//! Oracle that always casts the same vote.

use crate::domain::error::AitraderError;
use crate::domain::ohlcv::Bar;
use crate::domain::oracle::TrainingSummary;
use crate::domain::signal::Signal;
use crate::ports::oracle_port::SignalOracle;

#[derive(Debug, Clone, Copy)]
pub struct ConstantOracle {
    vote: Signal,
}

impl ConstantOracle {
    pub fn new(vote: Signal) -> Self {
        Self { vote }
    }
}

impl SignalOracle for ConstantOracle {
    fn name(&self) -> &str {
        "constant"
    }

    fn train(&mut self, _history: &[Bar]) -> Result<TrainingSummary, AitraderError> {
        Ok(TrainingSummary::default())
    }

    fn predict(&self, _window: &[Bar]) -> Result<Signal, AitraderError> {
        Ok(self.vote)
    }
}
