//! Predictive classifier port.

use crate::domain::error::AitraderError;
use crate::domain::ohlcv::Bar;
use crate::domain::oracle::TrainingSummary;
use crate::domain::signal::Signal;

/// External directional classifier.
///
/// `train` sees only bars strictly before the point where the simulator
/// starts asking for votes; `predict` sees a trailing window ending at the
/// current bar.
pub trait SignalOracle {
    fn name(&self) -> &str;

    fn train(&mut self, history: &[Bar]) -> Result<TrainingSummary, AitraderError>;

    fn predict(&self, window: &[Bar]) -> Result<Signal, AitraderError>;
}
