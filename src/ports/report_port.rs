//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AitraderError;
use std::path::Path;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output: &Path) -> Result<(), AitraderError>;
}
