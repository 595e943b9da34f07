//! CSV report adapter implementing ReportPort.
//!
//! Writes three files into the output directory:
//! `trades.csv` (one row per trade), `equity.csv` (one row per bar) and
//! `metrics.csv` (a single summary row).

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AitraderError;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn report_error(path: &Path, e: impl std::fmt::Display) -> AitraderError {
    AitraderError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AitraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
    for row in rows {
        wtr.serialize(row).map_err(|e| report_error(path, e))?;
    }
    wtr.flush().map_err(|e| report_error(path, e))
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output: &Path) -> Result<(), AitraderError> {
        fs::create_dir_all(output).map_err(|e| report_error(output, e))?;

        write_rows(&output.join("trades.csv"), &result.trades)?;
        write_rows(&output.join("equity.csv"), &result.equity_curve)?;
        write_rows(&output.join("metrics.csv"), &[result.metrics])?;

        info!(
            dir = %output.display(),
            trades = result.trades.len(),
            "reports written"
        );
        Ok(())
    }
}
