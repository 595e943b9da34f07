//! CSV file bar feed.
//!
//! Columns: `timestamp,open,high,low,close,volume` with a header row.
//! Rows are returned in file order; ordering is checked by the simulator,
//! not repaired here.

use crate::domain::error::AitraderError;
use crate::domain::ohlcv::{parse_timestamp, Bar};
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize)]
struct CsvBar {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, AitraderError> {
        let file = File::open(&self.path).map_err(|e| AitraderError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let mut bars = Vec::new();
        for (row, record) in rdr.deserialize::<CsvBar>().enumerate() {
            // header is line 1
            let line = row + 2;
            let record = record.map_err(|e| AitraderError::Data {
                reason: format!("{} line {}: {}", self.path.display(), line, e),
            })?;
            let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| AitraderError::Data {
                reason: format!(
                    "{} line {}: invalid timestamp '{}'",
                    self.path.display(),
                    line,
                    record.timestamp
                ),
            })?;

            if start.is_some_and(|s| timestamp < s) || end.is_some_and(|e| timestamp > e) {
                continue;
            }

            bars.push(Bar {
                timestamp,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            });
        }
        Ok(bars)
    }
}

/// Write bars in the format [`CsvAdapter`] reads.
pub fn write_bars(path: &Path, bars: &[Bar]) -> Result<(), AitraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| AitraderError::Data {
        reason: format!("failed to create {}: {}", path.display(), e),
    })?;
    for bar in bars {
        wtr.serialize(CsvBar {
            timestamp: bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })
        .map_err(|e| AitraderError::Data {
            reason: format!("failed to write {}: {}", path.display(), e),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
