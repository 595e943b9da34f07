//! OHLCV bar representation and input validation.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::domain::error::AitraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Parse a bar or config timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, a bare
/// `YYYY-MM-DD` (midnight) or integer epoch milliseconds. Offsets are
/// normalised to UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.naive_utc())
}

/// Reject bar sequences the simulator cannot order or price.
///
/// Timestamps must be strictly increasing (no duplicates). Prices must be
/// finite and positive with `low <= open, close <= high`; volume must be
/// finite and non-negative.
pub fn validate_bars(bars: &[Bar]) -> Result<(), AitraderError> {
    for (index, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(AitraderError::InvalidBar {
                index,
                reason: "prices must be finite and positive".into(),
            });
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(AitraderError::InvalidBar {
                index,
                reason: "volume must be finite and non-negative".into(),
            });
        }
        if bar.low > bar.high
            || bar.open > bar.high
            || bar.open < bar.low
            || bar.close > bar.high
            || bar.close < bar.low
        {
            return Err(AitraderError::InvalidBar {
                index,
                reason: format!(
                    "inconsistent range: open={} high={} low={} close={}",
                    bar.open, bar.high, bar.low, bar.close
                ),
            });
        }
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(AitraderError::NonMonotonic {
                    index,
                    previous,
                    timestamp: bar.timestamp,
                });
            }
        }
    }
    Ok(())
}
