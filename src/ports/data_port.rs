//! Bar feed port trait.

use crate::domain::error::AitraderError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDateTime;

/// Source of one instrument's bar history, oldest first.
pub trait DataPort {
    /// Bars with `start <= timestamp <= end`; `None` leaves that side open.
    fn fetch_bars(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, AitraderError>;
}
