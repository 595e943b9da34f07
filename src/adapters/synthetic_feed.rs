//! Seeded synthetic bar feed.
//!
//! Hourly bars around a base price following three trend phases (rise,
//! pull-back, second rise) plus Gaussian noise. Every tenth of the series
//! starts with a volume spike. The same seed always yields the same bars.

use crate::domain::error::AitraderError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    pub bars: usize,
    pub seed: u64,
    pub start: NaiveDateTime,
    pub interval: Duration,
    pub base_price: f64,
    /// Height of a full trend phase.
    pub trend_scale: f64,
    pub noise_std: f64,
    /// Std of the high/low envelope as a fraction of price.
    pub range_std: f64,
}

impl SyntheticFeed {
    pub fn new(bars: usize, seed: u64) -> Self {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            bars,
            seed,
            start,
            interval: Duration::hours(1),
            base_price: 30_000.0,
            trend_scale: 2_000.0,
            noise_std: 200.0,
            range_std: 0.02,
        }
    }

    pub fn generate(&self) -> Result<Vec<Bar>, AitraderError> {
        let n = self.bars;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = Normal::new(0.0, self.noise_std).map_err(|e| AitraderError::Data {
            reason: format!("invalid noise distribution: {}", e),
        })?;
        let range = Normal::new(0.0, self.range_std).map_err(|e| AitraderError::Data {
            reason: format!("invalid range distribution: {}", e),
        })?;

        let trend = trend_path(n);
        let spike_every = (n / 10).max(1);
        let mut bars = Vec::with_capacity(n);
        let mut timestamp = self.start;

        for (i, t) in trend.iter().enumerate() {
            let base = (self.base_price + t * self.trend_scale + noise.sample(&mut rng)).max(1.0);
            let high = base * (1.0 + range.sample(&mut rng).abs());
            let low = base * (1.0 - range.sample(&mut rng).abs()).max(0.01);
            let open = rng.gen_range(low..=high);
            let close = rng.gen_range(low..=high);
            let volume = if i % spike_every == 0 {
                rng.gen_range(5.0..15.0) * 100.0
            } else {
                rng.gen_range(1.0..5.0) * 100.0
            };

            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
            timestamp += self.interval;
        }
        Ok(bars)
    }
}

fn linspace(from: f64, to: f64, len: usize) -> impl Iterator<Item = f64> {
    (0..len).map(move |i| {
        if len < 2 {
            from
        } else {
            from + (to - from) * i as f64 / (len - 1) as f64
        }
    })
}

/// Trend offsets in units of `trend_scale`: 0→1, 1→0.5, 0.5→1.5, padded
/// with the last value.
fn trend_path(n: usize) -> Vec<f64> {
    let third = n / 3;
    let mut path: Vec<f64> = linspace(0.0, 1.0, third)
        .chain(linspace(1.0, 0.5, third))
        .chain(linspace(0.5, 1.5, third))
        .collect();
    let last = path.last().copied().unwrap_or(0.0);
    path.resize(n, last);
    path
}

impl DataPort for SyntheticFeed {
    fn fetch_bars(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, AitraderError> {
        let mut bars = self.generate()?;
        bars.retain(|b| {
            start.is_none_or(|s| b.timestamp >= s) && end.is_none_or(|e| b.timestamp <= e)
        });
        Ok(bars)
    }
}
