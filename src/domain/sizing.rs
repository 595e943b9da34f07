//! Volatility-aware position sizing.
//!
//! volatility_factor = clamp(1 - volatility / volatility_threshold, 0.1, 1.0)
//! size = balance × max_position_fraction × volatility_factor / price
//! stop_distance = atr × atr_multiplier
//!
//! An undefined volatility reading sizes at the floor factor; an undefined
//! ATR yields no stop distance.

/// Smallest fraction of the unconstrained size ever taken.
pub const MIN_VOLATILITY_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingParams {
    pub max_position_fraction: f64,
    pub volatility_threshold: f64,
    pub atr_multiplier: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            max_position_fraction: 0.1,
            volatility_threshold: 0.03,
            atr_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sizing {
    pub size: f64,
    pub stop_distance: Option<f64>,
    pub volatility_factor: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSizer {
    params: SizingParams,
}

impl PositionSizer {
    pub fn new(params: SizingParams) -> Self {
        Self { params }
    }

    pub fn volatility_factor(&self, volatility: Option<f64>) -> f64 {
        match volatility {
            Some(v) if self.params.volatility_threshold > 0.0 => {
                (1.0 - v / self.params.volatility_threshold).clamp(MIN_VOLATILITY_FACTOR, 1.0)
            }
            _ => MIN_VOLATILITY_FACTOR,
        }
    }

    pub fn size(&self, balance: f64, price: f64, volatility: Option<f64>, atr: Option<f64>) -> Sizing {
        let volatility_factor = self.volatility_factor(volatility);
        let size = if price > 0.0 && balance > 0.0 {
            balance * self.params.max_position_fraction * volatility_factor / price
        } else {
            0.0
        };
        Sizing {
            size,
            stop_distance: atr.map(|a| a * self.params.atr_multiplier),
            volatility_factor,
        }
    }
}
