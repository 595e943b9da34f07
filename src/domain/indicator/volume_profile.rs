//! Price-level bucketing over the expanding close history.
//!
//! The range [min(close), max(close)] seen so far is split into N equal
//! buckets; the current close maps to its bucket index (the maximum falls
//! in the top bucket). Undefined while the range has zero width.

#[derive(Debug, Clone)]
pub struct VolumeProfile {
    bins: usize,
    min: f64,
    max: f64,
}

impl VolumeProfile {
    pub fn new(bins: usize) -> Self {
        Self {
            bins,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<usize> {
        self.min = self.min.min(close);
        self.max = self.max.max(close);
        let width = self.max - self.min;
        if self.bins == 0 || width <= 0.0 {
            return None;
        }
        let position = (close - self.min) / width * self.bins as f64;
        Some((position.floor() as usize).min(self.bins - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_for_flat_history() {
        let mut vp = VolumeProfile::new(20);
        assert_eq!(vp.update(100.0), None);
        assert_eq!(vp.update(100.0), None);
    }

    #[test]
    fn extremes_map_to_edge_buckets() {
        let mut vp = VolumeProfile::new(10);
        vp.update(100.0);
        assert_eq!(vp.update(200.0), Some(9));
        assert_eq!(vp.update(100.0), Some(0));
        assert_eq!(vp.update(155.0), Some(5));
    }

    #[test]
    fn zero_bins_is_undefined() {
        let mut vp = VolumeProfile::new(0);
        vp.update(1.0);
        assert_eq!(vp.update(2.0), None);
    }
}
