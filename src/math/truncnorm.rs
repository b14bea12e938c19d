//! Normal distribution truncated to a closed interval.
//!
//! Sampling is by rejection from the parent normal. Restart bounds place the
//! mean at the interval midpoint with `sd = (high - low) / 2`, so roughly 68%
//! of draws are accepted. For intervals deep in a tail the loop is capped and
//! falls back to the mean clamped into the interval.

use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Maximum rejected draws before giving up on the parent distribution.
const MAX_REJECTIONS: usize = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct TruncatedNormal {
    mean: f64,
    sd: f64,
    low: f64,
    high: f64,
}

impl TruncatedNormal {
    /// Returns `None` unless all inputs are finite, `sd >= 0` and `low <= high`.
    pub fn new(mean: f64, sd: f64, low: f64, high: f64) -> Option<Self> {
        let finite = mean.is_finite() && sd.is_finite() && low.is_finite() && high.is_finite();
        if !finite || sd < 0.0 || low > high {
            return None;
        }
        Some(Self { mean, sd, low, high })
    }

    /// Mean at the midpoint and `sd` equal to the population standard
    /// deviation of the two endpoints.
    pub fn from_interval(low: f64, high: f64) -> Option<Self> {
        let mean = 0.5 * (low + high);
        let sd = 0.5 * (high - low).abs();
        Self::new(mean, sd, low, high)
    }
}

impl Distribution<f64> for TruncatedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.sd == 0.0 || self.low == self.high {
            return self.mean.clamp(self.low, self.high);
        }
        // `new` already checked finiteness and sign.
        let Ok(normal) = Normal::new(self.mean, self.sd) else {
            return self.mean.clamp(self.low, self.high);
        };
        for _ in 0..MAX_REJECTIONS {
            let x = normal.sample(rng);
            if x >= self.low && x <= self.high {
                return x;
            }
        }
        self.mean.clamp(self.low, self.high)
    }
}
