//! Seed management for planet generation
//!
//! All stochastic choices in terrain generation come from [`mutate_seed`], a
//! pure function of two doubles. There is no RNG state anywhere, so a planet
//! for a given seed is reproducible bit for bit.

use std::f64::consts::PI;

/// Seed used when the caller does not supply one.
pub const DEFAULT_SEED: f64 = 12345.0;

/// Seeds above this magnitude lose precision in the fractional extraction.
const MAX_SEED_MAGNITUDE: f64 = 100_000.0;

/// Combine two seeds into a new value in `[-1.0, 1.0]`.
///
/// Computes `(a + π)(b + π)`, keeps the fractional part and rescales it.
pub fn mutate_seed(a: f64, b: f64) -> f64 {
    let r = (a + PI) * (b + PI);
    let stripped_whole_number = r - r.floor();
    2.0 * stripped_whole_number - 1.0
}

/// Move the decimal point left until the seed is small enough for [`mutate_seed`].
pub fn squish_seed(seed: f64) -> f64 {
    if !seed.is_finite() {
        return seed;
    }
    let mut result = seed;
    while result.abs() > MAX_SEED_MAGNITUDE {
        result *= 0.1;
    }
    result
}

/// Hashable identity of a seed, used as a cache key.
///
/// `-0.0` and `0.0` map to the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SeedKey(u64);

impl SeedKey {
    pub fn seed(&self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl From<f64> for SeedKey {
    fn from(seed: f64) -> Self {
        let normalized = if seed == 0.0 { 0.0 } else { seed };
        SeedKey(normalized.to_bits())
    }
}

impl std::fmt::Display for SeedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.seed())
    }
}
