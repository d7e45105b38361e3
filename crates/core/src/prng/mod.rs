//! Pure seeded pseudo-randomness.
//!
//! Layout decisions that must survive regeneration (attempt angles, ring
//! noise phases) draw from a function of a numeric seed rather than from a
//! stateful generator. Call sites go through [`SeededRandom`] so the hash can
//! be replaced without touching them.

/// Maps a seed to a value in `[0, 1)`. Implementations must be pure.
pub trait SeededRandom {
    fn random_at(&self, seed: f64) -> f64;

    /// Uniform draw in `[min, max)`.
    fn range_at(&self, seed: f64, min: f64, max: f64) -> f64 {
        min + (max - min) * self.random_at(seed)
    }
}

/// `fract(sin(seed) * 10000)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SineHash;

impl SeededRandom for SineHash {
    fn random_at(&self, seed: f64) -> f64 {
        let x = seed.sin() * 10_000.0;
        let value = x - x.floor();
        // x - floor(x) rounds up to 1.0 for tiny negative x.
        if value.is_finite() && value < 1.0 {
            value
        } else {
            0.0
        }
    }
}

/// Shorthand for [`SineHash::random_at`].
pub fn random_at(seed: f64) -> f64 {
    SineHash.random_at(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_is_bit_identical() {
        for seed in [0.0, 1.0, 42.5, -17.25, 1.0e6] {
            assert_eq!(random_at(seed).to_bits(), random_at(seed).to_bits());
        }
    }

    #[test]
    fn values_stay_in_unit_interval() {
        for i in 0..10_000 {
            let value = random_at(i as f64 * 0.37 - 1500.0);
            assert!((0.0..1.0).contains(&value), "{value} out of range");
        }
        assert_eq!(random_at(f64::NAN), 0.0);
    }

    #[test]
    fn distinct_seeds_spread_values() {
        let mean = (0..1000).map(|i| random_at(i as f64)).sum::<f64>() / 1000.0;
        assert!((mean - 0.5).abs() < 0.05);
    }

    #[test]
    fn range_draws_respect_bounds() {
        let value = SineHash.range_at(3.0, 0.3, 0.6);
        assert!((0.3..0.6).contains(&value));
    }
}
