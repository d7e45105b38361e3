use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::{
    boulder::BoulderId,
    prng::{SeededRandom, SineHash},
};

/// Seed offsets that decorrelate the independent draws of one attempt.
const ANGLE_STREAM: f64 = 0.0;
const BUCKET_STREAM: f64 = 1_000.5;
const SPREAD_STREAM: f64 = 2_000.25;
const PHASE_STREAM: f64 = 3_000.75;
/// Spacing between consecutive attempts on the seed line.
const ATTEMPT_STRIDE: f64 = 7.13;

/// One synthetic, decorative try at the boulder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub index: usize,
    /// Direction of the attempt path in radians, `[0, TAU)`.
    pub angle: f64,
    /// How far the attempt got, `[0.1, 1.0)`. See [`completion_from`].
    pub completion_percent: f64,
    /// Phase offset for the path's waviness harmonics, `[0, TAU)`.
    pub phase: f64,
}

/// Deterministic attempt population generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptSimulator<R = SineHash> {
    rng: R,
}

impl AttemptSimulator<SineHash> {
    pub fn new() -> Self {
        Self { rng: SineHash }
    }
}

impl<R: SeededRandom> AttemptSimulator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Exactly `max_attempts` attempts; the same boulder always yields the
    /// same population.
    pub fn simulate(&self, boulder: &BoulderId, max_attempts: usize) -> Vec<Attempt> {
        let base = boulder.seed();
        (0..max_attempts)
            .map(|index| {
                let seed = base + index as f64 * ATTEMPT_STRIDE;
                Attempt {
                    index,
                    angle: self.rng.random_at(seed + ANGLE_STREAM) * TAU,
                    completion_percent: completion_from(
                        self.rng.random_at(seed + BUCKET_STREAM),
                        self.rng.random_at(seed + SPREAD_STREAM),
                    ),
                    phase: self.rng.random_at(seed + PHASE_STREAM) * TAU,
                }
            })
            .collect()
    }
}

/// Convenience wrapper using the default hash.
pub fn simulate(boulder: &BoulderId, max_attempts: usize) -> Vec<Attempt> {
    AttemptSimulator::new().simulate(boulder, max_attempts)
}

/// Maps a bucket draw `u` and an in-bucket draw `v` onto the completion
/// distribution, skewed toward early failure:
///
/// | `u`          | completion     |
/// |--------------|----------------|
/// | `< 0.4`      | `[0.10, 0.30)` |
/// | `0.4 .. 0.7` | `[0.30, 0.60)` |
/// | `0.7 .. 0.9` | `[0.60, 0.85)` |
/// | `>= 0.9`     | `[0.85, 1.00]` |
///
/// The upper bound is only reached for `v == 1.0`. [`random_at`] draws from
/// `[0, 1)`, so in practice simulated attempts never top out.
///
/// [`random_at`]: crate::prng::random_at
pub fn completion_from(u: f64, v: f64) -> f64 {
    let v = v.clamp(0.0, 1.0);
    let (low, high) = if u < 0.4 {
        (0.1, 0.3)
    } else if u < 0.7 {
        (0.3, 0.6)
    } else if u < 0.9 {
        (0.6, 0.85)
    } else {
        (0.85, 1.0)
    };
    low + (high - low) * v
}
