//! Pluggable randomness for the heuristic scorer
//!
//! The rule scorer deliberately injects a small amount of noise (a 1%
//! random-failure rule and a confidence jitter) to emulate irreducible
//! model uncertainty. The source is a trait so production uses an
//! entropy-seeded RNG while tests pin the draws.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Source of uniform draws in [0, 1).
pub trait NoiseSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// Production source backed by a seeded `StdRng`.
pub struct RngNoise {
    rng: Mutex<StdRng>,
}

impl RngNoise {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl NoiseSource for RngNoise {
    fn next_f64(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen(),
            // A poisoned lock only happens after a panic elsewhere;
            // a neutral draw keeps scoring deterministic-safe.
            Err(_) => 0.5,
        }
    }
}

/// Deterministic source returning a fixed value. `FixedNoise(0.5)`
/// disables both the random-failure rule and the confidence jitter.
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn next_f64(&self) -> f64 {
        self.0
    }
}
