use serde::{Deserialize, Serialize};

use crate::scoring::NoiseParams;

/// Tuning knobs for the storm engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StormConfig {
    /// Ticks between scheduler invocations. Ramp writes continue for one
    /// extra period past the ramp window so the final value always lands.
    pub tick_period: u64,
    /// Per-tick degradation probability of each eligible panel at intensity one.
    pub degradation_rate: f64,
    /// Seed from which every per-storm random stream is derived.
    pub rng_seed: u64,
    /// Scoring variant applied to newly created storms.
    pub noise: NoiseParams,
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            tick_period: 60,
            degradation_rate: 0.002,
            rng_seed: 0x5eed_d057_57a2_4d01,
            noise: NoiseParams::LinearSum,
        }
    }
}

impl StormConfig {
    /// Returns a copy of the configuration using a different seed.
    #[must_use]
    pub fn with_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }
}
