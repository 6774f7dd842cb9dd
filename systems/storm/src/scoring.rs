use dust_storm_core::Position;
use serde::{Deserialize, Serialize};

/// Selects how panels are prioritised for degradation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseParams {
    /// Scores a panel by the sum of its coordinates, sweeping the storm
    /// diagonally across the surface.
    #[default]
    LinearSum,
}

impl NoiseParams {
    /// Computes the raw priority score of a panel at `position`.
    #[must_use]
    pub fn score(self, position: Position) -> f64 {
        match self {
            Self::LinearSum => position.x + position.y,
        }
    }
}

/// Min-max normalises scores into `[0, 1]` in place.
///
/// Scores are left untouched when every value is identical.
pub fn normalize(scores: &mut [f64]) {
    let Some(min) = scores.iter().copied().reduce(f64::min) else {
        return;
    };
    let max = scores.iter().copied().fold(min, f64::max);
    let range = max - min;
    if range <= 0.0 {
        return;
    }

    for score in scores.iter_mut() {
        *score = (*score - min) / range;
    }
}
