#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Stateless sampling primitives used by the storm engine.
//!
//! Every function draws from a caller-provided [`Rng`], so determinism is the
//! caller's concern. The binomial sampler trades exactness for O(1) amortised
//! cost: it falls back to the Poisson limit for small expected counts and to
//! the de Moivre–Laplace normal approximation otherwise.

use rand::Rng;

const TWO_PI: f64 = std::f64::consts::PI * 2.0;

/// Expected count below which [`binomial_approx`] samples the Poisson limit.
pub const POISSON_THRESHOLD: f64 = 5.0;

/// Draws a uniform value from the half-open interval `(0, 1]`.
///
/// Excluding zero keeps the logarithm in [`box_muller`] finite.
pub fn unit_open<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    1.0 - rng.gen::<f64>()
}

/// Maps two uniform values to a standard normal deviate.
///
/// `u1` must lie in `(0, 1]`; `u2` may lie anywhere in `[0, 1]`.
#[must_use]
pub fn box_muller(u1: f64, u2: f64) -> f64 {
    let radius = (-2.0 * u1.ln()).sqrt();
    let theta = TWO_PI * u2;
    radius * theta.cos()
}

/// Samples a normal distribution with the provided mean and variance.
///
/// Negative variances are treated as zero.
pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, variance: f64) -> f64 {
    let u1 = unit_open(rng);
    let u2 = unit_open(rng);
    mean + variance.max(0.0).sqrt() * box_muller(u1, u2)
}

/// Samples a Poisson distribution using Knuth's multiplication method.
///
/// Cost grows linearly with `lambda`, so callers should reserve it for small
/// rates. Non-positive rates always yield zero.
pub fn poisson<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> u64 {
    if !(lambda > 0.0) {
        return 0;
    }

    let limit = (-lambda).exp();
    let mut product = 1.0;
    let mut multiplications: u64 = 0;
    loop {
        product *= unit_open(rng);
        multiplications += 1;
        if product <= limit {
            return multiplications - 1;
        }
    }
}

/// Approximates the number of successes out of `trials` independent trials
/// that each succeed with probability `probability`.
///
/// The result is always clamped to `[0, trials]`.
pub fn binomial_approx<R: Rng + ?Sized>(rng: &mut R, trials: u64, probability: f64) -> u64 {
    if trials == 0 || !(probability > 0.0) {
        return 0;
    }
    if probability >= 1.0 {
        return trials;
    }

    let upper = trials as f64;
    let mean = upper * probability;
    let sample = if mean < POISSON_THRESHOLD {
        poisson(rng, mean) as f64
    } else {
        normal(rng, mean, mean * (1.0 - probability)).round()
    };

    sample.clamp(0.0, upper) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const SAMPLES: usize = 20_000;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn unit_open_never_returns_zero() {
        let mut rng = rng(1);
        for _ in 0..SAMPLES {
            let value = unit_open(&mut rng);
            assert!(value > 0.0 && value <= 1.0, "value {value} escaped (0, 1]");
        }
    }

    #[test]
    fn box_muller_matches_closed_form_points() {
        assert_eq!(box_muller(1.0, 0.3), 0.0);
        let unit_radius = (-0.5f64).exp();
        assert!((box_muller(unit_radius, 0.0) - 1.0).abs() < 1e-12);
        assert!((box_muller(unit_radius, 0.5) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn normal_tracks_requested_moments() {
        let mut rng = rng(7);
        let samples: Vec<f64> = (0..SAMPLES).map(|_| normal(&mut rng, 10.0, 4.0)).collect();
        let mean = samples.iter().sum::<f64>() / SAMPLES as f64;
        let variance =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (SAMPLES as f64 - 1.0);
        assert!((mean - 10.0).abs() < 0.1, "mean drifted to {mean}");
        assert!((variance - 4.0).abs() < 0.25, "variance drifted to {variance}");
    }

    #[test]
    fn normal_with_zero_variance_is_the_mean() {
        let mut rng = rng(3);
        assert_eq!(normal(&mut rng, 2.5, 0.0), 2.5);
        assert_eq!(normal(&mut rng, 2.5, -1.0), 2.5);
    }

    #[test]
    fn poisson_handles_degenerate_rates() {
        let mut rng = rng(11);
        assert_eq!(poisson(&mut rng, 0.0), 0);
        assert_eq!(poisson(&mut rng, -3.0), 0);
        assert_eq!(poisson(&mut rng, f64::NAN), 0);
    }

    #[test]
    fn poisson_mean_matches_rate() {
        let mut rng = rng(13);
        let total: u64 = (0..SAMPLES).map(|_| poisson(&mut rng, 3.0)).sum();
        let mean = total as f64 / SAMPLES as f64;
        assert!((mean - 3.0).abs() < 0.1, "mean drifted to {mean}");
    }

    #[test]
    fn binomial_stays_within_trial_count() {
        let mut rng = rng(17);
        let probabilities = [0.0, 0.0001, 0.002, 0.05, 0.3, 0.5, 0.9, 0.999, 1.0];
        for trials in [0u64, 1, 2, 5, 20, 100, 2_500, 100_000] {
            for probability in probabilities {
                for _ in 0..50 {
                    let draw = binomial_approx(&mut rng, trials, probability);
                    assert!(
                        draw <= trials,
                        "draw {draw} exceeded {trials} trials at p={probability}"
                    );
                }
            }
        }
    }

    #[test]
    fn binomial_edge_probabilities_are_exact() {
        let mut rng = rng(19);
        for trials in [0u64, 1, 3, 1_000] {
            assert_eq!(binomial_approx(&mut rng, trials, 0.0), 0);
            assert_eq!(binomial_approx(&mut rng, trials, 1.0), trials);
        }
        assert_eq!(binomial_approx(&mut rng, 10, -0.5), 0);
        assert_eq!(binomial_approx(&mut rng, 10, 1.5), 10);
    }

    #[test]
    fn binomial_normal_branch_is_centred() {
        let mut rng = rng(23);
        let rounds = 5_000;
        let total: u64 = (0..rounds).map(|_| binomial_approx(&mut rng, 1_000, 0.3)).sum();
        let mean = total as f64 / rounds as f64;
        assert!((mean - 300.0).abs() < 2.0, "mean drifted to {mean}");
    }

    #[test]
    fn seeded_sources_replay_identically() {
        let mut first = rng(29);
        let mut second = rng(29);
        let a: Vec<u64> = (0..64).map(|_| binomial_approx(&mut first, 400, 0.01)).collect();
        let b: Vec<u64> = (0..64).map(|_| binomial_approx(&mut second, 400, 0.01)).collect();
        assert_eq!(a, b);
    }
}
