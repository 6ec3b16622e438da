//! Injectable Gaussian noise
//!
//! The generator and the annotator never touch a global random source; they
//! receive a [`NoiseSource`] so tests can pin every sample.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Something that can draw a Gaussian sample
pub trait NoiseSource {
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64;
}

impl<F> NoiseSource for F
where
    F: FnMut(f64, f64) -> f64,
{
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        self(mean, std_dev)
    }
}

/// Gaussian samples drawn from a `rand` generator
#[derive(Debug, Clone)]
pub struct GaussianNoise<R: Rng> {
    rng: R,
}

impl<R: Rng> GaussianNoise<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl GaussianNoise<StdRng> {
    /// Unseeded, system-entropy backed source
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible source for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Seeded when a seed is given, entropy otherwise
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> NoiseSource for GaussianNoise<R> {
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        // Normal::new rejects a non-finite deviation; callers validate the sign
        match Normal::new(mean, std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => mean,
        }
    }
}

/// Replays a fixed list of samples, then returns the mean
#[derive(Debug, Clone, Default)]
pub struct ScriptedNoise {
    samples: Vec<f64>,
    cursor: usize,
}

impl ScriptedNoise {
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples, cursor: 0 }
    }

    /// Always the mean
    pub fn silent() -> Self {
        Self::default()
    }

    /// How many samples have been drawn so far
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl NoiseSource for ScriptedNoise {
    fn gaussian(&mut self, mean: f64, _std_dev: f64) -> f64 {
        let value = self.samples.get(self.cursor).copied();
        self.cursor += 1;
        mean + value.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let mut a = GaussianNoise::seeded(42);
        let mut b = GaussianNoise::seeded(42);

        for _ in 0..20 {
            assert_eq!(a.gaussian(0.0, 5.0), b.gaussian(0.0, 5.0));
        }
    }

    #[test]
    fn test_zero_std_dev_returns_mean() {
        let mut noise = GaussianNoise::seeded(7);
        assert_eq!(noise.gaussian(3.0, 0.0), 3.0);
    }

    #[test]
    fn test_gaussian_noise_is_centered() {
        let mut noise = GaussianNoise::seeded(1234);
        let n = 5000;
        let mean: f64 = (0..n).map(|_| noise.gaussian(0.0, 5.0)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.5, "sample mean {} too far from zero", mean);
    }

    #[test]
    fn test_scripted_noise() {
        let mut noise = ScriptedNoise::new(vec![1.5, -2.0]);
        assert_eq!(noise.gaussian(0.0, 5.0), 1.5);
        assert_eq!(noise.gaussian(0.0, 5.0), -2.0);
        assert_eq!(noise.gaussian(0.0, 5.0), 0.0);
        assert_eq!(noise.drawn(), 3);
    }

    #[test]
    fn test_closure_noise() {
        let mut calls = 0;
        let mut noise = |mean: f64, _std_dev: f64| {
            calls += 1;
            mean + 1.0
        };
        assert_eq!(noise.gaussian(2.0, 5.0), 3.0);
        assert_eq!(calls, 1);
    }
}
