use std::f64::consts::PI;

use rand::distributions::Open01;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};

/// Above this mean the multiplicative Knuth sampler is replaced by `rand_distr`.
const KNUTH_POISSON_LIMIT: f64 = 30.0;
const MAX_KNUTH_STEPS: u64 = 1_000;

pub(crate) fn derive_seed(base_seed: u64, iteration: u32) -> u64 {
    let mixed = base_seed ^ ((iteration as u64) << 32) ^ iteration as u64;
    splitmix64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Per-path source of diffusion and jump draws.
pub(crate) struct ShockSampler {
    rng: SmallRng,
    cached_normal: Option<f64>,
}

impl ShockSampler {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            cached_normal: None,
        }
    }

    fn uniform(&mut self) -> f64 {
        self.rng.sample(Open01)
    }

    /// Box–Muller; the second variate of each pair is kept for the next call.
    pub(crate) fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.uniform();
        let u2 = self.uniform();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.cached_normal = Some(r * theta.sin());
        r * theta.cos()
    }

    pub(crate) fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        mean + sd * self.standard_normal()
    }

    pub(crate) fn poisson(&mut self, mean: f64) -> u64 {
        if !mean.is_finite() || mean <= 0.0 {
            return 0;
        }

        if mean > KNUTH_POISSON_LIMIT {
            return match Poisson::new(mean) {
                Ok(dist) => {
                    let draw: f64 = dist.sample(&mut self.rng);
                    draw as u64
                }
                Err(_) => 0,
            };
        }

        let limit = (-mean).exp();
        let mut product = 1.0;
        let mut k = 0;
        loop {
            product *= self.uniform();
            if product <= limit || k >= MAX_KNUTH_STEPS {
                return k;
            }
            k += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_and_variance(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        (mean, var)
    }

    #[test]
    fn derive_seed_changes_per_iteration() {
        let a = derive_seed(42, 0);
        let b = derive_seed(42, 1);
        let c = derive_seed(43, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, derive_seed(42, 0));
    }

    #[test]
    fn same_seed_replays_same_draws() {
        let mut left = ShockSampler::new(7);
        let mut right = ShockSampler::new(7);
        for _ in 0..100 {
            assert_eq!(left.standard_normal().to_bits(), right.standard_normal().to_bits());
            assert_eq!(left.poisson(0.4), right.poisson(0.4));
        }
    }

    #[test]
    fn standard_normal_has_unit_moments() {
        let mut sampler = ShockSampler::new(11);
        let draws = (0..40_000).map(|_| sampler.standard_normal()).collect::<Vec<_>>();
        let (mean, var) = mean_and_variance(&draws);
        assert!(mean.abs() < 0.03, "mean {mean}");
        assert!((var - 1.0).abs() < 0.04, "variance {var}");
        assert!(draws.iter().all(|z| z.is_finite()));
    }

    #[test]
    fn shifted_normal_uses_mean_and_sd() {
        let mut sampler = ShockSampler::new(5);
        let draws = (0..40_000).map(|_| sampler.normal(-0.2, 0.1)).collect::<Vec<_>>();
        let (mean, var) = mean_and_variance(&draws);
        assert!((mean + 0.2).abs() < 0.005, "mean {mean}");
        assert!((var.sqrt() - 0.1).abs() < 0.005, "sd {}", var.sqrt());
    }

    #[test]
    fn poisson_small_mean_matches_rate() {
        let mut sampler = ShockSampler::new(3);
        let mean = 0.1 / 12.0;
        let draws = (0..200_000).map(|_| sampler.poisson(mean) as f64).collect::<Vec<_>>();
        let (sample_mean, _) = mean_and_variance(&draws);
        assert!((sample_mean - mean).abs() < 0.002, "mean {sample_mean}");
    }

    #[test]
    fn poisson_large_mean_switches_sampler_and_stays_bounded() {
        let mut sampler = ShockSampler::new(9);
        let draws = (0..5_000).map(|_| sampler.poisson(500.0) as f64).collect::<Vec<_>>();
        let (sample_mean, _) = mean_and_variance(&draws);
        assert!((sample_mean - 500.0).abs() < 2.0, "mean {sample_mean}");

        let moderate = (0..5_000).map(|_| sampler.poisson(25.0) as f64).collect::<Vec<_>>();
        let (moderate_mean, _) = mean_and_variance(&moderate);
        assert!((moderate_mean - 25.0).abs() < 0.5, "mean {moderate_mean}");
    }

    #[test]
    fn poisson_degenerate_means_return_zero() {
        let mut sampler = ShockSampler::new(1);
        assert_eq!(sampler.poisson(0.0), 0);
        assert_eq!(sampler.poisson(-1.0), 0);
        assert_eq!(sampler.poisson(f64::NAN), 0);
        assert_eq!(sampler.poisson(f64::INFINITY), 0);
    }
}
