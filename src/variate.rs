//! Gaussian random variates for demand sampling
//!
//! The default sampler reproduces the half-angle Box-Muller variant that the
//! stored demand statistics were produced with: the first uniform draw is
//! used directly as the angle (scaled by pi, not 2*pi) and picks either the
//! cosine or the sine branch. Its output is close to, but not exactly, normal.
//! `GaussianMethod::Canonical` switches to textbook sampling for comparison.

use std::f64::consts::PI;

use rand::distributions::{Distribution, Open01};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaussianMethod {
    #[default]
    HalfAngle,
    Canonical,
}

/// Normal(mean, std_dev^2) draw source
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianVariate {
    pub mean: f64,
    pub std_dev: f64,
    pub method: GaussianMethod,
}

impl GaussianVariate {
    pub fn new(mean: f64, std_dev: f64, method: GaussianMethod) -> Self {
        GaussianVariate { mean, std_dev, method }
    }
}

impl Distribution<f64> for GaussianVariate {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z = match self.method {
            GaussianMethod::HalfAngle => half_angle_standard(rng),
            GaussianMethod::Canonical => rng.sample(StandardNormal),
        };
        self.mean + self.std_dev * z
    }
}

/// Standard draw from the half-angle Box-Muller variant.
///
/// u1 is in [0, 1); u2 is in (0, 1] so the logarithm stays finite.
fn half_angle_standard<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen();
    let u2: f64 = 1.0 - rng.sample::<f64, _>(Open01);
    let r = (-2.0 * u2.ln()).sqrt();
    if u1 < 0.5 {
        r * (PI * u1).cos()
    } else {
        r * (PI * u1).sin()
    }
}

/// Single draw with the default half-angle method
pub fn sample<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    GaussianVariate::new(mean, std_dev, GaussianMethod::HalfAngle).sample(rng)
}

/// Deterministic generator for a fixed seed, entropy-seeded otherwise
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
