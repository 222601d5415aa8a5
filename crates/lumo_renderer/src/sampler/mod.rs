//! Low-discrepancy sampling.
//!
//! Samplers are pure functions of a draw index: [`Sampler::start`] positions
//! a sampler at an index and [`Sampler::sample`] returns the value of one
//! dimension. Two samplers started at the same index always produce the
//! same values. The read-only tables they need live in [`SamplerTables`],
//! built once per render.

mod halton;
mod qmc;

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use lumo_math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

pub use halton::{
    faure_permutations, radical_inverse, scrambled_radical_inverse, Halton, HALTON_DIMENSIONS,
    PRIMES,
};
pub use qmc::{reversed_radical_inverse, PrimeTable, Qmc, DEFAULT_PRIME_BOUND};

/// Largest f32 below 1.
pub const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;

/// Sampler interface.
pub trait Sampler {
    /// Position the sampler at draw `index` and reset any per-stream state.
    fn start(&mut self, index: u64);

    /// Value in `[0, 1)` for `dimension` of the current draw.
    fn sample(&mut self, dimension: usize) -> f32;

    /// Two consecutive dimensions.
    fn sample_2d(&mut self, dimension: usize) -> Vec2 {
        let u = self.sample(dimension);
        let v = self.sample(dimension + 1);
        Vec2::new(u, v)
    }
}

/// Sequence used for the path tracer's stochastic choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    /// Plain Halton sequence
    Halton,
    /// Halton with Faure-permuted digits
    #[default]
    ScrambledHalton,
    /// Prime-indexed van der Corput sequence
    Qmc,
}

/// Read-only tables shared by every sampler of a render.
#[derive(Clone, Debug)]
pub struct SamplerTables {
    faure: Vec<Vec<u16>>,
    primes: Option<PrimeTable>,
}

impl SamplerTables {
    /// Build the tables `kind` needs. The prime table is only sieved for
    /// [`SamplerKind::Qmc`].
    pub fn new(kind: SamplerKind, prime_bound: u32) -> Self {
        let faure = faure_permutations(PRIMES[HALTON_DIMENSIONS - 1] as usize);
        let primes = (kind == SamplerKind::Qmc).then(|| PrimeTable::sieve(prime_bound));

        log::debug!(
            "Sampler tables: {} Faure permutations, {} primes",
            faure.len(),
            primes.as_ref().map_or(0, PrimeTable::len)
        );

        Self { faure, primes }
    }

    pub fn faure(&self) -> &[Vec<u16>] {
        &self.faure
    }

    pub fn primes(&self) -> Option<&PrimeTable> {
        self.primes.as_ref()
    }

    /// Unscrambled Halton sampler, used for pixel jitter.
    pub fn halton(&self) -> Halton<'_> {
        Halton::new(&self.faure, false)
    }

    /// Sampler of the requested kind.
    ///
    /// Falls back to scrambled Halton if `kind` is QMC but no prime table
    /// was built.
    pub fn sampler(&self, kind: SamplerKind) -> PixelSampler<'_> {
        match (kind, &self.primes) {
            (SamplerKind::Halton, _) => PixelSampler::Halton(Halton::new(&self.faure, false)),
            (SamplerKind::Qmc, Some(primes)) => PixelSampler::Qmc(Qmc::new(primes)),
            _ => PixelSampler::Halton(Halton::new(&self.faure, true)),
        }
    }
}

/// Any of the sampler implementations, chosen at runtime.
pub enum PixelSampler<'a> {
    Halton(Halton<'a>),
    Qmc(Qmc<'a>),
}

impl Sampler for PixelSampler<'_> {
    fn start(&mut self, index: u64) {
        match self {
            PixelSampler::Halton(s) => s.start(index),
            PixelSampler::Qmc(s) => s.start(index),
        }
    }

    fn sample(&mut self, dimension: usize) -> f32 {
        match self {
            PixelSampler::Halton(s) => s.sample(dimension),
            PixelSampler::Qmc(s) => s.sample(dimension),
        }
    }
}

/// Cosine-weighted direction in the hemisphere around `normal`.
///
/// `s0` picks the azimuth and `s1` the elevation. `normal` must be
/// normalized.
pub fn cosine_hemisphere(normal: Vec3, s0: f32, s1: f32) -> Vec3 {
    let w = normal;
    let u = if w.x.abs() > 0.0001 {
        Vec3::Y.cross(w).normalize()
    } else {
        Vec3::X.cross(w).normalize()
    };
    let v = w.cross(u);

    let r1 = 2.0 * PI * s0;
    let r2 = s1;
    let r2s = r2.sqrt();

    (u * r1.cos() * r2s + v * r1.sin() * r2s + w * (1.0 - r2).sqrt()).normalize()
}

/// Map the unit square onto the unit disk, preserving stratification.
///
/// Shirley and Chiu's concentric mapping; the exact center of the square
/// maps to the disk center.
pub fn concentric_sample_disk(u1: f32, u2: f32) -> Vec2 {
    let sx = 2.0 * u1 - 1.0;
    let sy = 2.0 * u2 - 1.0;

    if sx == 0.0 && sy == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if sx.abs() > sy.abs() {
        (sx, FRAC_PI_4 * (sy / sx))
    } else {
        (sy, FRAC_PI_2 - FRAC_PI_4 * (sx / sy))
    };

    Vec2::new(r * theta.cos(), r * theta.sin())
}
