//! Halton sequence with optional Faure-permuted digits.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Sampler, ONE_MINUS_EPSILON};

/// Number of Halton dimensions; one prime base per dimension.
pub const HALTON_DIMENSIONS: usize = 100;

/// The first 100 primes, the base of each Halton dimension.
pub const PRIMES: [u32; HALTON_DIMENSIONS] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, //
    31, 37, 41, 43, 47, 53, 59, 61, 67, 71, //
    73, 79, 83, 89, 97, 101, 103, 107, 109, 113, //
    127, 131, 137, 139, 149, 151, 157, 163, 167, 173, //
    179, 181, 191, 193, 197, 199, 211, 223, 227, 229, //
    233, 239, 241, 251, 257, 263, 269, 271, 277, 281, //
    283, 293, 307, 311, 313, 317, 331, 337, 347, 349, //
    353, 359, 367, 373, 379, 383, 389, 397, 401, 409, //
    419, 421, 431, 433, 439, 443, 449, 457, 461, 463, //
    467, 479, 487, 491, 499, 503, 509, 521, 523, 541, //
];

/// Faure permutations for every base up to `max_base`, indexed by base.
///
/// Built with Faure's recursion: an even base `b` doubles the permutation
/// of `b / 2` and appends it again shifted by one; an odd base `b` takes
/// the permutation of `b - 1`, shifts entries at or above the middle up by
/// one and inserts the middle value `(b - 1) / 2` in the center.
///
/// Reference: H. Faure, *Good permutations for extreme discrepancy*,
/// J. Number Theory 42 (1992).
pub fn faure_permutations(max_base: usize) -> Vec<Vec<u16>> {
    let mut p: Vec<Vec<u16>> = vec![Vec::new(); max_base.max(2) + 1];
    p[1] = vec![0];
    p[2] = vec![0, 1];

    for b in 3..=max_base {
        let mut perm = Vec::with_capacity(b);
        if b % 2 == 1 {
            let c = ((b - 1) / 2) as u16;
            let prev = &p[b - 1];
            let shift = |v: u16| if v >= c { v + 1 } else { v };
            perm.extend(prev[..c as usize].iter().map(|&v| shift(v)));
            perm.push(c);
            perm.extend(prev[c as usize..].iter().map(|&v| shift(v)));
        } else {
            let half = &p[b / 2];
            perm.extend(half.iter().map(|&v| 2 * v));
            perm.extend(half.iter().map(|&v| 2 * v + 1));
        }
        p[b] = perm;
    }

    p
}

/// Radical inverse of `index` in `base`: its digits mirrored about the
/// decimal point.
pub fn radical_inverse(index: u64, base: u32) -> f32 {
    let base = base as u64;
    let inv_base = 1.0 / base as f64;
    let mut factor = inv_base;
    let mut value = 0.0_f64;
    let mut i = index;
    while i > 0 {
        value += (i % base) as f64 * factor;
        i /= base;
        factor *= inv_base;
    }
    (value as f32).min(ONE_MINUS_EPSILON)
}

/// Radical inverse with every digit passed through `perm`.
pub fn scrambled_radical_inverse(index: u64, base: u32, perm: &[u16]) -> f32 {
    let base = base as u64;
    let inv_base = 1.0 / base as f64;
    let mut factor = inv_base;
    let mut value = 0.0_f64;
    let mut i = index;
    while i > 0 {
        value += perm[(i % base) as usize] as f64 * factor;
        i /= base;
        factor *= inv_base;
    }
    (value as f32).min(ONE_MINUS_EPSILON)
}

/// Halton sampler positioned at one draw index.
///
/// Dimension `d` uses the `d`-th prime as base. In scrambled mode every
/// dimension except the first permutes its digits with the Faure
/// permutation of its base. Dimensions past the prime table draw from a
/// `StdRng` seeded with the draw index.
pub struct Halton<'a> {
    index: u64,
    scrambled: bool,
    faure: &'a [Vec<u16>],
    fallback: Option<StdRng>,
}

impl<'a> Halton<'a> {
    /// `faure` must cover every base in [`PRIMES`] when `scrambled` is set.
    pub fn new(faure: &'a [Vec<u16>], scrambled: bool) -> Self {
        Self {
            index: 0,
            scrambled,
            faure,
            fallback: None,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

impl Sampler for Halton<'_> {
    fn start(&mut self, index: u64) {
        self.index = index;
        self.fallback = None;
    }

    fn sample(&mut self, dimension: usize) -> f32 {
        let Some(&base) = PRIMES.get(dimension) else {
            let index = self.index;
            return self
                .fallback
                .get_or_insert_with(|| StdRng::seed_from_u64(index))
                .gen::<f32>();
        };

        if self.scrambled && dimension > 0 {
            if let Some(perm) = self.faure.get(base as usize) {
                return scrambled_radical_inverse(self.index, base, perm);
            }
        }
        radical_inverse(self.index, base)
    }
}
