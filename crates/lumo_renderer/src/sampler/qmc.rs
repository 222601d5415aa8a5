//! Prime-indexed van der Corput sampler.
//!
//! Every draw consumes the next prime of a sieved table as its base, so a
//! sample stream is the sequence `phi_2(i), phi_3(i), phi_5(i), ...` for a
//! fixed draw index `i`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Sampler, ONE_MINUS_EPSILON};

/// Default sieve bound (664 579 primes).
pub const DEFAULT_PRIME_BOUND: u32 = 10_000_000;

/// All primes up to a bound, sieved once per render.
#[derive(Clone, Debug)]
pub struct PrimeTable {
    primes: Vec<u32>,
}

impl PrimeTable {
    /// Sieve of Eratosthenes over `2..=bound`.
    pub fn sieve(bound: u32) -> Self {
        let n = bound as usize;
        let mut composite = vec![false; n + 1];
        let mut i = 2;
        while i * i <= n {
            if !composite[i] {
                for j in (i * i..=n).step_by(i) {
                    composite[j] = true;
                }
            }
            i += 1;
        }

        let primes = (2..=n)
            .filter(|&i| !composite[i])
            .map(|i| i as u32)
            .collect();
        Self { primes }
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    pub fn get(&self, n: usize) -> Option<u32> {
        self.primes.get(n).copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.primes
    }
}

/// Van der Corput radical inverse with reversed digits: a non-zero digit
/// `d` becomes `base - d`.
pub fn reversed_radical_inverse(index: u64, base: u32) -> f32 {
    let base = base as u64;
    let inv_base = 1.0 / base as f64;
    let mut factor = inv_base;
    let mut value = 0.0_f64;
    let mut i = index;
    while i > 0 {
        let digit = i % base;
        let digit = if digit == 0 { 0 } else { base - digit };
        value += digit as f64 * factor;
        i /= base;
        factor *= inv_base;
    }
    (value as f32).min(ONE_MINUS_EPSILON)
}

/// QMC sampler over a [`PrimeTable`].
///
/// The requested dimension is ignored: bases are handed out in call
/// order, restarting from 2 on every [`Sampler::start`]. Once the table
/// runs out, values come from a `StdRng` seeded with the draw index.
pub struct Qmc<'a> {
    primes: &'a PrimeTable,
    index: u64,
    next: usize,
    fallback: Option<StdRng>,
}

impl<'a> Qmc<'a> {
    pub fn new(primes: &'a PrimeTable) -> Self {
        Self {
            primes,
            index: 0,
            next: 0,
            fallback: None,
        }
    }

    /// Next value of the stream.
    pub fn next_value(&mut self) -> f32 {
        match self.primes.get(self.next) {
            Some(base) => {
                self.next += 1;
                reversed_radical_inverse(self.index, base)
            }
            None => {
                let index = self.index;
                self.fallback
                    .get_or_insert_with(|| StdRng::seed_from_u64(index))
                    .gen::<f32>()
            }
        }
    }
}

impl Sampler for Qmc<'_> {
    fn start(&mut self, index: u64) {
        self.index = index;
        self.next = 0;
        self.fallback = None;
    }

    fn sample(&mut self, _dimension: usize) -> f32 {
        self.next_value()
    }
}
