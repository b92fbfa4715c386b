//! Shared numeric environment: randomness and number-theoretic helpers.
//!
//! Each protocol party owns exactly one [`Context`]. A `Context` must not be
//! shared between concurrent sessions; all methods that consume randomness
//! take `&mut self`.

use crate::error::{PsiSumError, Result};
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_prime::nt_funcs::is_prime;
use num_prime::PrimalityTestConfig;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;

/// Per-party numeric context.
///
/// Wraps the operating-system CSPRNG and provides uniform big-integer
/// sampling, primality testing, safe-prime generation, and uniform
/// shuffling. Big-integer construction and modular arithmetic are consumed
/// directly from `num-bigint` (`BigUint::from_bytes_be`, `modpow`,
/// `modinv`); only the stateful operations live here.
#[derive(Debug, Default)]
pub struct Context {
    rng: OsRng,
}

impl Context {
    pub fn new() -> Self {
        Self { rng: OsRng }
    }

    /// Sample a uniform integer in `[0, bound)`.
    ///
    /// `bound` must be nonzero.
    pub fn random_below(&mut self, bound: &BigUint) -> BigUint {
        self.rng.gen_biguint_below(bound)
    }

    /// Sample a uniform integer of at most `bits` bits.
    pub fn random_bits(&mut self, bits: u64) -> BigUint {
        self.rng.gen_biguint(bits)
    }

    /// Sample a uniform element of `Z*_n` by rejection.
    pub fn random_coprime(&mut self, n: &BigUint) -> BigUint {
        loop {
            let r = self.rng.gen_biguint_below(n);
            if !r.is_zero() && r.gcd(n).is_one() {
                return r;
            }
        }
    }

    /// Probabilistic primality test (BPSW).
    pub fn is_prime(&self, n: &BigUint) -> bool {
        is_prime(n, Some(PrimalityTestConfig::default())).probably()
    }

    /// Generate a safe prime `p` of exactly `bits` bits: both `p` and
    /// `(p-1)/2` are prime.
    ///
    /// Rejection-sampled; expected cost grows quadratically with the bit
    /// length, so callers should treat this as long-running for
    /// cryptographic sizes. The number of attempts is bounded; exhaustion
    /// surfaces as [`PsiSumError::Crypto`].
    pub fn generate_safe_prime(&mut self, bits: u64) -> Result<BigUint> {
        if bits < 3 {
            return Err(PsiSumError::InvalidInput(format!(
                "safe prime bit length {} is too small",
                bits
            )));
        }
        // Candidates are forced to `3 mod 4` so that (p-1)/2 is odd.
        let attempts = 64 * bits * bits;
        for _ in 0..attempts {
            let mut candidate = self.rng.gen_biguint(bits);
            candidate.set_bit(bits - 1, true);
            candidate |= BigUint::from(3u8);
            if self.is_prime(&candidate) && self.is_prime(&(&candidate >> 1)) {
                return Ok(candidate);
            }
        }
        Err(PsiSumError::Crypto(format!(
            "safe prime generation exhausted after {} attempts",
            attempts
        )))
    }

    /// Uniform (Fisher-Yates) in-place shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_below_in_range() {
        let mut ctx = Context::new();
        let bound = BigUint::from(1000u32);
        for _ in 0..100 {
            assert!(ctx.random_below(&bound) < bound);
        }
    }

    #[test]
    fn test_random_coprime() {
        let mut ctx = Context::new();
        let n = BigUint::from(3u32 * 5 * 7 * 11);
        for _ in 0..50 {
            let r = ctx.random_coprime(&n);
            assert!(!r.is_zero());
            assert!(r < n);
            assert!(r.gcd(&n).is_one());
        }
    }

    #[test]
    fn test_is_prime_known_values() {
        let ctx = Context::new();
        assert!(ctx.is_prime(&BigUint::from(2u8)));
        assert!(ctx.is_prime(&BigUint::from(7919u32)));
        assert!(!ctx.is_prime(&BigUint::from(1u8)));
        assert!(!ctx.is_prime(&BigUint::from(7917u32)));
    }

    #[test]
    fn test_generate_safe_prime_small() {
        let mut ctx = Context::new();
        let p = ctx.generate_safe_prime(32).unwrap();
        assert_eq!(p.bits(), 32);
        assert!(ctx.is_prime(&p));
        assert!(ctx.is_prime(&(&p >> 1)));
    }

    #[test]
    fn test_generate_safe_prime_rejects_tiny_size() {
        let mut ctx = Context::new();
        assert!(matches!(
            ctx.generate_safe_prime(2),
            Err(PsiSumError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_shuffle_preserves_elements() {
        let mut ctx = Context::new();
        let mut items: Vec<u32> = (0..100).collect();
        ctx.shuffle(&mut items);
        assert_eq!(items.len(), 100);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<u32>>());
    }
}
