//! Additively-homomorphic Paillier cryptosystem over `Z*_{n^2}`.
//!
//! The modulus `n = p * q` is the product of two distinct safe primes and
//! the generator is the standard `g = n + 1`, so encryption of `x` is
//! `(1 + x*n) * r^n mod n^2` for a fresh uniform `r` in `Z*_n`. Addition of
//! plaintexts corresponds to multiplication of ciphertexts mod `n^2`;
//! multiplying by a fresh `r^n` re-randomizes a ciphertext without changing
//! the plaintext.

use crate::context::Context;
use crate::error::{PsiSumError, Result};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

/// Smallest accepted Paillier modulus size in bits.
pub const MIN_MODULUS_BITS: u64 = 1024;

/// Paillier public key: the modulus `n` (and cached `n^2`).
///
/// Sufficient for encryption, homomorphic addition, and re-randomization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaillierPublicKey {
    n: BigUint,
    n_squared: BigUint,
}

impl PaillierPublicKey {
    /// Build a public key from a modulus received on the wire.
    ///
    /// The modulus must be odd and of cryptographic size; a product of two
    /// `MIN_MODULUS_BITS / 2`-bit primes may fall one bit short of
    /// `MIN_MODULUS_BITS`, which is accepted.
    pub fn from_modulus(n: BigUint) -> Result<Self> {
        if n.bits() + 1 < MIN_MODULUS_BITS {
            return Err(PsiSumError::MalformedMessage(format!(
                "paillier modulus of {} bits is below the {}-bit minimum",
                n.bits(),
                MIN_MODULUS_BITS
            )));
        }
        if n.is_even() {
            return Err(PsiSumError::MalformedMessage(
                "paillier modulus must be odd".to_string(),
            ));
        }
        Ok(Self::from_modulus_unchecked(n))
    }

    fn from_modulus_unchecked(n: BigUint) -> Self {
        let n_squared = &n * &n;
        Self { n, n_squared }
    }

    /// The modulus `n`.
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Encrypt a plaintext in `[0, n)` under a fresh random nonce.
    pub fn encrypt(&self, x: &BigUint, ctx: &mut Context) -> Result<BigUint> {
        if x >= &self.n {
            return Err(PsiSumError::InvalidInput(format!(
                "plaintext of {} bits exceeds the modulus",
                x.bits()
            )));
        }
        let gm = (x * &self.n + 1u8) % &self.n_squared;
        let r = ctx.random_coprime(&self.n);
        Ok((gm * r.modpow(&self.n, &self.n_squared)) % &self.n_squared)
    }

    /// Homomorphic addition: the returned ciphertext decrypts to the sum of
    /// the two operands' plaintexts (mod n).
    pub fn add(&self, c1: &BigUint, c2: &BigUint) -> BigUint {
        (c1 * c2) % &self.n_squared
    }

    /// Re-randomize a ciphertext: multiply by a fresh `r^n`. The plaintext
    /// is unchanged but the result is statistically independent of the
    /// input ciphertext.
    pub fn rerandomize(&self, c: &BigUint, ctx: &mut Context) -> BigUint {
        let r = ctx.random_coprime(&self.n);
        (c * r.modpow(&self.n, &self.n_squared)) % &self.n_squared
    }

    /// Check that a ciphertext received on the wire lies in `[1, n^2)`.
    pub fn check_ciphertext(&self, c: &BigUint) -> Result<()> {
        if c.is_zero() || c >= &self.n_squared {
            return Err(PsiSumError::MalformedMessage(
                "ciphertext out of range".to_string(),
            ));
        }
        Ok(())
    }
}

/// Paillier private key, held by the client party only.
///
/// The key material is the safe-prime pair `(p, q)`; `lambda` and `mu` are
/// recomputed from the primes on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaillierPrivateKey {
    p: BigUint,
    q: BigUint,
    n: BigUint,
    n_squared: BigUint,
    lambda: BigUint,
    mu: BigUint,
}

impl PaillierPrivateKey {
    /// Generate a key pair with a modulus of `modulus_bits` bits, the
    /// product of two distinct safe primes of half that size.
    ///
    /// Safe-prime generation is rejection-sampled and potentially
    /// long-running at cryptographic sizes.
    pub fn generate(ctx: &mut Context, modulus_bits: u64) -> Result<Self> {
        if modulus_bits < MIN_MODULUS_BITS {
            return Err(PsiSumError::InvalidInput(format!(
                "paillier modulus size {} is below the {}-bit minimum",
                modulus_bits, MIN_MODULUS_BITS
            )));
        }
        let half = (modulus_bits + 1) / 2;
        let p = ctx.generate_safe_prime(half)?;
        loop {
            let q = ctx.generate_safe_prime(half)?;
            if q != p {
                return Self::from_primes(p, q);
            }
        }
    }

    /// Rebuild a key from its prime pair, e.g. when resuming serialized
    /// party state. Primality of `p` and `q` is trusted, but the pair must
    /// admit a valid key.
    pub fn from_primes(p: BigUint, q: BigUint) -> Result<Self> {
        if p.is_even() || q.is_even() || p <= BigUint::one() || q <= BigUint::one() {
            return Err(PsiSumError::InvalidInput(
                "paillier primes must be odd and greater than one".to_string(),
            ));
        }
        if p == q {
            return Err(PsiSumError::InvalidInput(
                "paillier primes must be distinct".to_string(),
            ));
        }
        let n = &p * &q;
        let n_squared = &n * &n;
        let lambda = (&p - 1u8).lcm(&(&q - 1u8));
        let mu = lambda.modinv(&n).ok_or_else(|| {
            PsiSumError::InvalidInput("carmichael value is not invertible mod n".to_string())
        })?;
        Ok(Self {
            p,
            q,
            n,
            n_squared,
            lambda,
            mu,
        })
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PaillierPublicKey {
        PaillierPublicKey::from_modulus_unchecked(self.n.clone())
    }

    /// The safe-prime pair. Serialized into client state, never transmitted
    /// to the peer.
    pub fn primes(&self) -> (&BigUint, &BigUint) {
        (&self.p, &self.q)
    }

    /// Decrypt a ciphertext: `L(c^lambda mod n^2) * mu mod n` with
    /// `L(u) = (u - 1) / n`.
    ///
    /// Total over `[0, n^2)`: a ciphertext that was not produced by
    /// [`PaillierPublicKey::encrypt`] decrypts to a meaningless but
    /// well-defined integer. `c^lambda` reduces to zero when `c` shares
    /// every prime factor with `n`, so that case is folded into `L` rather
    /// than underflowing.
    pub fn decrypt(&self, c: &BigUint) -> BigUint {
        let u = c.modpow(&self.lambda, &self.n_squared);
        let l = if u.is_zero() {
            (&self.n_squared - 1u8) / &self.n
        } else {
            (&u - 1u8) / &self.n
        };
        (l * &self.mu) % &self.n
    }
}
