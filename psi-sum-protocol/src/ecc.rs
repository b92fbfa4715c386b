//! Elliptic-curve commutative cipher on ristretto255.
//!
//! Encryption is `m -> k * H(m)` where `H` maps identifier bytes to a group
//! element; re-encryption of an existing point is `P -> k * P`. Because
//! scalar multiplication commutes, two parties encrypting under independent
//! keys reach the same doubly-encrypted point regardless of order, which is
//! what makes blinded set comparison possible. Decryption is not defined.

use crate::error::{PsiSumError, Result};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;
use sha2::Sha512;
use zeroize::Zeroize;

/// Length of a serialized cipher key.
pub const KEY_BYTES: usize = 32;

/// Map identifier bytes to a ristretto255 point, indifferentiable from a
/// random oracle over the group.
fn hash_to_point(msg: &[u8]) -> RistrettoPoint {
    RistrettoPoint::hash_from_bytes::<Sha512>(msg)
}

/// A commutative cipher keyed by a single secret scalar.
///
/// The key exists for the lifetime of a protocol session and never leaves
/// the party that generated it, except through [`key_bytes`] for state
/// resumption. The scalar is wiped from memory on drop.
///
/// [`key_bytes`]: EcCommutativeCipher::key_bytes
pub struct EcCommutativeCipher {
    key: Scalar,
}

impl EcCommutativeCipher {
    /// Create a cipher with a fresh uniformly random nonzero key.
    pub fn with_new_key() -> Self {
        let mut rng = OsRng;
        let key = loop {
            let candidate = Scalar::random(&mut rng);
            if candidate != Scalar::ZERO {
                break candidate;
            }
        };
        Self { key }
    }

    /// Reconstruct a cipher from bytes previously produced by
    /// [`key_bytes`](Self::key_bytes).
    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_BYTES] = bytes.try_into().map_err(|_| {
            PsiSumError::MalformedMessage(format!(
                "cipher key must be {} bytes, got {}",
                KEY_BYTES,
                bytes.len()
            ))
        })?;
        let key = Option::<Scalar>::from(Scalar::from_canonical_bytes(array)).ok_or_else(|| {
            PsiSumError::MalformedMessage("cipher key is not a canonical scalar".to_string())
        })?;
        if key == Scalar::ZERO {
            return Err(PsiSumError::MalformedMessage(
                "cipher key must be nonzero".to_string(),
            ));
        }
        Ok(Self { key })
    }

    /// Serialize the secret scalar for state resumption.
    pub fn key_bytes(&self) -> [u8; KEY_BYTES] {
        self.key.to_bytes()
    }

    /// Encrypt identifier bytes: `k * H(msg)`. Deterministic for a fixed key.
    pub fn encrypt(&self, msg: &[u8]) -> Result<CompressedRistretto> {
        if msg.is_empty() {
            return Err(PsiSumError::InvalidInput(
                "identifier must not be empty".to_string(),
            ));
        }
        Ok((self.key * hash_to_point(msg)).compress())
    }

    /// Re-encrypt an already-encrypted point: `k * P`.
    pub fn re_encrypt(&self, point: &CompressedRistretto) -> Result<CompressedRistretto> {
        let decompressed = point.decompress().ok_or_else(|| {
            PsiSumError::MalformedMessage("point is not on the curve".to_string())
        })?;
        Ok((self.key * decompressed).compress())
    }
}

impl Drop for EcCommutativeCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}
