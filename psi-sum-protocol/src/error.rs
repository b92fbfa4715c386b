//! Error types for the intersection-sum protocol.

use std::fmt;

/// Errors that can occur while running the intersection-sum protocol.
///
/// Every kind carries a human-readable context string. Errors are never
/// recovered inside the protocol core; a session that produced an error
/// must be discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PsiSumError {
    /// Caller supplied out-of-range input (empty identifier, value out of
    /// range, modulus size below the minimum).
    InvalidInput(String),

    /// A peer message failed to parse, contained a point not on the curve,
    /// or contained an out-of-range ciphertext.
    MalformedMessage(String),

    /// A protocol operation was invoked in the wrong state.
    ProtocolOrder(String),

    /// A cryptographic operation failed (randomness, prime generation).
    Crypto(String),

    /// An internal invariant was violated. Indicates a bug.
    Internal(String),
}

impl fmt::Display for PsiSumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsiSumError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            PsiSumError::MalformedMessage(msg) => write!(f, "malformed message: {}", msg),
            PsiSumError::ProtocolOrder(msg) => write!(f, "protocol order violation: {}", msg),
            PsiSumError::Crypto(msg) => write!(f, "cryptographic failure: {}", msg),
            PsiSumError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for PsiSumError {}

/// Result type for intersection-sum operations.
pub type Result<T> = std::result::Result<T, PsiSumError>;
