//! # Private Intersection-Sum Protocol
//!
//! This library implements the two-party private intersection-sum protocol:
//! an ECDH-style commutative cipher on the Ristretto group
//! (curve25519-dalek) blinds the identifiers, and the Paillier cryptosystem
//! carries the client's associated values so the server can sum them
//! without seeing them.
//!
//! The server party supplies identifiers only and learns the size of the
//! intersection. The client party supplies identifiers with non-negative
//! integer values, holds the Paillier decryption key, and learns both the
//! intersection size and the sum of the values whose identifiers appear in
//! both sets. Neither party learns which identifiers matched, nor anything
//! about the peer's non-intersecting entries.
//!
//! ## Features
//!
//! - **Transport agnostic**: the library produces and consumes messages;
//!   exchanging them is left to the caller (TCP, HTTP, in-memory, ...).
//!   A reliable ordered transport with request/response framing is assumed.
//! - **Byte-level wire format**: every message is a schema-versioned struct
//!   with `to_bytes` / `from_bytes` (bincode underneath).
//! - **Resumable parties**: a party exports its full session state
//!   (identifiers, values, key material) as an opaque blob and can be
//!   reconstructed from it across a process boundary.
//! - **Input as byte arrays**: identifiers are `Vec<u8>`; hashing to the
//!   curve is handled internally.
//!
//! ## Protocol Overview
//!
//! The exchange is strictly ordered, three messages in total:
//!
//! 1. **ServerRoundOne**: the server encrypts each of its identifiers under
//!    its cipher key and sends the shuffled set.
//! 2. **ClientRoundOne**: the client re-encrypts the server's set under its
//!    own key, encrypts its own identifiers likewise, pairs each with the
//!    Paillier encryption of its value, shuffles both collections, and
//!    sends them with its Paillier modulus.
//! 3. **ServerRoundTwo**: the server re-encrypts the client's elements
//!    under its key; by commutativity the doubly-encrypted points of
//!    matching identifiers are bytewise equal, so it selects the matched
//!    value ciphertexts, multiplies them into an encrypted sum,
//!    re-randomizes it, and returns it with the match count.
//!
//! The client decrypts the sum and outputs `(intersection size, sum)`.
//!
//! ## Example Usage
//!
//! ```ignore
//! use num_bigint::BigUint;
//! use psi_sum_protocol::{Client, Context, Server};
//!
//! let mut server = Server::new(Context::new(), vec![b"a".to_vec(), b"b".to_vec()])?;
//! let mut client = Client::new(
//!     Context::new(),
//!     vec![b"b".to_vec(), b"c".to_vec()],
//!     vec![BigUint::from(10u32), BigUint::from(20u32)],
//!     1536,
//! )?;
//!
//! // Exchange messages (via the caller's transport)
//! let round_one = server.encrypt_set()?;
//! let client_round_one = client.re_encrypt_set(&round_one)?;
//! let round_two = server.compute_intersection(&client_round_one)?;
//!
//! let (size, sum) = client.decrypt_sum(&round_two)?;
//! assert_eq!(size, 1);
//! assert_eq!(sum, BigUint::from(10u32));
//! # Ok::<(), psi_sum_protocol::PsiSumError>(())
//! ```
//!
//! ## Security Considerations
//!
//! - The protocol is secure against semi-honest adversaries only; a
//!   malicious peer can misreport its inputs or the intersection size.
//! - Message exchange MUST be secured with TLS in production to prevent
//!   man-in-the-middle attacks.
//! - Wire collections are uniformly shuffled; positions carry no
//!   information. The returned sum is re-randomized so it cannot be
//!   correlated with any individual value ciphertext.
//! - Identifiers within one party's input are expected to be unique;
//!   duplicates make the reported size and sum unspecified.
//!
//! ## Modules
//!
//! - [`Server`] / [`Client`] - the two protocol roles
//! - [`ServerRoundOne`], [`ClientRoundOne`], [`ServerRoundTwo`] - wire messages
//! - [`EcCommutativeCipher`] - commutative identifier encryption
//! - [`PaillierPrivateKey`] / [`PaillierPublicKey`] - homomorphic value encryption
//! - [`Context`] - per-party randomness and number theory
//! - [`PsiSumError`] - error types

pub use context::Context;
pub use ecc::EcCommutativeCipher;
pub use error::{PsiSumError, Result};
pub use messages::{
    ClientRoundOne, EncryptedElement, ServerRoundOne, ServerRoundTwo, WIRE_VERSION,
};
pub use paillier::{PaillierPrivateKey, PaillierPublicKey, MIN_MODULUS_BITS};
pub use protocol::{Client, Server};

mod context;
mod ecc;
mod error;
mod messages;
mod paillier;
mod protocol;
