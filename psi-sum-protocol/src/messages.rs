//! Wire messages exchanged between the protocol parties.
//!
//! The exchange is strictly ordered: [`ServerRoundOne`] carries the server's
//! singly-encrypted set to the client, [`ClientRoundOne`] returns the
//! re-encrypted server set together with the client's encrypted set and
//! Paillier modulus, and [`ServerRoundTwo`] carries the blinded
//! intersection-sum back to the client.
//!
//! Messages are schema-versioned plain structs; [`to_bytes`] /
//! [`from_bytes`] provide the byte-level encoding (bincode) expected by a
//! caller-supplied reliable ordered transport.
//!
//! [`to_bytes`]: ServerRoundOne::to_bytes
//! [`from_bytes`]: ServerRoundOne::from_bytes

use crate::error::{PsiSumError, Result};
use curve25519_dalek::ristretto::CompressedRistretto;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Version tag carried by every wire message.
pub const WIRE_VERSION: u8 = 1;

fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    bincode::serialize(message)
        .map_err(|e| PsiSumError::Internal(format!("failed to encode message: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| PsiSumError::MalformedMessage(format!("failed to decode {}: {}", what, e)))
}

fn check_version(version: u8, what: &str) -> Result<()> {
    if version != WIRE_VERSION {
        return Err(PsiSumError::MalformedMessage(format!(
            "{} has wire version {}, expected {}",
            what, version, WIRE_VERSION
        )));
    }
    Ok(())
}

/// First message: the server's input set, encrypted once under the server's
/// cipher key and shuffled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRoundOne {
    version: u8,
    /// Singly-encrypted server identifiers, in shuffled order.
    pub encrypted_set: Vec<CompressedRistretto>,
}

impl ServerRoundOne {
    pub fn new(encrypted_set: Vec<CompressedRistretto>) -> Self {
        Self {
            version: WIRE_VERSION,
            encrypted_set,
        }
    }

    /// Number of encrypted identifiers in this message.
    pub fn len(&self) -> usize {
        self.encrypted_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encrypted_set.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let message: Self = decode(bytes, "ServerRoundOne")?;
        check_version(message.version, "ServerRoundOne")?;
        Ok(message)
    }
}

/// One client identifier, encrypted under the client's cipher key and paired
/// with the Paillier encryption of its associated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedElement {
    /// `k_c * H(identifier)` in canonical compressed encoding.
    pub element: CompressedRistretto,
    /// Paillier ciphertext of the associated value, minimal big-endian.
    pub value: Vec<u8>,
}

/// Second message: the client's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRoundOne {
    version: u8,
    /// The server's round-one set, further encrypted under the client's
    /// cipher key and shuffled.
    pub reencrypted_set: Vec<CompressedRistretto>,
    /// The client's own set with Paillier-encrypted values, shuffled.
    pub encrypted_set: Vec<EncryptedElement>,
    /// The client's Paillier modulus `n`, minimal big-endian.
    pub paillier_modulus: Vec<u8>,
}

impl ClientRoundOne {
    pub fn new(
        reencrypted_set: Vec<CompressedRistretto>,
        encrypted_set: Vec<EncryptedElement>,
        paillier_modulus: Vec<u8>,
    ) -> Self {
        Self {
            version: WIRE_VERSION,
            reencrypted_set,
            encrypted_set,
            paillier_modulus,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let message: Self = decode(bytes, "ClientRoundOne")?;
        check_version(message.version, "ClientRoundOne")?;
        Ok(message)
    }
}

/// Third message: the intersection size and the re-randomized encrypted sum
/// of the matched values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRoundTwo {
    version: u8,
    /// Number of identifiers present in both input sets.
    pub intersection_size: u64,
    /// Paillier ciphertext of the intersection-sum, minimal big-endian.
    pub encrypted_sum: Vec<u8>,
}

impl ServerRoundTwo {
    pub fn new(intersection_size: u64, encrypted_sum: Vec<u8>) -> Self {
        Self {
            version: WIRE_VERSION,
            intersection_size,
            encrypted_sum,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let message: Self = decode(bytes, "ServerRoundTwo")?;
        check_version(message.version, "ServerRoundTwo")?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_point(fill: u8) -> CompressedRistretto {
        CompressedRistretto([fill; 32])
    }

    #[test]
    fn test_server_round_one_byte_round_trip() {
        let message = ServerRoundOne::new(vec![sample_point(1), sample_point(2)]);
        let bytes = message.to_bytes().unwrap();
        assert_eq!(ServerRoundOne::from_bytes(&bytes).unwrap(), message);
        assert_eq!(message.len(), 2);
        assert!(!message.is_empty());
    }

    #[test]
    fn test_client_round_one_byte_round_trip() {
        let message = ClientRoundOne::new(
            vec![sample_point(3)],
            vec![EncryptedElement {
                element: sample_point(4),
                value: vec![0x01, 0x02],
            }],
            vec![0x0f, 0xff],
        );
        let bytes = message.to_bytes().unwrap();
        assert_eq!(ClientRoundOne::from_bytes(&bytes).unwrap(), message);
    }

    #[test]
    fn test_server_round_two_byte_round_trip() {
        let message = ServerRoundTwo::new(7, vec![0xab; 64]);
        let bytes = message.to_bytes().unwrap();
        assert_eq!(ServerRoundTwo::from_bytes(&bytes).unwrap(), message);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            ServerRoundOne::from_bytes(&[0xde, 0xad]),
            Err(PsiSumError::MalformedMessage(_))
        ));
        assert!(matches!(
            ClientRoundOne::from_bytes(&[]),
            Err(PsiSumError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_wrong_version() {
        let mut message = ServerRoundTwo::new(1, vec![0x01]);
        message.version = WIRE_VERSION + 1;
        let bytes = message.to_bytes().unwrap();
        assert!(matches!(
            ServerRoundTwo::from_bytes(&bytes),
            Err(PsiSumError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_truncated_message_rejected() {
        let message = ServerRoundOne::new(vec![sample_point(9); 4]);
        let bytes = message.to_bytes().unwrap();
        assert!(ServerRoundOne::from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }
}
