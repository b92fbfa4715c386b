//! The two party roles of the intersection-sum protocol.
//!
//! The [`Server`] holds identifiers only and learns the intersection size;
//! the [`Client`] holds identifiers with associated non-negative values,
//! owns the Paillier decryption key, and learns both the size and the sum.
//! Each role enforces its state machine at runtime: out-of-order calls fail
//! with [`PsiSumError::ProtocolOrder`] and a failed session must be
//! discarded.
//!
//! Both parties generate their key material at construction and can export
//! their full session state as an opaque byte blob for resumption across a
//! process boundary.

use crate::context::Context;
use crate::ecc::{EcCommutativeCipher, KEY_BYTES};
use crate::error::{PsiSumError, Result};
use crate::messages::{ClientRoundOne, EncryptedElement, ServerRoundOne, ServerRoundTwo};
use crate::paillier::{PaillierPrivateKey, PaillierPublicKey};
use curve25519_dalek::ristretto::CompressedRistretto;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Version tag carried by serialized party state.
pub(crate) const STATE_VERSION: u8 = 1;

/// Identifiers within one party's input must be non-empty. Duplicates are
/// not detected; the protocol output for inputs containing duplicates is
/// unspecified.
fn check_identifiers(identifiers: &[Vec<u8>]) -> Result<()> {
    if identifiers.iter().any(|id| id.is_empty()) {
        return Err(PsiSumError::InvalidInput(
            "identifiers must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn decode_state<T: serde::de::DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| PsiSumError::MalformedMessage(format!("failed to decode {}: {}", what, e)))
}

fn encode_state<T: Serialize>(state: &T) -> Result<Vec<u8>> {
    bincode::serialize(state)
        .map_err(|e| PsiSumError::Internal(format!("failed to encode state: {}", e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum ServerStage {
    Init,
    SetSent,
    Done,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ServerState {
    pub(crate) version: u8,
    pub(crate) stage: ServerStage,
    pub(crate) ec_key: [u8; KEY_BYTES],
    pub(crate) inputs: Vec<Vec<u8>>,
}

impl ServerState {
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_state(self)
    }
}

/// The server party: supplies identifiers, learns the intersection size.
pub struct Server {
    ctx: Context,
    cipher: EcCommutativeCipher,
    inputs: Vec<Vec<u8>>,
    stage: ServerStage,
}

impl Server {
    /// Create a server over its input identifiers. The cipher key is
    /// generated here and lives for the whole session.
    ///
    /// The input set may be empty; individual identifiers must not be.
    pub fn new(ctx: Context, inputs: Vec<Vec<u8>>) -> Result<Self> {
        check_identifiers(&inputs)?;
        Ok(Self {
            ctx,
            cipher: EcCommutativeCipher::with_new_key(),
            inputs,
            stage: ServerStage::Init,
        })
    }

    /// Restore a server from bytes produced by [`state_bytes`].
    ///
    /// [`state_bytes`]: Server::state_bytes
    pub fn from_state_bytes(ctx: Context, bytes: &[u8]) -> Result<Self> {
        let state: ServerState = decode_state(bytes, "server state")?;
        if state.version != STATE_VERSION {
            return Err(PsiSumError::MalformedMessage(format!(
                "server state has version {}, expected {}",
                state.version, STATE_VERSION
            )));
        }
        check_identifiers(&state.inputs)?;
        Ok(Self {
            ctx,
            cipher: EcCommutativeCipher::from_key_bytes(&state.ec_key)?,
            inputs: state.inputs,
            stage: state.stage,
        })
    }

    /// Export the full session state (identifiers, cipher key, stage) as an
    /// opaque blob. The blob contains the secret key and must be protected
    /// like one.
    pub fn state_bytes(&self) -> Result<Vec<u8>> {
        ServerState {
            version: STATE_VERSION,
            stage: self.stage,
            ec_key: self.cipher.key_bytes(),
            inputs: self.inputs.clone(),
        }
        .to_bytes()
    }

    /// First protocol step: encrypt every input identifier under the server
    /// key and return them in uniformly shuffled order.
    ///
    /// Must be called exactly once, before [`compute_intersection`].
    ///
    /// [`compute_intersection`]: Server::compute_intersection
    pub fn encrypt_set(&mut self) -> Result<ServerRoundOne> {
        if self.stage != ServerStage::Init {
            return Err(PsiSumError::ProtocolOrder(
                "encrypt_set must be the first server operation and is not repeatable".to_string(),
            ));
        }
        let mut points = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            points.push(self.cipher.encrypt(input)?);
        }
        self.ctx.shuffle(&mut points);
        self.stage = ServerStage::SetSent;
        Ok(ServerRoundOne::new(points))
    }

    /// Third protocol step: find the intersection between the doubly
    /// encrypted sets and homomorphically sum the matched values.
    ///
    /// The client's elements are re-encrypted under the server key; by
    /// commutativity they then live in the same doubly-encrypted group as
    /// the `reencrypted_set` field, so membership is a bytewise comparison
    /// of canonical compressed points. The summed ciphertext is
    /// re-randomized before it is returned so the client cannot correlate
    /// it with any individual input ciphertext.
    pub fn compute_intersection(&mut self, message: &ClientRoundOne) -> Result<ServerRoundTwo> {
        if self.stage != ServerStage::SetSent {
            return Err(PsiSumError::ProtocolOrder(
                "compute_intersection requires encrypt_set first".to_string(),
            ));
        }
        let public_key =
            PaillierPublicKey::from_modulus(BigUint::from_bytes_be(&message.paillier_modulus))?;

        for point in &message.reencrypted_set {
            if point.decompress().is_none() {
                return Err(PsiSumError::MalformedMessage(
                    "re-encrypted set contains a point not on the curve".to_string(),
                ));
            }
        }
        let server_set: HashSet<CompressedRistretto> =
            message.reencrypted_set.iter().copied().collect();

        let mut matched = Vec::new();
        for element in &message.encrypted_set {
            let value = BigUint::from_bytes_be(&element.value);
            public_key.check_ciphertext(&value)?;
            let doubly_encrypted = self.cipher.re_encrypt(&element.element)?;
            if server_set.contains(&doubly_encrypted) {
                matched.push(value);
            }
        }

        let sum = match matched.split_first() {
            None => public_key.encrypt(&BigUint::zero(), &mut self.ctx)?,
            Some((first, rest)) => rest
                .iter()
                .fold(first.clone(), |acc, c| public_key.add(&acc, c)),
        };
        let blinded_sum = public_key.rerandomize(&sum, &mut self.ctx);

        self.stage = ServerStage::Done;
        Ok(ServerRoundTwo::new(
            matched.len() as u64,
            blinded_sum.to_bytes_be(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum ClientStage {
    Init,
    ReEncrypted,
    Done,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ClientState {
    pub(crate) version: u8,
    pub(crate) stage: ClientStage,
    pub(crate) ec_key: [u8; KEY_BYTES],
    pub(crate) p: Vec<u8>,
    pub(crate) q: Vec<u8>,
    pub(crate) elements: Vec<Vec<u8>>,
    pub(crate) values: Vec<Vec<u8>>,
}

impl ClientState {
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_state(self)
    }
}

/// The client party: supplies identifiers with associated values, holds the
/// Paillier decryption key, and receives the final output.
pub struct Client {
    ctx: Context,
    cipher: EcCommutativeCipher,
    paillier: PaillierPrivateKey,
    elements: Vec<Vec<u8>>,
    values: Vec<BigUint>,
    stage: ClientStage,
}

impl Client {
    /// Create a client over its identifiers and associated values, pairing
    /// each identifier positionally with one value.
    ///
    /// Generates a fresh cipher key and a Paillier key pair with a
    /// `modulus_bits`-bit modulus; safe-prime generation makes this
    /// potentially long-running. `modulus_bits` below
    /// [`MIN_MODULUS_BITS`](crate::MIN_MODULUS_BITS) is rejected.
    pub fn new(
        mut ctx: Context,
        elements: Vec<Vec<u8>>,
        values: Vec<BigUint>,
        modulus_bits: u64,
    ) -> Result<Self> {
        let paillier = PaillierPrivateKey::generate(&mut ctx, modulus_bits)?;
        Self::with_key(ctx, elements, values, paillier)
    }

    /// Create a client with a caller-provided Paillier key, e.g. one
    /// pregenerated offline.
    pub fn with_key(
        ctx: Context,
        elements: Vec<Vec<u8>>,
        values: Vec<BigUint>,
        paillier: PaillierPrivateKey,
    ) -> Result<Self> {
        if elements.len() != values.len() {
            return Err(PsiSumError::InvalidInput(format!(
                "{} identifiers paired with {} values",
                elements.len(),
                values.len()
            )));
        }
        check_identifiers(&elements)?;
        let modulus = paillier.public_key();
        if values.iter().any(|v| v >= modulus.modulus()) {
            return Err(PsiSumError::InvalidInput(
                "associated value exceeds the paillier modulus".to_string(),
            ));
        }
        Ok(Self {
            ctx,
            cipher: EcCommutativeCipher::with_new_key(),
            paillier,
            elements,
            values,
            stage: ClientStage::Init,
        })
    }

    /// Restore a client from bytes produced by [`state_bytes`].
    ///
    /// [`state_bytes`]: Client::state_bytes
    pub fn from_state_bytes(ctx: Context, bytes: &[u8]) -> Result<Self> {
        let state: ClientState = decode_state(bytes, "client state")?;
        if state.version != STATE_VERSION {
            return Err(PsiSumError::MalformedMessage(format!(
                "client state has version {}, expected {}",
                state.version, STATE_VERSION
            )));
        }
        let paillier = PaillierPrivateKey::from_primes(
            BigUint::from_bytes_be(&state.p),
            BigUint::from_bytes_be(&state.q),
        )?;
        let cipher = EcCommutativeCipher::from_key_bytes(&state.ec_key)?;
        let mut client = Self::with_key(
            ctx,
            state.elements,
            state.values.iter().map(|v| BigUint::from_bytes_be(v)).collect(),
            paillier,
        )?;
        client.cipher = cipher;
        client.stage = state.stage;
        Ok(client)
    }

    /// Export the full session state (identifiers, values, cipher key,
    /// Paillier primes, stage) as an opaque blob. The blob contains private
    /// key material and must be protected accordingly.
    pub fn state_bytes(&self) -> Result<Vec<u8>> {
        let (p, q) = self.paillier.primes();
        ClientState {
            version: STATE_VERSION,
            stage: self.stage,
            ec_key: self.cipher.key_bytes(),
            p: p.to_bytes_be(),
            q: q.to_bytes_be(),
            elements: self.elements.clone(),
            values: self.values.iter().map(|v| v.to_bytes_be()).collect(),
        }
        .to_bytes()
    }

    /// Second protocol step: re-encrypt the server's round-one set under
    /// the client key, and encrypt the client's own set pairing each
    /// element with the Paillier encryption of its value. Both collections
    /// are independently shuffled; the Paillier modulus travels in-band.
    pub fn re_encrypt_set(&mut self, message: &ServerRoundOne) -> Result<ClientRoundOne> {
        if self.stage != ClientStage::Init {
            return Err(PsiSumError::ProtocolOrder(
                "re_encrypt_set must be the first client operation and is not repeatable"
                    .to_string(),
            ));
        }
        let mut reencrypted = Vec::with_capacity(message.encrypted_set.len());
        for point in &message.encrypted_set {
            reencrypted.push(self.cipher.re_encrypt(point)?);
        }
        self.ctx.shuffle(&mut reencrypted);

        let public_key = self.paillier.public_key();
        let mut encrypted_set = Vec::with_capacity(self.elements.len());
        for (element, value) in self.elements.iter().zip(&self.values) {
            let point = self.cipher.encrypt(element)?;
            let ciphertext = public_key.encrypt(value, &mut self.ctx)?;
            encrypted_set.push(EncryptedElement {
                element: point,
                value: ciphertext.to_bytes_be(),
            });
        }
        self.ctx.shuffle(&mut encrypted_set);

        self.stage = ClientStage::ReEncrypted;
        Ok(ClientRoundOne::new(
            reencrypted,
            encrypted_set,
            public_key.modulus().to_bytes_be(),
        ))
    }

    /// Final protocol step: decrypt the intersection-sum and surface the
    /// server-declared intersection size unchanged.
    pub fn decrypt_sum(&mut self, message: &ServerRoundTwo) -> Result<(u64, BigUint)> {
        if self.stage != ClientStage::ReEncrypted {
            return Err(PsiSumError::ProtocolOrder(
                "decrypt_sum requires re_encrypt_set first".to_string(),
            ));
        }
        let ciphertext = BigUint::from_bytes_be(&message.encrypted_sum);
        self.paillier.public_key().check_ciphertext(&ciphertext)?;
        let sum = self.paillier.decrypt(&ciphertext);
        self.stage = ClientStage::Done;
        Ok((message.intersection_size, sum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{client_key, ids, pairs};

    fn connected_parties(
        server_ids: &[&[u8]],
        client_pairs: &[(&[u8], u32)],
    ) -> (Server, Client) {
        let server = Server::new(Context::new(), ids(server_ids)).unwrap();
        let (elements, values) = pairs(client_pairs);
        let client = Client::with_key(Context::new(), elements, values, client_key()).unwrap();
        (server, client)
    }

    #[test]
    fn test_server_rejects_empty_identifier() {
        let inputs = vec![b"ok".to_vec(), Vec::new()];
        assert!(matches!(
            Server::new(Context::new(), inputs),
            Err(PsiSumError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_client_rejects_mismatched_lengths() {
        let result = Client::with_key(
            Context::new(),
            vec![b"a".to_vec()],
            Vec::new(),
            client_key(),
        );
        assert!(matches!(result, Err(PsiSumError::InvalidInput(_))));
    }

    #[test]
    fn test_client_rejects_oversized_value() {
        let too_big = client_key().public_key().modulus().clone();
        let result = Client::with_key(
            Context::new(),
            vec![b"a".to_vec()],
            vec![too_big],
            client_key(),
        );
        assert!(matches!(result, Err(PsiSumError::InvalidInput(_))));
    }

    #[test]
    fn test_encrypt_set_not_repeatable() {
        let (mut server, _) = connected_parties(&[b"a"], &[]);
        server.encrypt_set().unwrap();
        assert!(matches!(
            server.encrypt_set(),
            Err(PsiSumError::ProtocolOrder(_))
        ));
    }

    #[test]
    fn test_compute_intersection_requires_encrypt_set() {
        let (mut server, mut client) = connected_parties(&[b"a"], &[(b"a", 1)]);
        let round_one = Server::new(Context::new(), ids(&[b"a"]))
            .unwrap()
            .encrypt_set()
            .unwrap();
        let client_round_one = client.re_encrypt_set(&round_one).unwrap();
        assert!(matches!(
            server.compute_intersection(&client_round_one),
            Err(PsiSumError::ProtocolOrder(_))
        ));
    }

    #[test]
    fn test_decrypt_sum_requires_re_encrypt_set() {
        let (_, mut client) = connected_parties(&[], &[(b"a", 1)]);
        let message = ServerRoundTwo::new(0, vec![0x01]);
        assert!(matches!(
            client.decrypt_sum(&message),
            Err(PsiSumError::ProtocolOrder(_))
        ));
    }

    #[test]
    fn test_re_encrypt_set_not_repeatable() {
        let (mut server, mut client) = connected_parties(&[b"a"], &[(b"a", 1)]);
        let round_one = server.encrypt_set().unwrap();
        client.re_encrypt_set(&round_one).unwrap();
        assert!(matches!(
            client.re_encrypt_set(&round_one),
            Err(PsiSumError::ProtocolOrder(_))
        ));
    }

    #[test]
    fn test_compute_intersection_rejects_invalid_point() {
        let (mut server, mut client) = connected_parties(&[b"a"], &[(b"a", 1)]);
        let round_one = server.encrypt_set().unwrap();
        let mut client_round_one = client.re_encrypt_set(&round_one).unwrap();
        client_round_one.reencrypted_set[0] = CompressedRistretto([0xff; 32]);
        assert!(matches!(
            server.compute_intersection(&client_round_one),
            Err(PsiSumError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_compute_intersection_rejects_out_of_range_ciphertext() {
        let (mut server, mut client) = connected_parties(&[b"a"], &[(b"a", 1)]);
        let round_one = server.encrypt_set().unwrap();
        let mut client_round_one = client.re_encrypt_set(&round_one).unwrap();
        let n = BigUint::from_bytes_be(&client_round_one.paillier_modulus);
        client_round_one.encrypted_set[0].value = (&n * &n).to_bytes_be();
        assert!(matches!(
            server.compute_intersection(&client_round_one),
            Err(PsiSumError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_compute_intersection_rejects_undersized_modulus() {
        let (mut server, mut client) = connected_parties(&[b"a"], &[(b"a", 1)]);
        let round_one = server.encrypt_set().unwrap();
        let mut client_round_one = client.re_encrypt_set(&round_one).unwrap();
        client_round_one.paillier_modulus = vec![0x0f];
        assert!(matches!(
            server.compute_intersection(&client_round_one),
            Err(PsiSumError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_decrypt_sum_rejects_out_of_range_ciphertext() {
        let (mut server, mut client) = connected_parties(&[b"a"], &[(b"a", 1)]);
        let round_one = server.encrypt_set().unwrap();
        client.re_encrypt_set(&round_one).unwrap();
        let n = client_key().public_key().modulus().clone();
        let message = ServerRoundTwo::new(1, (&n * &n).to_bytes_be());
        assert!(matches!(
            client.decrypt_sum(&message),
            Err(PsiSumError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_server_state_round_trip_preserves_stage() {
        let (mut server, _) = connected_parties(&[b"a", b"b"], &[]);
        server.encrypt_set().unwrap();
        let blob = server.state_bytes().unwrap();
        let restored = Server::from_state_bytes(Context::new(), &blob).unwrap();
        assert_eq!(restored.stage, ServerStage::SetSent);
        assert_eq!(restored.inputs, server.inputs);
        assert_eq!(restored.cipher.key_bytes(), server.cipher.key_bytes());
    }

    #[test]
    fn test_client_state_round_trip_preserves_keys() {
        let (_, client) = connected_parties(&[], &[(b"a", 5), (b"b", 6)]);
        let blob = client.state_bytes().unwrap();
        let restored = Client::from_state_bytes(Context::new(), &blob).unwrap();
        assert_eq!(restored.stage, ClientStage::Init);
        assert_eq!(restored.elements, client.elements);
        assert_eq!(restored.values, client.values);
        assert_eq!(restored.cipher.key_bytes(), client.cipher.key_bytes());
        assert_eq!(restored.paillier, client.paillier);
    }

    #[test]
    fn test_state_rejects_garbage_and_wrong_version() {
        assert!(Server::from_state_bytes(Context::new(), &[1, 2, 3]).is_err());
        let (_, client) = connected_parties(&[], &[(b"a", 1)]);
        let (p, q) = client.paillier.primes();
        let state = ClientState {
            version: STATE_VERSION + 1,
            stage: ClientStage::Init,
            ec_key: client.cipher.key_bytes(),
            p: p.to_bytes_be(),
            q: q.to_bytes_be(),
            elements: vec![b"a".to_vec()],
            values: vec![vec![1]],
        };
        assert!(matches!(
            Client::from_state_bytes(Context::new(), &state.to_bytes().unwrap()),
            Err(PsiSumError::MalformedMessage(_))
        ));
    }
}
