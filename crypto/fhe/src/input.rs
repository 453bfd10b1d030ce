//! Client inputs and their proofs
//!
//! A client encrypts its amounts off-chain and submits them together with an
//! [`InputProof`]. The proof binds the ciphertexts to the contract that will
//! consume them and the user allowed to submit them; handles are derived
//! from the attestation, so a handle cannot be replayed against another
//! proof or another context.

use serde::{Deserialize, Serialize};

use crate::backend::{FheBackend, FheClient};
use crate::types::{Address, Handle};
use crate::{FHEError, FHEResult};

const ATTESTOR_CONTEXT: &str = "novalend input attestor v1";
const INPUT_HANDLE_CONTEXT: &str = "novalend input handle v1";

/// Attestation over a batch of client ciphertexts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof {
    /// Contract allowed to import the ciphertexts
    pub contract: Address,
    /// Account allowed to submit them
    pub user: Address,
    /// Serialized ciphertexts, in handle order
    pub ciphertexts: Vec<Vec<u8>>,
    /// Keyed BLAKE3 attestation, hex encoded
    pub attestation: String,
}

/// Handles plus the proof that makes them importable
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub handles: Vec<Handle>,
    pub input_proof: InputProof,
}

/// Signs and checks input proofs
///
/// Plays the role of the network's input verifier: whoever holds the key can
/// vouch that ciphertexts were produced for a given (contract, user).
#[derive(Clone)]
pub struct InputAttestor {
    key: [u8; 32],
}

impl InputAttestor {
    pub fn from_seed(seed: &[u8]) -> Self {
        Self {
            key: blake3::derive_key(ATTESTOR_CONTEXT, seed),
        }
    }

    fn digest(&self, contract: &Address, user: &Address, ciphertexts: &[Vec<u8>]) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(contract.as_bytes());
        hasher.update(user.as_bytes());
        hasher.update(&(ciphertexts.len() as u64).to_le_bytes());
        for ct in ciphertexts {
            hasher.update(&(ct.len() as u64).to_le_bytes());
            hasher.update(ct);
        }
        hasher.finalize()
    }

    /// Produce a proof for serialized ciphertexts
    pub fn attest(&self, contract: Address, user: Address, ciphertexts: Vec<Vec<u8>>) -> InputProof {
        let attestation = self.digest(&contract, &user, &ciphertexts).to_hex().to_string();
        InputProof {
            contract,
            user,
            ciphertexts,
            attestation,
        }
    }

    /// Check a proof's attestation (not its call context)
    pub fn verify(&self, proof: &InputProof) -> FHEResult<()> {
        let claimed = blake3::Hash::from_hex(&proof.attestation)
            .map_err(|e| FHEError::InvalidProof(format!("malformed attestation: {e}")))?;
        let expected = self.digest(&proof.contract, &proof.user, &proof.ciphertexts);
        // blake3::Hash equality is constant time
        if claimed != expected {
            return Err(FHEError::InvalidProof("attestation does not verify".into()));
        }
        Ok(())
    }

    /// Handles named by a proof, one per ciphertext
    pub fn handles_for(proof: &InputProof) -> FHEResult<Vec<Handle>> {
        let attestation = blake3::Hash::from_hex(&proof.attestation)
            .map_err(|e| FHEError::InvalidProof(format!("malformed attestation: {e}")))?;
        Ok((0..proof.ciphertexts.len())
            .map(|index| {
                let mut hasher = blake3::Hasher::new_derive_key(INPUT_HANDLE_CONTEXT);
                hasher.update(attestation.as_bytes());
                hasher.update(&(index as u64).to_le_bytes());
                Handle::new(*hasher.finalize().as_bytes())
            })
            .collect())
    }
}

impl std::fmt::Debug for InputAttestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputAttestor").finish_non_exhaustive()
    }
}

/// Client-side builder for an [`EncryptedInput`]
pub struct InputBuilder<'a, C: FheClient> {
    client: &'a C,
    attestor: &'a InputAttestor,
    contract: Address,
    user: Address,
    values: Vec<u64>,
}

impl<'a, C: FheClient> InputBuilder<'a, C> {
    pub fn new(client: &'a C, attestor: &'a InputAttestor, contract: Address, user: Address) -> Self {
        Self {
            client,
            attestor,
            contract,
            user,
            values: Vec::new(),
        }
    }

    /// Queue a 64-bit value
    pub fn add64(&mut self, value: u64) -> &mut Self {
        self.values.push(value);
        self
    }

    /// Encrypt queued values and attest them
    pub fn encrypt(&self) -> FHEResult<EncryptedInput> {
        let ciphertexts = self
            .values
            .iter()
            .map(|value| {
                let ct = self.client.encrypt_u64(*value)?;
                <C::Backend as FheBackend>::serialize_uint(&ct)
            })
            .collect::<FHEResult<Vec<_>>>()?;

        let input_proof = self.attestor.attest(self.contract, self.user, ciphertexts);
        let handles = InputAttestor::handles_for(&input_proof)?;
        tracing::debug!(
            contract = %self.contract.short(),
            user = %self.user.short(),
            count = handles.len(),
            "encrypted client input"
        );
        Ok(EncryptedInput {
            handles,
            input_proof,
        })
    }
}
