//! FHE Ciphertext types with Real TFHE-rs

use tfhe::prelude::*;
use tfhe::FheUint64 as TfheFheUint64;

use super::keys::ClientKey;
use crate::{FHEError, FHEResult};

/// Encrypted 64-bit unsigned integer
#[derive(Clone)]
pub struct FHEUint64 {
    inner: TfheFheUint64,
    /// Homomorphic operations behind this value, for diagnostics
    op_count: u32,
}

impl FHEUint64 {
    /// Encrypt a u64 value with client key
    pub fn encrypt(value: u64, client_key: &ClientKey) -> FHEResult<Self> {
        let encrypted = TfheFheUint64::try_encrypt(value, client_key.inner())
            .map_err(|e| FHEError::EncryptionFailed(e.to_string()))?;
        Ok(Self::from_tfhe(encrypted))
    }

    /// Noiseless encryption of a public constant, no key required
    pub fn trivial(value: u64) -> FHEResult<Self> {
        let encrypted = TfheFheUint64::try_encrypt_trivial(value)
            .map_err(|e| FHEError::EncryptionFailed(e.to_string()))?;
        Ok(Self::from_tfhe(encrypted))
    }

    /// Decrypt to u64 using client key
    pub fn decrypt(&self, client_key: &ClientKey) -> FHEResult<u64> {
        let result: u64 = self.inner.decrypt(client_key.inner());
        Ok(result)
    }

    pub fn inner(&self) -> &TfheFheUint64 {
        &self.inner
    }

    pub fn from_tfhe(inner: TfheFheUint64) -> Self {
        Self { inner, op_count: 0 }
    }

    pub fn from_tfhe_with_ops(inner: TfheFheUint64, op_count: u32) -> Self {
        Self { inner, op_count }
    }

    pub fn op_count(&self) -> u32 {
        self.op_count
    }

    pub fn to_bytes(&self) -> FHEResult<Vec<u8>> {
        bincode::serialize(&self.inner).map_err(|e| FHEError::SerializationError(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> FHEResult<Self> {
        let inner: TfheFheUint64 =
            bincode::deserialize(bytes).map_err(|e| FHEError::InvalidCiphertext(e.to_string()))?;
        Ok(Self::from_tfhe(inner))
    }
}

impl std::fmt::Debug for FHEUint64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FHEUint64").field("ops", &self.op_count).finish()
    }
}
