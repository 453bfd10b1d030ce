//! TFHE-rs implementation of the backend traits

use super::ciphertext::FHEUint64;
use super::keys::{ClientKey, KeyPair, ServerKey};
use super::operations::{FHEBool, FHEOps};
use crate::backend::{FheBackend, FheClient};
use crate::{FHEConfig, FHEResult};

/// Evaluation backend holding the TFHE server key
///
/// The key is installed on the calling thread before every operation, so
/// the backend can be used from any thread.
#[derive(Clone, Debug)]
pub struct TfheBackend {
    server: ServerKey,
}

impl TfheBackend {
    pub fn new(server: ServerKey) -> Self {
        Self { server }
    }

    fn install(&self) {
        self.server.set_global();
    }
}

impl FheBackend for TfheBackend {
    type Uint = FHEUint64;
    type Bool = FHEBool;

    fn name(&self) -> &'static str {
        "tfhe"
    }

    fn trivial_u64(&self, value: u64) -> FHEResult<FHEUint64> {
        self.install();
        FHEUint64::trivial(value)
    }

    fn add(&self, a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEUint64> {
        self.install();
        Ok(FHEOps::add(a, b))
    }

    fn sub(&self, a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEUint64> {
        self.install();
        Ok(FHEOps::sub(a, b))
    }

    fn add_scalar(&self, a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        self.install();
        Ok(FHEOps::add_scalar(a, scalar))
    }

    fn mul_scalar(&self, a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        self.install();
        Ok(FHEOps::mul_scalar(a, scalar))
    }

    fn div_scalar(&self, a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        self.install();
        FHEOps::div_scalar(a, scalar)
    }

    fn lt(&self, a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEBool> {
        self.install();
        Ok(FHEOps::lt(a, b))
    }

    fn le(&self, a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEBool> {
        self.install();
        Ok(FHEOps::le(a, b))
    }

    fn gt(&self, a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEBool> {
        self.install();
        Ok(FHEOps::gt(a, b))
    }

    fn ge(&self, a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEBool> {
        self.install();
        Ok(FHEOps::ge(a, b))
    }

    fn eq(&self, a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEBool> {
        self.install();
        Ok(FHEOps::eq(a, b))
    }

    fn select(&self, cond: &FHEBool, if_true: &FHEUint64, if_false: &FHEUint64) -> FHEResult<FHEUint64> {
        self.install();
        Ok(FHEOps::select(cond, if_true, if_false))
    }

    fn min(&self, a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEUint64> {
        self.install();
        Ok(FHEOps::min(a, b))
    }

    fn serialize_uint(value: &FHEUint64) -> FHEResult<Vec<u8>> {
        value.to_bytes()
    }

    fn deserialize_uint(bytes: &[u8]) -> FHEResult<FHEUint64> {
        FHEUint64::from_bytes(bytes)
    }

    fn serialize_bool(value: &FHEBool) -> FHEResult<Vec<u8>> {
        value.to_bytes()
    }

    fn deserialize_bool(bytes: &[u8]) -> FHEResult<FHEBool> {
        FHEBool::from_bytes(bytes)
    }
}

/// Key holder for the TFHE backend
#[derive(Clone, Debug)]
pub struct TfheClient {
    keys: KeyPair,
}

impl TfheClient {
    /// Generate fresh keys
    pub fn generate(config: &FHEConfig) -> FHEResult<Self> {
        let keys = KeyPair::generate(config)?;
        tracing::info!(security_bits = config.security_bits, "generated TFHE key pair");
        Ok(Self { keys })
    }

    /// Rebuild from a stored client key, deriving the server key
    pub fn from_client_key(client: ClientKey) -> FHEResult<Self> {
        let server = client.derive_server_key()?;
        Ok(Self {
            keys: KeyPair { client, server },
        })
    }

    pub fn client_key(&self) -> &ClientKey {
        &self.keys.client
    }
}

impl FheClient for TfheClient {
    type Backend = TfheBackend;

    fn backend(&self) -> FHEResult<TfheBackend> {
        Ok(TfheBackend::new(self.keys.server.clone()))
    }

    fn encrypt_u64(&self, value: u64) -> FHEResult<FHEUint64> {
        FHEUint64::encrypt(value, &self.keys.client)
    }

    fn decrypt_u64(&self, value: &FHEUint64) -> FHEResult<u64> {
        value.decrypt(&self.keys.client)
    }

    fn decrypt_bool(&self, value: &FHEBool) -> FHEResult<bool> {
        Ok(value.decrypt(&self.keys.client))
    }
}
