//! FHE Key Management with Real TFHE-rs
//!
//! - ClientKey: encrypts client inputs and decrypts ACL-authorized results
//! - ServerKey: evaluates homomorphic operations (shared with validators)

use tfhe::{generate_keys, ConfigBuilder};
use tfhe::{ClientKey as TfheClientKey, ServerKey as TfheServerKey};

use crate::{FHEConfig, FHEError, FHEResult};

/// Install the server key for homomorphic operations on the current thread
///
/// TFHE-rs keeps the evaluation key in a thread-local, so every thread that
/// evaluates must install it first.
pub fn set_server_key(key: &ServerKey) {
    tfhe::set_server_key(key.inner.clone());
}

fn tfhe_config(config: &FHEConfig) -> tfhe::Config {
    if config.security_bits >= 128 {
        ConfigBuilder::default().build()
    } else {
        // Lower security for testing
        ConfigBuilder::default_with_small_encryption().build()
    }
}

fn config_hash(config: &FHEConfig) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&config.security_bits.to_le_bytes());
    *hasher.finalize().as_bytes()
}

/// Client key for encryption and decryption
#[derive(Clone)]
pub struct ClientKey {
    pub(crate) inner: TfheClientKey,
    /// Configuration hash for versioning
    config_hash: [u8; 32],
}

impl ClientKey {
    /// Generate a new client key
    pub fn generate(config: &FHEConfig) -> FHEResult<Self> {
        let (client_key, _server_key) = generate_keys(tfhe_config(config));
        Ok(Self {
            inner: client_key,
            config_hash: config_hash(config),
        })
    }

    /// Derive server key from client key
    pub fn derive_server_key(&self) -> FHEResult<ServerKey> {
        Ok(ServerKey {
            inner: TfheServerKey::new(&self.inner),
            config_hash: self.config_hash,
        })
    }

    pub fn inner(&self) -> &TfheClientKey {
        &self.inner
    }

    pub fn to_bytes(&self) -> FHEResult<Vec<u8>> {
        bincode::serialize(&self.inner).map_err(|e| FHEError::SerializationError(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8], config: &FHEConfig) -> FHEResult<Self> {
        let inner: TfheClientKey =
            bincode::deserialize(bytes).map_err(|e| FHEError::SerializationError(e.to_string()))?;
        Ok(Self {
            inner,
            config_hash: config_hash(config),
        })
    }
}

impl std::fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientKey")
            .field("config_hash", &hex::encode(&self.config_hash[..8]))
            .finish()
    }
}

/// Server key for homomorphic operations
#[derive(Clone)]
pub struct ServerKey {
    pub(crate) inner: TfheServerKey,
    config_hash: [u8; 32],
}

impl ServerKey {
    /// Install as the evaluation key of the current thread
    pub fn set_global(&self) {
        set_server_key(self);
    }
}

impl std::fmt::Debug for ServerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerKey")
            .field("config_hash", &hex::encode(&self.config_hash[..8]))
            .finish()
    }
}

/// Client and server key generated together
#[derive(Clone)]
pub struct KeyPair {
    pub client: ClientKey,
    pub server: ServerKey,
}

impl KeyPair {
    /// Generate a new key pair
    ///
    /// WARNING: Key generation is slow (seconds even on small parameters)
    pub fn generate(config: &FHEConfig) -> FHEResult<Self> {
        let (client_key, server_key) = generate_keys(tfhe_config(config));
        let hash = config_hash(config);
        Ok(Self {
            client: ClientKey {
                inner: client_key,
                config_hash: hash,
            },
            server: ServerKey {
                inner: server_key,
                config_hash: hash,
            },
        })
    }

    /// Set the server key for operations on this thread
    pub fn set_server_key(&self) {
        self.server.set_global();
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("client", &self.client)
            .field("server", &self.server)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::real_impl::{FHEOps, FHEUint64};

    #[test]
    fn test_derived_server_key_evaluates() {
        let config = FHEConfig::testing();
        let keypair = KeyPair::generate(&config).unwrap();

        let bytes = keypair.client.to_bytes().unwrap();
        let client = ClientKey::from_bytes(&bytes, &config).unwrap();
        client.derive_server_key().unwrap().set_global();

        let a = FHEUint64::encrypt(40, &keypair.client).unwrap();
        let b = FHEUint64::encrypt(2, &client).unwrap();
        let sum = FHEOps::add(&a, &b);
        assert_eq!(sum.decrypt(&client).unwrap(), 42);
    }
}
