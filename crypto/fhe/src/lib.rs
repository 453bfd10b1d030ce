//! NovaLend FHE layer
//!
//! Encrypted 64-bit integers referenced by opaque handles, in the style of
//! an fhEVM coprocessor. Contracts never hold ciphertexts directly: they
//! hold [`Euint64`]/[`Ebool`] handles and ask the [`FheExecutor`] to
//! evaluate operations on them.
//!
//! # Key Features:
//! - Backend-agnostic algebra ([`FheBackend`]) with a TFHE-rs implementation
//!   and a plaintext-carrying mock
//! - Handle store with an access-control list per handle
//! - Client inputs bound to a (contract, user) context by an attestation
//!
//! # Architecture:
//! - ClientKey: For encryption/decryption (held by the network's decryptor)
//! - ServerKey: For homomorphic operations (held by the executor)

pub mod backend;
pub mod errors;
pub mod executor;
pub mod input;
pub mod mock;
pub mod types;
mod real_impl;

pub use backend::{FheBackend, FheClient};
pub use errors::FHEError;
pub use executor::{ExecutorCheckpoint, ExecutorState, FheExecutor, FheScope};
pub use input::{EncryptedInput, InputAttestor, InputBuilder, InputProof};
pub use mock::{MockBackend, MockClient};
pub use real_impl::*;
pub use types::{Address, Ebool, Euint64, Handle};

/// FHE Configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FHEConfig {
    /// Security parameter (bits)
    pub security_bits: u32,
}

impl FHEConfig {
    /// Small parameters, fast enough for unit tests
    pub fn testing() -> Self {
        Self { security_bits: 64 }
    }
}

impl Default for FHEConfig {
    fn default() -> Self {
        Self { security_bits: 128 }
    }
}

/// Result type for FHE operations
pub type FHEResult<T> = Result<T, FHEError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = FHEConfig::default();
        assert_eq!(config.security_bits, 128);
        assert!(FHEConfig::testing().security_bits < config.security_bits);
    }
}
