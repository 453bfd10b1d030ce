//! FHE Error types

use thiserror::Error;

use crate::types::{Address, Handle};

/// Errors that can occur during FHE operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FHEError {
    /// Key generation failed
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid ciphertext
    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// Homomorphic operation failed
    #[error("Homomorphic operation failed: {0}")]
    OperationFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Handle does not reference a stored ciphertext
    #[error("Unknown handle: {0}")]
    UnknownHandle(Handle),

    /// Account is not on the ACL of a handle
    #[error("Access denied: {account} is not allowed on handle {handle}")]
    AccessDenied { handle: Handle, account: Address },

    /// Input proof attestation did not verify
    #[error("Invalid input proof: {0}")]
    InvalidProof(String),

    /// Input proof was produced for another (contract, user) pair
    #[error(
        "Input proof bound to contract {proof_contract} / user {proof_user}, \
         called from contract {contract} / sender {sender}"
    )]
    ProofContextMismatch {
        proof_contract: Address,
        proof_user: Address,
        contract: Address,
        sender: Address,
    },

    /// Malformed address string
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl FHEError {
    /// Whether the error was caused by a malformed or misbound client input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            FHEError::InvalidProof(_)
                | FHEError::ProofContextMismatch { .. }
                | FHEError::InvalidCiphertext(_)
        )
    }
}
