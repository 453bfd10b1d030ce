//! Node errors

use novalend_defi::{DeFiError, ErrorKind, UnitsError};
use novalend_fhe::FHEError;
use thiserror::Error;

/// Node result type
pub type NodeResult<T> = Result<T, NodeError>;

/// Node errors
#[derive(Error, Debug)]
pub enum NodeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transaction reverted; all of its effects were rolled back
    #[error("{method} reverted: {source}")]
    Reverted {
        method: &'static str,
        #[source]
        source: DeFiError,
    },

    /// FHE layer error outside a transaction (decryption, key setup)
    #[error("FHE error: {0}")]
    Fhe(#[from] FHEError),

    /// Malformed decimal amount
    #[error("Invalid amount: {0}")]
    Units(#[from] UnitsError),

    /// Amount rejected before submission
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// The block number or timestamp cannot advance any further
    #[error("Chain clock overflow at block {number}, timestamp {timestamp}")]
    ClockOverflow { number: u64, timestamp: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl NodeError {
    /// Protocol error class of a reverted transaction
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            NodeError::Reverted { source, .. } => Some(source.kind()),
            NodeError::ZeroAmount | NodeError::Units(_) => Some(ErrorKind::InvalidInput),
            NodeError::Fhe(e) if e.is_input_error() => Some(ErrorKind::InvalidInput),
            NodeError::Fhe(_) => Some(ErrorKind::Fhe),
            _ => None,
        }
    }
}
