//! DeFi Error Types

use novalend_fhe::{Address, FHEError};
use thiserror::Error;

/// Coarse error classes every protocol failure falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks a role or an operator grant
    Unauthorized,
    /// Rejected input: zero amount, bad proof, out-of-range parameter
    InvalidInput,
    /// The environment refused an effect (native value transfer)
    EnvironmentFailure,
    /// Failure inside the encrypted-integer layer
    Fhe,
}

/// Errors that can occur in lending and token operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeFiError {
    // Authorization errors
    #[error("Unauthorized: {caller} is not the {role}")]
    Unauthorized { caller: Address, role: &'static str },

    #[error("{spender} is not an operator of {holder}")]
    NotOperator { holder: Address, spender: Address },

    // Input errors
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Collateral would exceed the encrypted-arithmetic capacity of {capacity} micro-ETH")]
    CollateralCapacityExceeded { capacity: u64 },

    #[error("Nothing to withdraw")]
    NothingToWithdraw,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // Native value errors
    #[error("Insufficient native balance: required {required} wei, available {available} wei")]
    InsufficientNativeBalance { required: u128, available: u128 },

    #[error("Native transfer to {0} failed")]
    NativeTransferFailed(Address),

    // FHE errors
    #[error(transparent)]
    Fhe(#[from] FHEError),
}

impl DeFiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeFiError::Unauthorized { .. } | DeFiError::NotOperator { .. } => ErrorKind::Unauthorized,
            DeFiError::ZeroAmount
            | DeFiError::CollateralCapacityExceeded { .. }
            | DeFiError::NothingToWithdraw
            | DeFiError::InvalidAmount(_)
            | DeFiError::InvalidParameter(_)
            | DeFiError::InsufficientNativeBalance { .. } => ErrorKind::InvalidInput,
            DeFiError::NativeTransferFailed(_) => ErrorKind::EnvironmentFailure,
            DeFiError::Fhe(e) if e.is_input_error() => ErrorKind::InvalidInput,
            DeFiError::Fhe(_) => ErrorKind::Fhe,
        }
    }
}

/// Result type for DeFi operations
pub type DeFiResult<T> = Result<T, DeFiError>;
