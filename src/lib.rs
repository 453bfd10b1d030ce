//! NovaLend: Confidential Collateralized Lending
//!
//! Root crate re-exporting the NovaLend components for integration testing
//! and embedding.
//!
//! ## Architecture Overview
//!
//! Users stake ETH as collateral and borrow a confidential USDT token
//! (cUSDT) against it. Collateral, debt and token balances are encrypted
//! 64-bit integers; the protocol enforces its limits with encrypted
//! comparisons and selects instead of reverting, so observers learn
//! nothing about amounts.
//!
//! ## Crate Organization
//!
//! - `novalend-fhe`: Encrypted-integer handles, ACL and input proofs
//! - `novalend-defi`: Confidential token and lending engine
//! - `novalend-node`: Local chain with atomic transactions and snapshots

pub use novalend_defi as defi;
pub use novalend_fhe as fhe;
pub use novalend_node as node;

/// NovaLend protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol defaults
pub mod config {
    /// Default ETH price in USDT
    pub const DEFAULT_PRICE: u64 = 2000;

    /// Default maximum loan-to-value in basis points
    pub const DEFAULT_MAX_LTV_BPS: u64 = 5000;

    /// Decimals of the confidential USDT token and of encrypted collateral
    pub const TOKEN_DECIMALS: u8 = 6;
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use novalend_defi::prelude::*;
    pub use novalend_fhe::{Address, EncryptedInput, Euint64, FheClient, Handle, MockClient, TfheClient};
    pub use novalend_node::{
        ChainConfig, DecryptedPosition, LendingClient, LocalChain, NodeError, DEFAULT_APPROVAL_DAYS,
    };
}
