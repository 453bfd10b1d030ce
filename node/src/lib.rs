//! NovaLend Local Node
//!
//! Single-node ledger hosting the confidential token and the lending
//! engine, with client-side helpers for encrypting inputs and decrypting
//! positions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         LocalChain                                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐              │
//! │  │ Confidential │  │   Lending    │  │   Native     │              │
//! │  │    Token     │──│   Engine     │──│    Bank      │              │
//! │  └──────────────┘  └──────────────┘  └──────────────┘              │
//! │         │                 │                                         │
//! │  ┌──────▼─────────────────▼────────────────────────┐               │
//! │  │       FheExecutor (ciphertexts, ACL, proofs)     │               │
//! │  └──────────────────────────────────────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Transaction Pipeline
//!
//! 1. **Checkpoint**: Clone token, engine and native-bank state
//! 2. **Execute**: Run the call in the next block's environment
//! 3. **Commit or Revert**: Keep the new state and mine the block, or
//!    restore the checkpoint

mod chain;
mod client;
mod config;
mod error;
mod snapshot;
mod transaction;

pub use chain::LocalChain;
pub use client::{DecryptedPosition, LendingClient, DEFAULT_APPROVAL_DAYS};
pub use config::ChainConfig;
pub use error::{NodeError, NodeResult};
pub use snapshot::ChainSnapshot;
pub use transaction::TxReceipt;
