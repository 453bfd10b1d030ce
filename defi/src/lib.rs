//! NovaLend DeFi Primitives
//!
//! Confidential lending built on encrypted-integer handles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    NovaLend Protocol                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐   mint / transferFrom / burn          │
//! │  │  LendingEngine   │ ─────────────────────────┐            │
//! │  │  collateral,debt │                          ▼            │
//! │  └────────┬─────────┘              ┌──────────────────────┐ │
//! │           │                        │  ConfidentialToken   │ │
//! │           │                        │  balances, operators │ │
//! │           │                        └──────────┬───────────┘ │
//! │           └───────────────┬───────────────────┘             │
//! │                           ▼                                 │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │        FheExecutor (handles, ACL, input proofs)      │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Features
//!
//! - **Hidden positions**: collateral and debt are encrypted per account
//! - **Oblivious limits**: borrow and repay clamp with encrypted selects
//! - **Operator grants**: time-bounded allowances for pulling cUSDT

pub mod clamp;
pub mod env;
pub mod errors;
pub mod lending;
pub mod token;
pub mod units;

#[cfg(test)]
mod testing;

// Re-export main types
pub use env::{BlockInfo, Env, Msg, NativeBank};
pub use errors::{DeFiError, DeFiResult, ErrorKind};
pub use lending::{LendingConfig, LendingEngine, Position, BPS};
pub use token::{ConfidentialToken, TokenMetadata};
pub use units::{format_fixed, parse_fixed, UnitsError, WEI_PER_MICRO};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::env::{BlockInfo, Env, Msg, NativeBank};
    pub use crate::errors::{DeFiError, DeFiResult, ErrorKind};
    pub use crate::lending::{LendingConfig, LendingEngine, Position};
    pub use crate::token::{ConfidentialToken, TokenMetadata};
}
