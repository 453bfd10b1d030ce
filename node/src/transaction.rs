//! Transaction receipts

use novalend_fhe::Address;
use serde::{Deserialize, Serialize};

/// Receipt of a committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Block the transaction was mined in
    pub block_number: u64,
    /// Block timestamp (unix seconds)
    pub timestamp: u64,
    /// Transaction sender
    pub from: Address,
    /// Called contract
    pub to: Address,
    /// Called method
    pub method: String,
    /// Native value attached, in wei
    pub value: u128,
}
