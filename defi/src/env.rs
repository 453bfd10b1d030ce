//! Execution environment handed to contract calls

use std::collections::{BTreeMap, BTreeSet};

use novalend_fhe::{Address, FheBackend, FheExecutor};
use serde::{Deserialize, Serialize};

use crate::errors::{DeFiError, DeFiResult};

/// Block the current call executes in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    /// Unix seconds
    pub timestamp: u64,
}

/// Caller and attached native value of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Msg {
    pub sender: Address,
    /// Attached value in wei
    pub value: u128,
}

impl Msg {
    pub fn new(sender: Address) -> Self {
        Self { sender, value: 0 }
    }

    pub fn with_value(sender: Address, value: u128) -> Self {
        Self { sender, value }
    }
}

/// Everything a contract can touch besides its own storage
pub struct Env<'a, B: FheBackend> {
    pub fhe: &'a mut FheExecutor<B>,
    pub bank: &'a mut NativeBank,
    pub block: BlockInfo,
}

impl<'a, B: FheBackend> Env<'a, B> {
    pub fn new(fhe: &'a mut FheExecutor<B>, bank: &'a mut NativeBank, block: BlockInfo) -> Self {
        Self { fhe, bank, block }
    }
}

/// Plaintext native-asset (wei) ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBank {
    balances: BTreeMap<Address, u128>,
    /// Accounts that refuse incoming value
    rejecting: BTreeSet<Address>,
}

impl NativeBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Credit an account out of thin air (genesis and faucet)
    pub fn fund(&mut self, account: Address, amount: u128) {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Make `account` refuse (or accept again) incoming transfers
    pub fn set_rejects(&mut self, account: Address, rejects: bool) {
        if rejects {
            self.rejecting.insert(account);
        } else {
            self.rejecting.remove(&account);
        }
    }

    pub fn rejects(&self, account: &Address) -> bool {
        self.rejecting.contains(account)
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> DeFiResult<()> {
        if self.rejects(&to) {
            return Err(DeFiError::NativeTransferFailed(to));
        }
        let available = self.balance_of(&from);
        if available < amount {
            return Err(DeFiError::InsufficientNativeBalance {
                required: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        self.balances.insert(from, available - amount);
        self.fund(to, amount);
        Ok(())
    }

    /// Sum of all balances
    pub fn total(&self) -> u128 {
        self.balances.values().fold(0u128, |acc, b| acc.saturating_add(*b))
    }
}
