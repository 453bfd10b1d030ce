//! Per-account task layer over a local chain
//!
//! Mirrors what a user does from a wallet: amounts come in as decimal
//! strings, are validated and encrypted client side, and results are
//! decrypted through the ACL-checked decryption path.

use std::fmt;

use novalend_defi::units::{format_eth_micro, format_usdt, parse_eth, parse_usdt, wei_to_micro};
use novalend_fhe::{Address, Euint64, FheClient};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::LocalChain;
use crate::error::{NodeError, NodeResult};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Default operator grant for the engine, in days
pub const DEFAULT_APPROVAL_DAYS: u64 = 30;

/// Decrypted view of an account's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedPosition {
    /// Collateral in micro-ETH
    pub collateral: u64,
    /// Debt in micro-USDT
    pub debt: u64,
    /// cUSDT balance in micro-USDT
    pub balance: u64,
    /// Borrow ceiling for the current collateral
    pub max_borrow: u64,
    /// `max_borrow - debt`, floored at zero
    pub available: u64,
}

impl fmt::Display for DecryptedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collateral:  {} ETH", format_eth_micro(self.collateral))?;
        writeln!(f, "Debt:        {} USDT", format_usdt(self.debt))?;
        writeln!(f, "Balance:     {} cUSDT", format_usdt(self.balance))?;
        writeln!(f, "Max borrow:  {} USDT", format_usdt(self.max_borrow))?;
        write!(f, "Available:   {} USDT", format_usdt(self.available))
    }
}

/// Lending operations on behalf of one account
pub struct LendingClient<'a, C: FheClient> {
    chain: &'a mut LocalChain<C>,
    account: Address,
}

impl<C: FheClient> LocalChain<C> {
    /// Act as `account`
    pub fn as_user(&mut self, account: Address) -> LendingClient<'_, C> {
        LendingClient { chain: self, account }
    }
}

impl<'a, C: FheClient> LendingClient<'a, C> {
    pub fn account(&self) -> Address {
        self.account
    }

    /// Stake a decimal ETH amount, e.g. `"1.0"`
    pub fn stake_eth(&mut self, eth: &str) -> NodeResult<Euint64> {
        let wei = parse_eth(eth)?;
        if wei_to_micro(wei) == 0 {
            return Err(NodeError::ZeroAmount);
        }
        self.chain.stake(self.account, wei)
    }

    /// Borrow a decimal USDT amount; the engine clamps it to available credit
    pub fn borrow_usdt(&mut self, usdt: &str) -> NodeResult<Euint64> {
        let micro = Self::parse_nonzero_usdt(usdt)?;
        let input = self
            .chain
            .create_encrypted_input(self.chain.engine_address(), self.account)
            .add64(micro)
            .encrypt()?;
        self.chain.borrow(self.account, &input)
    }

    /// Let the engine pull cUSDT for `days` days from the latest block
    pub fn approve_operator(&mut self, days: u64) -> NodeResult<u64> {
        if days == 0 {
            return Err(NodeError::ZeroAmount);
        }
        let until = self
            .chain
            .block()
            .timestamp
            .saturating_add(days.saturating_mul(SECONDS_PER_DAY));
        let engine = self.chain.engine_address();
        self.chain.set_operator(self.account, engine, until)?;
        Ok(until)
    }

    /// Repay a decimal USDT amount; clamped to debt and balance
    pub fn repay_usdt(&mut self, usdt: &str) -> NodeResult<Euint64> {
        let micro = Self::parse_nonzero_usdt(usdt)?;
        let input = self
            .chain
            .create_encrypted_input(self.chain.token_address(), self.chain.engine_address())
            .add64(micro)
            .encrypt()?;
        self.chain.repay(self.account, &input)
    }

    /// Withdraw all staked ETH; returns wei paid out
    pub fn withdraw_all(&mut self) -> NodeResult<u128> {
        self.chain.withdraw_all(self.account)
    }

    /// Send cUSDT to another account
    pub fn transfer_usdt(&mut self, to: Address, usdt: &str) -> NodeResult<Euint64> {
        let micro = Self::parse_nonzero_usdt(usdt)?;
        let input = self
            .chain
            .create_encrypted_input(self.chain.token_address(), self.account)
            .add64(micro)
            .encrypt()?;
        self.chain.confidential_transfer(self.account, to, &input)
    }

    /// Decrypt a value the account is allowed on
    pub fn decrypt(&self, value: Euint64, contract: Address) -> NodeResult<u64> {
        self.chain.user_decrypt_u64(value.handle(), contract, self.account)
    }

    /// Decrypt collateral, debt and balance and derive borrowing headroom
    pub fn decrypt_position(&self) -> NodeResult<DecryptedPosition> {
        let engine = self.chain.engine_address();
        let token = self.chain.token_address();

        let collateral = self.decrypt(self.chain.encrypted_collateral_of(&self.account), engine)?;
        let debt = self.decrypt(self.chain.encrypted_debt_of(&self.account), engine)?;
        let balance = self.decrypt(self.chain.confidential_balance_of(&self.account), token)?;
        let max_borrow = self.chain.engine().config().max_borrow_plain(collateral);

        debug!(account = %self.account.short(), "decrypted position");
        Ok(DecryptedPosition {
            collateral,
            debt,
            balance,
            max_borrow,
            available: max_borrow.saturating_sub(debt),
        })
    }

    fn parse_nonzero_usdt(usdt: &str) -> NodeResult<u64> {
        let micro = parse_usdt(usdt)?;
        if micro == 0 {
            return Err(NodeError::ZeroAmount);
        }
        Ok(micro)
    }
}
