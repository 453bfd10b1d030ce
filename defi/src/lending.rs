//! Confidential collateralized lending
//!
//! Implements an over-collateralized ETH -> cUSDT credit line where:
//! - Collateral is tracked encrypted in micro-ETH (stake amounts are public)
//! - Debt is encrypted in micro-USDT
//! - The borrow limit is enforced on encrypted operands by clamping, so a
//!   request above the limit silently borrows the limit instead of failing
//! - Repayment pulls cUSDT through a time-bounded operator grant and burns it
//!
//! Solvency: `debt <= collateral * price * max_ltv_bps / 10_000` after every
//! committed operation.

use std::collections::BTreeMap;

use novalend_fhe::{Address, Euint64, FHEResult, FheBackend, FheScope, Handle, InputProof};
use serde::{Deserialize, Serialize};

use crate::clamp::clamp;
use crate::env::{Env, Msg};
use crate::errors::{DeFiError, DeFiResult};
use crate::token::ConfidentialToken;
use crate::units::wei_to_micro;

/// Basis-point denominator
pub const BPS: u64 = 10_000;

/// Configuration for the lending market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingConfig {
    /// Fixed collateral price in micro-USDT per micro-ETH (e.g., 2000 = 2000 USDT/ETH)
    pub price: u64,
    /// Loan-to-Value ratio in basis points (e.g., 5000 = 50%)
    pub max_ltv_bps: u64,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            price: 2000,
            max_ltv_bps: 5000, // 50% LTV
        }
    }
}

impl LendingConfig {
    /// Builder: set collateral price
    pub fn with_price(mut self, price: u64) -> Self {
        self.price = price;
        self
    }

    /// Builder: set LTV ratio
    pub fn with_max_ltv(mut self, max_ltv_bps: u64) -> Self {
        self.max_ltv_bps = max_ltv_bps;
        self
    }

    pub fn validate(&self) -> DeFiResult<()> {
        if self.price == 0 {
            return Err(DeFiError::InvalidParameter("price must be positive".into()));
        }
        if self.max_ltv_bps == 0 || self.max_ltv_bps > BPS {
            return Err(DeFiError::InvalidParameter(format!(
                "max_ltv_bps must be in 1..={BPS}, got {}",
                self.max_ltv_bps
            )));
        }
        if self.price.checked_mul(self.max_ltv_bps).is_none() {
            return Err(DeFiError::InvalidParameter("price * max_ltv_bps overflows u64".into()));
        }
        Ok(())
    }

    /// Encrypted max-borrow as `collateral * multiplier / divisor`
    ///
    /// When `price * max_ltv_bps` is a multiple of [`BPS`] the divisor is 1
    /// and no encrypted division is needed.
    pub fn borrow_factor(&self) -> (u64, u64) {
        let numerator = self.price.saturating_mul(self.max_ltv_bps);
        if numerator % BPS == 0 {
            (numerator / BPS, 1)
        } else {
            (numerator, BPS)
        }
    }

    /// Largest collateral (micro-ETH) whose max-borrow product fits in u64
    pub fn collateral_capacity(&self) -> u64 {
        let (multiplier, _) = self.borrow_factor();
        u64::MAX / multiplier.max(1)
    }

    /// Plaintext max-borrow, for display and checks
    pub fn max_borrow_plain(&self, collateral: u64) -> u64 {
        let value = collateral as u128 * self.price as u128 * self.max_ltv_bps as u128 / BPS as u128;
        u64::try_from(value).unwrap_or(u64::MAX)
    }
}

/// Encrypted lending position of one account
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Collateral in micro-ETH
    pub collateral: Euint64,
    /// Debt in micro-USDT
    pub debt: Euint64,
    /// Public total of native value staked, paid out on withdraw
    pub staked_wei: u128,
}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Position")
            .field("collateral", &"<encrypted>")
            .field("debt", &"<encrypted>")
            .field("staked_wei", &self.staked_wei)
            .finish()
    }
}

/// Lending engine state
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingEngine {
    address: Address,
    token: Address,
    config: LendingConfig,
    positions: BTreeMap<Address, Position>,
}

impl LendingEngine {
    pub fn new(address: Address, token: Address, config: LendingConfig) -> DeFiResult<Self> {
        config.validate()?;
        Ok(Self {
            address,
            token,
            config,
            positions: BTreeMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    pub fn position(&self, account: &Address) -> Position {
        self.positions.get(account).copied().unwrap_or_default()
    }

    pub fn encrypted_collateral_of(&self, account: &Address) -> Euint64 {
        self.position(account).collateral
    }

    pub fn encrypted_debt_of(&self, account: &Address) -> Euint64 {
        self.position(account).debt
    }

    pub fn staked_wei_of(&self, account: &Address) -> u128 {
        self.position(account).staked_wei
    }

    /// Native value currently held for all accounts
    pub fn total_staked_wei(&self) -> u128 {
        self.positions.values().map(|p| p.staked_wei).sum()
    }

    fn check_token(&self, token: &ConfidentialToken) -> DeFiResult<()> {
        if token.address() != self.token {
            return Err(DeFiError::InvalidParameter(format!(
                "engine is wired to token {}, got {}",
                self.token,
                token.address()
            )));
        }
        Ok(())
    }

    fn max_borrow<B: FheBackend>(&self, scope: &mut FheScope<'_, B>, collateral: Euint64) -> FHEResult<Euint64> {
        let (multiplier, divisor) = self.config.borrow_factor();
        let scaled = scope.mul_scalar(collateral, multiplier)?;
        if divisor == 1 {
            Ok(scaled)
        } else {
            scope.div_scalar(scaled, divisor)
        }
    }

    /// Stake the attached native value as collateral
    ///
    /// Collateral grows by `msg.value / 10^12` micro-ETH; sub-micro dust is
    /// kept in `staked_wei` and returned on withdraw.
    pub fn stake<B: FheBackend>(&mut self, env: &mut Env<'_, B>, msg: &Msg) -> DeFiResult<Euint64> {
        let micro = wei_to_micro(msg.value);
        if micro == 0 {
            return Err(DeFiError::ZeroAmount);
        }

        let mut position = self.position(&msg.sender);
        let staked_wei = position.staked_wei.saturating_add(msg.value);
        let capacity = self.config.collateral_capacity();
        if wei_to_micro(staked_wei) > capacity as u128 {
            return Err(DeFiError::CollateralCapacityExceeded { capacity });
        }

        env.bank.transfer(msg.sender, self.address, msg.value)?;

        let mut scope = env.fhe.scope(self.address);
        // micro <= capacity here, so the cast is lossless
        let collateral = scope.add_scalar(position.collateral, micro as u64)?;
        scope.allow(collateral, msg.sender)?;

        position.collateral = collateral;
        position.staked_wei = staked_wei;
        self.positions.insert(msg.sender, position);

        tracing::info!(
            account = %msg.sender.short(),
            wei = %msg.value,
            "stake"
        );
        Ok(collateral)
    }

    /// Borrow up to the LTV limit; returns the amount actually minted
    pub fn borrow<B: FheBackend>(
        &mut self,
        token: &mut ConfidentialToken,
        env: &mut Env<'_, B>,
        msg: &Msg,
        handle: Handle,
        proof: &InputProof,
    ) -> DeFiResult<Euint64> {
        self.check_token(token)?;
        let requested = env.fhe.verify_input(handle, proof, self.address, msg.sender)?;
        let mut position = self.position(&msg.sender);

        let mut scope = env.fhe.scope(self.address);
        let limit = self.max_borrow(&mut scope, position.collateral)?;
        let available = scope.saturating_sub(limit, position.debt)?;
        let amount = clamp(&mut scope, requested, available)?;
        scope.allow(amount, self.token)?;
        tracing::debug!(account = %msg.sender.short(), "borrow amount clamped to available credit");

        // Debt follows what the token actually minted
        let minted = token.mint(env, &Msg::new(self.address), msg.sender, amount)?;

        let mut scope = env.fhe.scope(self.address);
        let debt = scope.add(position.debt, minted)?;
        scope.allow(debt, msg.sender)?;

        position.debt = debt;
        self.positions.insert(msg.sender, position);
        tracing::info!(account = %msg.sender.short(), "borrow");
        Ok(minted)
    }

    /// Repay debt with cUSDT pulled from the caller
    ///
    /// The input must be bound to (token, engine); the engine needs an active
    /// operator grant from the caller. Returns the amount burned.
    pub fn repay<B: FheBackend>(
        &mut self,
        token: &mut ConfidentialToken,
        env: &mut Env<'_, B>,
        msg: &Msg,
        handle: Handle,
        proof: &InputProof,
    ) -> DeFiResult<Euint64> {
        self.check_token(token)?;
        let as_engine = Msg::new(self.address);
        let requested = token.import_input(env, &as_engine, handle, proof)?;
        let mut position = self.position(&msg.sender);

        let request = {
            let mut scope = env.fhe.scope(self.address);
            let request = clamp(&mut scope, requested, position.debt)?;
            scope.allow(request, self.token)?;
            request
        };

        let pulled = token.confidential_transfer_from(env, &as_engine, msg.sender, self.address, request)?;

        let (repaid, debt) = {
            let mut scope = env.fhe.scope(self.address);
            let repaid = clamp(&mut scope, pulled, position.debt)?;
            let debt = scope.saturating_sub(position.debt, repaid)?;
            scope.allow(debt, msg.sender)?;
            scope.allow(repaid, msg.sender)?;
            scope.allow(repaid, self.token)?;
            (repaid, debt)
        };
        tracing::debug!(account = %msg.sender.short(), "repayment clamped to outstanding debt");

        token.burn(env, &as_engine, self.address, repaid)?;

        position.debt = debt;
        self.positions.insert(msg.sender, position);
        tracing::info!(account = %msg.sender.short(), "repay");
        Ok(repaid)
    }

    /// Return all staked native value and zero the collateral
    ///
    /// Debt is not consulted: an account with outstanding debt can withdraw
    /// and keep the borrowed cUSDT.
    pub fn withdraw_all<B: FheBackend>(&mut self, env: &mut Env<'_, B>, msg: &Msg) -> DeFiResult<u128> {
        let mut position = self.position(&msg.sender);
        let amount = position.staked_wei;
        if amount == 0 {
            return Err(DeFiError::NothingToWithdraw);
        }

        env.bank.transfer(self.address, msg.sender, amount)?;

        let mut scope = env.fhe.scope(self.address);
        let collateral = scope.as_trivial(0)?;
        scope.allow(collateral, msg.sender)?;

        position.collateral = collateral;
        position.staked_wei = 0;
        self.positions.insert(msg.sender, position);

        tracing::info!(account = %msg.sender.short(), wei = %amount, "withdraw all");
        Ok(amount)
    }
}

impl std::fmt::Debug for LendingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LendingEngine")
            .field("address", &self.address)
            .field("token", &self.token)
            .field("config", &self.config)
            .field("accounts", &self.positions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::testing::{Harness, ETH};

    #[test]
    fn test_lending_config_default() {
        let config = LendingConfig::default();
        assert_eq!(config.price, 2000);
        assert_eq!(config.max_ltv_bps, 5000);
        assert_eq!(config.borrow_factor(), (1000, 1));
        assert_eq!(config.max_borrow_plain(1_000_000), 1_000_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_with_division() {
        let config = LendingConfig::default().with_price(3).with_max_ltv(7000);
        assert_eq!(config.borrow_factor(), (21_000, BPS));
        assert_eq!(config.max_borrow_plain(10), 21);
        assert!(LendingConfig::default().with_max_ltv(10_001).validate().is_err());
        assert!(LendingConfig::default().with_price(0).validate().is_err());
    }

    #[test]
    fn test_stake() {
        let mut h = Harness::new();
        let alice = h.alice;
        h.stake(alice, ETH).unwrap();

        assert_eq!(h.collateral(alice), 1_000_000);
        assert_eq!(h.engine.staked_wei_of(&alice), ETH);
        assert_eq!(h.bank.balance_of(&h.engine_address), ETH);
    }

    #[test]
    fn test_stake_below_one_micro_rejected() {
        let mut h = Harness::new();
        let alice = h.alice;
        let err = h.stake(alice, 999_999_999_999).unwrap_err();
        assert_eq!(err, DeFiError::ZeroAmount);
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_stake_beyond_capacity_rejected() {
        let mut h = Harness::new();
        let alice = h.alice;
        let capacity = h.engine.config().collateral_capacity();
        h.bank.fund(alice, u128::MAX / 2);

        let too_much = (capacity as u128 + 1) * crate::units::WEI_PER_MICRO;
        let err = h.stake(alice, too_much).unwrap_err();
        assert_eq!(err, DeFiError::CollateralCapacityExceeded { capacity });
    }

    #[test]
    fn test_borrow_within_limit() {
        let mut h = Harness::new();
        let alice = h.alice;
        h.stake(alice, ETH).unwrap();

        let minted = h.borrow(alice, 500_000_000).unwrap();
        assert_eq!(h.decrypt(minted.handle(), h.engine_address, alice), 500_000_000);
        assert_eq!(h.debt(alice), 500_000_000);
        assert_eq!(h.token_balance(alice), 500_000_000);
    }

    #[test]
    fn test_borrow_clamped_to_limit() {
        let mut h = Harness::new();
        let alice = h.alice;
        h.stake(alice, ETH).unwrap();

        h.borrow(alice, 900_000_000).unwrap();
        h.borrow(alice, 200_000_000).unwrap();
        assert_eq!(h.debt(alice), 1_000_000_000);
        assert_eq!(h.token_balance(alice), 1_000_000_000);
    }

    #[test]
    fn test_borrow_without_collateral_mints_nothing() {
        let mut h = Harness::new();
        let bob = h.bob;
        h.borrow(bob, 1_000).unwrap();
        assert_eq!(h.debt(bob), 0);
        assert_eq!(h.token_balance(bob), 0);
    }

    #[test]
    fn test_borrow_rejects_foreign_proof() {
        let mut h = Harness::new();
        let (alice, bob) = (h.alice, h.bob);
        h.stake(alice, ETH).unwrap();

        let (handle, proof) = h.input(h.engine_address, bob, 10);
        let mut env = Env::new(&mut h.fhe, &mut h.bank, h.block);
        let err = h
            .engine
            .borrow(&mut h.token, &mut env, &Msg::new(alice), handle, &proof)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_repay_requires_operator() {
        let mut h = Harness::new();
        let alice = h.alice;
        h.stake(alice, ETH).unwrap();
        h.borrow(alice, 100_000_000).unwrap();

        let err = h.repay(alice, 40_000_000).unwrap_err();
        assert_eq!(
            err,
            DeFiError::NotOperator {
                holder: alice,
                spender: h.engine_address
            }
        );
    }

    #[test]
    fn test_repay_partial_and_overpay() {
        let mut h = Harness::new();
        let alice = h.alice;
        h.stake(alice, ETH).unwrap();
        h.borrow(alice, 100_000_000).unwrap();
        h.approve_engine(alice, 3600);

        h.repay(alice, 40_000_000).unwrap();
        assert_eq!(h.debt(alice), 60_000_000);
        assert_eq!(h.token_balance(alice), 60_000_000);

        let repaid = h.repay(alice, 500_000_000).unwrap();
        assert_eq!(h.decrypt(repaid.handle(), h.engine_address, alice), 60_000_000);
        assert_eq!(h.debt(alice), 0);
        assert_eq!(h.token_balance(alice), 0);
        assert_eq!(h.total_supply(), 0);
    }

    #[test]
    fn test_repay_limited_by_balance() {
        let mut h = Harness::new();
        let (alice, bob) = (h.alice, h.bob);
        h.stake(alice, ETH).unwrap();
        h.borrow(alice, 100_000_000).unwrap();
        h.approve_engine(alice, 3600);

        // alice gives 70 away, so only 30 can be pulled
        let (handle, proof) = h.input(h.token_address, alice, 70_000_000);
        let mut env = Env::new(&mut h.fhe, &mut h.bank, h.block);
        h.token
            .confidential_transfer_input(&mut env, &Msg::new(alice), bob, handle, &proof)
            .unwrap();

        h.repay(alice, 100_000_000).unwrap();
        assert_eq!(h.debt(alice), 70_000_000);
        assert_eq!(h.token_balance(alice), 0);
        assert_eq!(h.total_supply(), 70_000_000);
    }

    #[test]
    fn test_withdraw_all() {
        let mut h = Harness::new();
        let alice = h.alice;
        let before = h.bank.balance_of(&alice);
        h.stake(alice, ETH + 5).unwrap();

        let mut env = Env::new(&mut h.fhe, &mut h.bank, h.block);
        let paid = h.engine.withdraw_all(&mut env, &Msg::new(alice)).unwrap();

        assert_eq!(paid, ETH + 5);
        assert_eq!(h.bank.balance_of(&alice), before);
        assert_eq!(h.collateral(alice), 0);
        assert_eq!(h.engine.staked_wei_of(&alice), 0);
    }

    #[test]
    fn test_withdraw_nothing() {
        let mut h = Harness::new();
        let alice = h.alice;
        let mut env = Env::new(&mut h.fhe, &mut h.bank, h.block);
        let err = h.engine.withdraw_all(&mut env, &Msg::new(alice)).unwrap_err();
        assert_eq!(err, DeFiError::NothingToWithdraw);
    }

    #[test]
    fn test_withdraw_to_rejecting_account() {
        let mut h = Harness::new();
        let alice = h.alice;
        h.stake(alice, ETH).unwrap();
        h.bank.set_rejects(alice, true);

        let mut env = Env::new(&mut h.fhe, &mut h.bank, h.block);
        let err = h.engine.withdraw_all(&mut env, &Msg::new(alice)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EnvironmentFailure);
        assert_eq!(h.engine.staked_wei_of(&alice), ETH);
    }
}
