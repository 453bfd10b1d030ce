//! Confidential fungible token (cUSDT)
//!
//! Balances and total supply are encrypted handles. Transfers never fail on
//! insufficient balance: the moved amount is clamped to the sender's balance
//! and the caller gets back a handle to what actually moved.
//!
//! Operators are time-bounded: `set_operator(operator, until)` lets
//! `operator` move the caller's tokens while `block.timestamp < until`.

use std::collections::BTreeMap;

use novalend_fhe::{Address, Euint64, FHEError, FheBackend, Handle, InputProof};
use serde::{Deserialize, Serialize};

use crate::clamp::{clamp, clamped_move};
use crate::env::{Env, Msg};
use crate::errors::{DeFiError, DeFiResult};

/// Public token metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Confidential USDT".to_string(),
            symbol: "cUSDT".to_string(),
            decimals: 6,
        }
    }
}

/// Confidential token ledger
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidentialToken {
    address: Address,
    metadata: TokenMetadata,
    owner: Address,
    /// Zero address until the owner assigns one
    minter: Address,
    balances: BTreeMap<Address, Euint64>,
    total_supply: Euint64,
    /// holder -> operator -> expiry (unix seconds)
    operators: BTreeMap<Address, BTreeMap<Address, u64>>,
}

impl ConfidentialToken {
    pub fn new(address: Address, owner: Address, metadata: TokenMetadata) -> Self {
        Self {
            address,
            metadata,
            owner,
            minter: Address::ZERO,
            balances: BTreeMap::new(),
            total_supply: Euint64::default(),
            operators: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    /// Assign the minting role (owner only)
    pub fn set_minter(&mut self, msg: &Msg, minter: Address) -> DeFiResult<()> {
        if msg.sender != self.owner {
            return Err(DeFiError::Unauthorized {
                caller: msg.sender,
                role: "owner",
            });
        }
        self.minter = minter;
        tracing::info!(token = %self.address.short(), minter = %minter.short(), "minter set");
        Ok(())
    }

    /// Authorize `operator` on the caller's balance until `until`
    ///
    /// Overwrites any previous grant; `until = 0` revokes.
    pub fn set_operator(&mut self, msg: &Msg, operator: Address, until: u64) {
        self.operators.entry(msg.sender).or_default().insert(operator, until);
        tracing::info!(
            holder = %msg.sender.short(),
            operator = %operator.short(),
            until,
            "operator set"
        );
    }

    /// Expiry of `operator`'s grant on `holder`, 0 if none
    pub fn operator_until(&self, holder: &Address, operator: &Address) -> u64 {
        self.operators
            .get(holder)
            .and_then(|grants| grants.get(operator))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `spender` may move `holder`'s tokens at time `now`
    pub fn is_operator(&self, holder: &Address, spender: &Address, now: u64) -> bool {
        holder == spender || self.operator_until(holder, spender) > now
    }

    pub fn confidential_balance_of(&self, account: &Address) -> Euint64 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn confidential_total_supply(&self) -> Euint64 {
        self.total_supply
    }

    /// Import a client input bound to (this token, caller)
    ///
    /// The caller is allowed on the imported handle.
    pub fn import_input<B: FheBackend>(
        &self,
        env: &mut Env<'_, B>,
        msg: &Msg,
        handle: Handle,
        proof: &InputProof,
    ) -> DeFiResult<Euint64> {
        let amount = env.fhe.verify_input(handle, proof, self.address, msg.sender)?;
        env.fhe.scope(self.address).allow(amount, msg.sender)?;
        Ok(amount)
    }

    fn require_minter(&self, msg: &Msg) -> DeFiResult<()> {
        if msg.sender != self.minter || self.minter == Address::ZERO {
            return Err(DeFiError::Unauthorized {
                caller: msg.sender,
                role: "minter",
            });
        }
        Ok(())
    }

    fn require_access<B: FheBackend>(env: &Env<'_, B>, amount: Euint64, account: Address) -> DeFiResult<()> {
        if !env.fhe.is_allowed(amount.handle(), &account) {
            return Err(FHEError::AccessDenied {
                handle: amount.handle(),
                account,
            }
            .into());
        }
        Ok(())
    }

    /// Mint `amount` to `to` (minter only)
    ///
    /// A mint that would wrap the total supply mints zero instead. Every
    /// balance is bounded by the supply, so balances cannot wrap either.
    /// Returns the minted amount, allowed to the minter and to `to`.
    pub fn mint<B: FheBackend>(
        &mut self,
        env: &mut Env<'_, B>,
        msg: &Msg,
        to: Address,
        amount: Euint64,
    ) -> DeFiResult<Euint64> {
        self.require_minter(msg)?;
        Self::require_access(env, amount, msg.sender)?;

        let mut scope = env.fhe.scope(self.address);
        let next = scope.add(self.total_supply, amount)?;
        let fits = scope.ge(next, self.total_supply)?;
        let zero = scope.as_trivial(0)?;
        let minted = scope.select(fits, amount, zero)?;

        let balance = scope.add(self.confidential_balance_of(&to), minted)?;
        let supply = scope.add(self.total_supply, minted)?;
        scope.allow(balance, to)?;
        scope.allow(minted, to)?;
        scope.allow(minted, msg.sender)?;

        self.balances.insert(to, balance);
        self.total_supply = supply;
        tracing::info!(token = %self.address.short(), to = %to.short(), "minted");
        Ok(minted)
    }

    /// Burn up to `amount` from `from` (minter only)
    ///
    /// Returns the burned amount, `min(amount, balance(from))`, allowed to
    /// the minter.
    pub fn burn<B: FheBackend>(
        &mut self,
        env: &mut Env<'_, B>,
        msg: &Msg,
        from: Address,
        amount: Euint64,
    ) -> DeFiResult<Euint64> {
        self.require_minter(msg)?;
        Self::require_access(env, amount, msg.sender)?;

        let mut scope = env.fhe.scope(self.address);
        let balance = self.confidential_balance_of(&from);
        let burned = clamp(&mut scope, amount, balance)?;
        let balance = scope.sub(balance, burned)?;
        let supply = scope.sub(self.total_supply, burned)?;
        scope.allow(balance, from)?;
        scope.allow(burned, msg.sender)?;

        self.balances.insert(from, balance);
        self.total_supply = supply;
        tracing::info!(token = %self.address.short(), from = %from.short(), "burned");
        Ok(burned)
    }

    /// Transfer from the caller's own balance
    pub fn confidential_transfer<B: FheBackend>(
        &mut self,
        env: &mut Env<'_, B>,
        msg: &Msg,
        to: Address,
        amount: Euint64,
    ) -> DeFiResult<Euint64> {
        Self::require_access(env, amount, msg.sender)?;
        self.transfer(env, msg.sender, to, amount, msg.sender)
    }

    /// Transfer an amount supplied as a fresh client input
    pub fn confidential_transfer_input<B: FheBackend>(
        &mut self,
        env: &mut Env<'_, B>,
        msg: &Msg,
        to: Address,
        handle: Handle,
        proof: &InputProof,
    ) -> DeFiResult<Euint64> {
        let amount = self.import_input(env, msg, handle, proof)?;
        self.transfer(env, msg.sender, to, amount, msg.sender)
    }

    /// Transfer on behalf of `from`; the caller must be `from` or an active operator
    pub fn confidential_transfer_from<B: FheBackend>(
        &mut self,
        env: &mut Env<'_, B>,
        msg: &Msg,
        from: Address,
        to: Address,
        amount: Euint64,
    ) -> DeFiResult<Euint64> {
        if !self.is_operator(&from, &msg.sender, env.block.timestamp) {
            return Err(DeFiError::NotOperator {
                holder: from,
                spender: msg.sender,
            });
        }
        Self::require_access(env, amount, msg.sender)?;
        self.transfer(env, from, to, amount, msg.sender)
    }

    fn transfer<B: FheBackend>(
        &mut self,
        env: &mut Env<'_, B>,
        from: Address,
        to: Address,
        amount: Euint64,
        spender: Address,
    ) -> DeFiResult<Euint64> {
        let mut scope = env.fhe.scope(self.address);
        let from_balance = self.confidential_balance_of(&from);

        let moved = if from == to {
            clamp(&mut scope, amount, from_balance)?
        } else {
            let step = clamped_move(&mut scope, amount, from_balance, self.confidential_balance_of(&to))?;
            scope.allow(step.from_balance, from)?;
            scope.allow(step.to_balance, to)?;
            self.balances.insert(from, step.from_balance);
            self.balances.insert(to, step.to_balance);
            step.moved
        };

        for account in [from, to, spender] {
            scope.allow(moved, account)?;
        }
        tracing::info!(
            token = %self.address.short(),
            from = %from.short(),
            to = %to.short(),
            "confidential transfer"
        );
        Ok(moved)
    }
}

impl std::fmt::Debug for ConfidentialToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfidentialToken")
            .field("address", &self.address)
            .field("symbol", &self.metadata.symbol)
            .field("owner", &self.owner)
            .field("minter", &self.minter)
            .field("holders", &self.balances.len())
            .field("total_supply", &"<encrypted>")
            .finish()
    }
}
