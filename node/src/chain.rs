//! Local NovaLend chain
//!
//! A single-node ledger that hosts the token and the lending engine and
//! executes transactions one per block. Every transaction runs against a
//! checkpoint of the contract and native-bank state; if the call fails the
//! checkpoint is restored, so a transaction either commits fully or leaves
//! no trace besides unreferenced ciphertexts in the FHE store.

use std::path::Path;

use novalend_defi::{
    BlockInfo, ConfidentialToken, DeFiResult, Env, LendingEngine, Msg, NativeBank,
};
use novalend_fhe::{
    Address, EncryptedInput, Euint64, FheBackend, FheClient, FheExecutor, Handle, InputAttestor, InputBuilder,
};
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::error::{NodeError, NodeResult};
use crate::snapshot::ChainSnapshot;
use crate::transaction::TxReceipt;

type Backend<C> = <C as FheClient>::Backend;

/// Local chain with both contracts deployed
pub struct LocalChain<C: FheClient> {
    config: ChainConfig,
    client: C,
    fhe: FheExecutor<Backend<C>>,
    bank: NativeBank,
    token: ConfidentialToken,
    engine: LendingEngine,
    block: BlockInfo,
    deployer: Address,
    receipts: Vec<TxReceipt>,
}

impl<C: FheClient> LocalChain<C> {
    /// Start a chain, deploy the token and the engine, and make the engine
    /// the token's minter
    pub fn deploy(client: C, config: ChainConfig) -> NodeResult<Self> {
        config.validate()?;

        let backend = client.backend()?;
        let fhe = FheExecutor::new(backend, InputAttestor::from_seed(config.attestor_seed.as_bytes()));
        let deployer = Address::from_label(&config.deployer);
        let token_address = Address::contract(&deployer, 0);
        let engine_address = Address::contract(&deployer, 1);

        let mut token = ConfidentialToken::new(token_address, deployer, config.token.clone());
        token
            .set_minter(&Msg::new(deployer), engine_address)
            .map_err(|source| NodeError::Reverted {
                method: "setMinter",
                source,
            })?;
        let engine = LendingEngine::new(engine_address, token_address, config.lending)
            .map_err(|e| NodeError::Config(e.to_string()))?;

        let mut bank = NativeBank::new();
        let genesis_balance = config.genesis_balance_wei()?;
        for label in &config.genesis_accounts {
            bank.fund(Address::from_label(label), genesis_balance);
        }

        info!(
            token = %token_address,
            engine = %engine_address,
            backend = fhe.backend().name(),
            "deployed NovaLend"
        );

        Ok(Self {
            block: BlockInfo {
                number: 0,
                timestamp: config.start_timestamp,
            },
            config,
            client,
            fhe,
            bank,
            token,
            engine,
            deployer,
            receipts: Vec::new(),
        })
    }

    /// Rebuild a chain from a snapshot
    pub fn restore(client: C, snapshot: ChainSnapshot) -> NodeResult<Self> {
        let backend = client.backend()?;
        let attestor = InputAttestor::from_seed(snapshot.config.attestor_seed.as_bytes());
        let fhe = FheExecutor::from_state(backend, attestor, snapshot.executor)?;
        let deployer = Address::from_label(&snapshot.config.deployer);

        Ok(Self {
            config: snapshot.config,
            client,
            fhe,
            bank: snapshot.bank,
            token: snapshot.token,
            engine: snapshot.engine,
            block: snapshot.block,
            deployer,
            receipts: snapshot.receipts,
        })
    }

    pub fn snapshot(&self) -> NodeResult<ChainSnapshot> {
        Ok(ChainSnapshot {
            config: self.config.clone(),
            block: self.block,
            bank: self.bank.clone(),
            token: self.token.clone(),
            engine: self.engine.clone(),
            executor: self.fhe.export_state()?,
            receipts: self.receipts.clone(),
        })
    }

    /// Load a chain from a JSON snapshot file
    pub fn load<P: AsRef<Path>>(client: C, path: P) -> NodeResult<Self> {
        Self::restore(client, ChainSnapshot::load_json(path)?)
    }

    /// Write the chain to a JSON snapshot file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> NodeResult<()> {
        self.snapshot()?.save_json(path)
    }

    // ---------------------------------------------------------------------
    // Chain state
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn block(&self) -> BlockInfo {
        self.block
    }

    pub fn receipts(&self) -> &[TxReceipt] {
        &self.receipts
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn token_address(&self) -> Address {
        self.token.address()
    }

    pub fn engine_address(&self) -> Address {
        self.engine.address()
    }

    pub fn token(&self) -> &ConfidentialToken {
        &self.token
    }

    pub fn engine(&self) -> &LendingEngine {
        &self.engine
    }

    pub fn bank(&self) -> &NativeBank {
        &self.bank
    }

    pub fn native_balance_of(&self, account: &Address) -> u128 {
        self.bank.balance_of(account)
    }

    /// Faucet: credit native value to an account
    pub fn fund(&mut self, account: Address, wei: u128) {
        self.bank.fund(account, wei);
        debug!(account = %account.short(), wei = %wei, "funded");
    }

    /// Make an account refuse incoming native value
    pub fn reject_native(&mut self, account: Address, rejects: bool) {
        self.bank.set_rejects(account, rejects);
    }

    /// Move time forward and mine an empty block
    pub fn advance_time(&mut self, seconds: u64) {
        self.block.number = self.block.number.saturating_add(1);
        self.block.timestamp = self.block.timestamp.saturating_add(seconds);
        debug!(number = self.block.number, timestamp = self.block.timestamp, "advanced time");
    }

    // ---------------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------------

    /// Run one transaction in its own block
    ///
    /// A failed call leaves no trace: contract state, native balances and
    /// the executor's grants and ciphertexts are rolled back together.
    fn execute<T>(
        &mut self,
        msg: Msg,
        to: Address,
        method: &'static str,
        call: impl FnOnce(&mut ConfidentialToken, &mut LendingEngine, &mut Env<'_, Backend<C>>, &Msg) -> DeFiResult<T>,
    ) -> NodeResult<T> {
        let block = self.next_block()?;
        let checkpoint = (
            self.token.clone(),
            self.engine.clone(),
            self.bank.clone(),
            self.fhe.checkpoint(),
        );

        let result = {
            let mut env = Env::new(&mut self.fhe, &mut self.bank, block);
            call(&mut self.token, &mut self.engine, &mut env, &msg)
        };

        match result {
            Ok(value) => {
                self.block = block;
                self.receipts.push(TxReceipt {
                    block_number: block.number,
                    timestamp: block.timestamp,
                    from: msg.sender,
                    to,
                    method: method.to_string(),
                    value: msg.value,
                });
                info!(
                    block = block.number,
                    from = %msg.sender.short(),
                    method,
                    "transaction committed"
                );
                Ok(value)
            }
            Err(source) => {
                let (token, engine, bank, fhe) = checkpoint;
                self.token = token;
                self.engine = engine;
                self.bank = bank;
                self.fhe.rollback(fhe);
                warn!(from = %msg.sender.short(), method, error = %source, "transaction reverted");
                Err(NodeError::Reverted { method, source })
            }
        }
    }

    fn next_block(&self) -> NodeResult<BlockInfo> {
        let number = self.block.number.checked_add(1);
        let timestamp = self.block.timestamp.checked_add(self.config.block_time_secs);
        match (number, timestamp) {
            (Some(number), Some(timestamp)) => Ok(BlockInfo { number, timestamp }),
            _ => Err(NodeError::ClockOverflow {
                number: self.block.number,
                timestamp: self.block.timestamp,
            }),
        }
    }

    fn first_handle(input: &EncryptedInput) -> NodeResult<Handle> {
        input
            .handles
            .first()
            .copied()
            .ok_or_else(|| NodeError::Config("encrypted input has no handles".into()))
    }

    // ---------------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------------

    pub fn stake(&mut self, sender: Address, wei: u128) -> NodeResult<Euint64> {
        let to = self.engine_address();
        self.execute(Msg::with_value(sender, wei), to, "stake", |_, engine, env, msg| {
            engine.stake(env, msg)
        })
    }

    /// Borrow with an input bound to (engine, sender)
    pub fn borrow(&mut self, sender: Address, input: &EncryptedInput) -> NodeResult<Euint64> {
        let handle = Self::first_handle(input)?;
        let to = self.engine_address();
        self.execute(Msg::new(sender), to, "borrow", |token, engine, env, msg| {
            engine.borrow(token, env, msg, handle, &input.input_proof)
        })
    }

    /// Repay with an input bound to (token, engine)
    pub fn repay(&mut self, sender: Address, input: &EncryptedInput) -> NodeResult<Euint64> {
        let handle = Self::first_handle(input)?;
        let to = self.engine_address();
        self.execute(Msg::new(sender), to, "repay", |token, engine, env, msg| {
            engine.repay(token, env, msg, handle, &input.input_proof)
        })
    }

    pub fn withdraw_all(&mut self, sender: Address) -> NodeResult<u128> {
        let to = self.engine_address();
        self.execute(Msg::new(sender), to, "withdrawAll", |_, engine, env, msg| {
            engine.withdraw_all(env, msg)
        })
    }

    pub fn set_operator(&mut self, sender: Address, operator: Address, until: u64) -> NodeResult<()> {
        let to = self.token_address();
        self.execute(Msg::new(sender), to, "setOperator", |token, _, _, msg| {
            token.set_operator(msg, operator, until);
            Ok(())
        })
    }

    pub fn set_minter(&mut self, sender: Address, minter: Address) -> NodeResult<()> {
        let to = self.token_address();
        self.execute(Msg::new(sender), to, "setMinter", |token, _, _, msg| {
            token.set_minter(msg, minter)
        })
    }

    /// Transfer cUSDT with an input bound to (token, sender)
    pub fn confidential_transfer(
        &mut self,
        sender: Address,
        to_account: Address,
        input: &EncryptedInput,
    ) -> NodeResult<Euint64> {
        let handle = Self::first_handle(input)?;
        let to = self.token_address();
        self.execute(Msg::new(sender), to, "confidentialTransfer", |token, _, env, msg| {
            token.confidential_transfer_input(env, msg, to_account, handle, &input.input_proof)
        })
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    pub fn confidential_balance_of(&self, account: &Address) -> Euint64 {
        self.token.confidential_balance_of(account)
    }

    pub fn encrypted_collateral_of(&self, account: &Address) -> Euint64 {
        self.engine.encrypted_collateral_of(account)
    }

    pub fn encrypted_debt_of(&self, account: &Address) -> Euint64 {
        self.engine.encrypted_debt_of(account)
    }

    /// Operator check at the latest block's timestamp
    pub fn is_operator(&self, holder: &Address, spender: &Address) -> bool {
        self.token.is_operator(holder, spender, self.block.timestamp)
    }

    // ---------------------------------------------------------------------
    // Client-side encryption and decryption
    // ---------------------------------------------------------------------

    /// Start an encrypted input bound to (contract, user)
    pub fn create_encrypted_input(&self, contract: Address, user: Address) -> InputBuilder<'_, C> {
        InputBuilder::new(&self.client, self.fhe.attestor(), contract, user)
    }

    /// Decrypt a handle on behalf of `user`, held by `contract`
    pub fn user_decrypt_u64(&self, handle: Handle, contract: Address, user: Address) -> NodeResult<u64> {
        Ok(self.fhe.user_decrypt_u64(&self.client, handle, contract, user)?)
    }
}

impl<C: FheClient> std::fmt::Debug for LocalChain<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalChain")
            .field("block", &self.block)
            .field("token", &self.token)
            .field("engine", &self.engine)
            .field("fhe", &self.fhe)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novalend_defi::ErrorKind;
    use novalend_fhe::MockClient;

    const ETH: u128 = 1_000_000_000_000_000_000;

    fn chain() -> LocalChain<MockClient> {
        LocalChain::deploy(MockClient, ChainConfig::default()).unwrap()
    }

    #[test]
    fn test_deploy_wires_minter() {
        let chain = chain();
        assert_eq!(chain.token().minter(), chain.engine_address());
        assert_eq!(chain.token().owner(), chain.deployer());
        assert_eq!(chain.engine().token(), chain.token_address());
        assert_eq!(chain.native_balance_of(&Address::from_label("alice")), 100 * ETH);
    }

    #[test]
    fn test_each_transaction_is_a_block() {
        let mut chain = chain();
        let alice = Address::from_label("alice");
        let start = chain.block();

        chain.stake(alice, ETH).unwrap();
        let after = chain.block();
        assert_eq!(after.number, start.number + 1);
        assert_eq!(after.timestamp, start.timestamp + chain.config().block_time_secs);
        assert_eq!(chain.receipts().len(), 1);
        assert_eq!(chain.receipts()[0].method, "stake");
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut chain = chain();
        let alice = Address::from_label("alice");
        chain.stake(alice, ETH).unwrap();
        chain.reject_native(alice, true);

        let block = chain.block();
        let bank = chain.bank().clone();
        let engine = chain.engine().clone();

        let err = chain.withdraw_all(alice).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::EnvironmentFailure));
        assert_eq!(chain.block(), block);
        assert_eq!(chain.bank(), &bank);
        assert_eq!(chain.engine(), &engine);
    }

    #[test]
    fn test_failed_transaction_rolls_back_grants() {
        let mut chain = chain();
        let alice = Address::from_label("alice");
        chain.stake(alice, ETH).unwrap();
        chain.as_user(alice).borrow_usdt("100").unwrap();
        let before = chain.fhe.export_state().unwrap();

        // Repay runs its FHE work before the token rejects the missing grant
        let err = chain.as_user(alice).repay_usdt("40").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
        assert_eq!(chain.fhe.export_state().unwrap(), before);
    }

    #[test]
    fn test_clock_overflow_rejects_transaction() {
        let mut chain = chain();
        let alice = Address::from_label("alice");
        chain.advance_time(u64::MAX);
        let block = chain.block();
        assert_eq!(block.timestamp, u64::MAX);

        let err = chain.stake(alice, ETH).unwrap_err();
        assert!(matches!(err, NodeError::ClockOverflow { .. }));
        assert_eq!(chain.block(), block);
        assert_eq!(chain.native_balance_of(&alice), 100 * ETH);
        assert!(chain.receipts().is_empty());

        chain.advance_time(u64::MAX);
        assert_eq!(chain.block().timestamp, u64::MAX);
    }

    #[test]
    fn test_user_decrypt_checks_acl() {
        let mut chain = chain();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        chain.stake(alice, ETH).unwrap();

        let handle = chain.encrypted_collateral_of(&alice).handle();
        let engine = chain.engine_address();
        assert_eq!(chain.user_decrypt_u64(handle, engine, alice).unwrap(), 1_000_000);
        assert!(chain.user_decrypt_u64(handle, engine, bob).is_err());
    }

    #[test]
    fn test_advance_time_expires_operator() {
        let mut chain = chain();
        let alice = Address::from_label("alice");
        let engine = chain.engine_address();

        let until = chain.block().timestamp + 100;
        chain.set_operator(alice, engine, until).unwrap();
        assert!(chain.is_operator(&alice, &engine));

        chain.advance_time(100);
        assert!(!chain.is_operator(&alice, &engine));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut chain = chain();
        let alice = Address::from_label("alice");
        chain.stake(alice, 2 * ETH).unwrap();

        let snapshot = chain.snapshot().unwrap();
        let restored = LocalChain::restore(MockClient, snapshot).unwrap();

        let handle = restored.encrypted_collateral_of(&alice).handle();
        let engine = restored.engine_address();
        assert_eq!(restored.user_decrypt_u64(handle, engine, alice).unwrap(), 2_000_000);
        assert_eq!(restored.block(), chain.block());
        assert_eq!(restored.receipts(), chain.receipts());
    }
}
