//! Shared fixtures for unit tests

use novalend_fhe::{
    Address, Euint64, FheExecutor, Handle, InputAttestor, InputBuilder, InputProof, MockBackend, MockClient,
};

use crate::env::{BlockInfo, Env, Msg, NativeBank};
use crate::errors::DeFiResult;
use crate::lending::{LendingConfig, LendingEngine};
use crate::token::{ConfidentialToken, TokenMetadata};

pub const ETH: u128 = 1_000_000_000_000_000_000;

pub struct Harness {
    pub fhe: FheExecutor<MockBackend>,
    pub bank: NativeBank,
    pub block: BlockInfo,
    pub token: ConfidentialToken,
    pub engine: LendingEngine,
    pub token_address: Address,
    pub engine_address: Address,
    pub alice: Address,
    pub bob: Address,
}

impl Harness {
    pub fn new() -> Self {
        let deployer = Address::from_label("deployer");
        let token_address = Address::contract(&deployer, 0);
        let engine_address = Address::contract(&deployer, 1);

        let mut token = ConfidentialToken::new(token_address, deployer, TokenMetadata::default());
        token.set_minter(&Msg::new(deployer), engine_address).unwrap();
        let engine = LendingEngine::new(engine_address, token_address, LendingConfig::default()).unwrap();

        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut bank = NativeBank::new();
        bank.fund(alice, 10 * ETH);
        bank.fund(bob, 10 * ETH);

        Self {
            fhe: FheExecutor::new(MockBackend, InputAttestor::from_seed(b"defi-tests")),
            bank,
            block: BlockInfo {
                number: 1,
                timestamp: 1_700_000_000,
            },
            token,
            engine,
            token_address,
            engine_address,
            alice,
            bob,
        }
    }

    /// Encrypted constant readable by `owner` and the token
    pub fn trivial(&mut self, owner: Address, value: u64) -> Euint64 {
        let mut scope = self.fhe.scope(owner);
        let handle = scope.as_trivial(value).unwrap();
        scope.allow(handle, self.token_address).unwrap();
        handle
    }

    pub fn mint_to(&mut self, to: Address, value: u64) {
        let amount = self.trivial(self.engine_address, value);
        let mut env = Env::new(&mut self.fhe, &mut self.bank, self.block);
        self.token
            .mint(&mut env, &Msg::new(self.engine_address), to, amount)
            .unwrap();
    }

    pub fn input(&self, contract: Address, user: Address, value: u64) -> (Handle, InputProof) {
        let input = InputBuilder::new(&MockClient, self.fhe.attestor(), contract, user)
            .add64(value)
            .encrypt()
            .unwrap();
        (input.handles[0], input.input_proof)
    }

    pub fn user_input_for_token(&self, user: Address, value: u64) -> (Handle, InputProof) {
        self.input(self.token_address, user, value)
    }

    pub fn decrypt(&self, handle: Handle, contract: Address, user: Address) -> u64 {
        self.fhe.user_decrypt_u64(&MockClient, handle, contract, user).unwrap()
    }

    pub fn token_balance(&self, account: Address) -> u64 {
        let handle = self.token.confidential_balance_of(&account).handle();
        self.decrypt(handle, self.token_address, account)
    }

    pub fn total_supply(&self) -> u64 {
        let handle = self.token.confidential_total_supply().handle();
        self.decrypt(handle, self.token_address, self.token_address)
    }

    pub fn collateral(&self, account: Address) -> u64 {
        let handle = self.engine.encrypted_collateral_of(&account).handle();
        self.decrypt(handle, self.engine_address, account)
    }

    pub fn debt(&self, account: Address) -> u64 {
        let handle = self.engine.encrypted_debt_of(&account).handle();
        self.decrypt(handle, self.engine_address, account)
    }

    pub fn stake(&mut self, account: Address, wei: u128) -> DeFiResult<Euint64> {
        let mut env = Env::new(&mut self.fhe, &mut self.bank, self.block);
        self.engine.stake(&mut env, &Msg::with_value(account, wei))
    }

    pub fn borrow(&mut self, account: Address, micro_usdt: u64) -> DeFiResult<Euint64> {
        let (handle, proof) = self.input(self.engine_address, account, micro_usdt);
        let mut env = Env::new(&mut self.fhe, &mut self.bank, self.block);
        self.engine
            .borrow(&mut self.token, &mut env, &Msg::new(account), handle, &proof)
    }

    pub fn repay(&mut self, account: Address, micro_usdt: u64) -> DeFiResult<Euint64> {
        let (handle, proof) = self.input(self.token_address, self.engine_address, micro_usdt);
        let mut env = Env::new(&mut self.fhe, &mut self.bank, self.block);
        self.engine
            .repay(&mut self.token, &mut env, &Msg::new(account), handle, &proof)
    }

    pub fn approve_engine(&mut self, account: Address, seconds: u64) {
        let until = self.block.timestamp + seconds;
        self.token.set_operator(&Msg::new(account), self.engine_address, until);
    }
}
