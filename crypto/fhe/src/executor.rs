//! Handle-based FHE executor
//!
//! Holds every ciphertext produced on the ledger, keyed by handle, along
//! with the access-control list of each handle. Contracts evaluate through
//! a [`FheScope`], which checks that the contract may read its operands and
//! grants it the results.
//!
//! The zero handle is never stored: it is encrypted zero (or false) and is
//! readable by everyone.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::backend::{FheBackend, FheClient};
use crate::input::{InputAttestor, InputProof};
use crate::types::{Address, Ebool, Euint64, Handle};
use crate::{FHEError, FHEResult};

const COMPUTED_HANDLE_CONTEXT: &str = "novalend computed handle v1";

/// Serializable copy of the executor's store and ACL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorState {
    pub backend: String,
    pub nonce: u64,
    /// Hex-encoded serialized ciphertexts
    pub uints: BTreeMap<Handle, String>,
    pub bools: BTreeMap<Handle, String>,
    pub acl: BTreeMap<Handle, BTreeSet<Address>>,
}

/// Rollback point taken before a transaction runs
#[derive(Clone, Debug)]
pub struct ExecutorCheckpoint {
    nonce: u64,
    acl: HashMap<Handle, BTreeSet<Address>>,
}

/// Ciphertext store, ACL and input verifier
#[derive(Clone)]
pub struct FheExecutor<B: FheBackend> {
    backend: B,
    attestor: InputAttestor,
    uints: HashMap<Handle, B::Uint>,
    bools: HashMap<Handle, B::Bool>,
    acl: HashMap<Handle, BTreeSet<Address>>,
    nonce: u64,
}

impl<B: FheBackend> FheExecutor<B> {
    pub fn new(backend: B, attestor: InputAttestor) -> Self {
        Self {
            backend,
            attestor,
            uints: HashMap::new(),
            bools: HashMap::new(),
            acl: HashMap::new(),
            nonce: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn attestor(&self) -> &InputAttestor {
        &self.attestor
    }

    /// Number of stored ciphertexts
    pub fn len(&self) -> usize {
        self.uints.len() + self.bools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluation view for one contract
    pub fn scope(&mut self, contract: Address) -> FheScope<'_, B> {
        FheScope {
            executor: self,
            contract,
        }
    }

    pub fn checkpoint(&self) -> ExecutorCheckpoint {
        ExecutorCheckpoint {
            nonce: self.nonce,
            acl: self.acl.clone(),
        }
    }

    /// Restore the ACL and handle counter of `checkpoint` and drop the
    /// ciphertexts computed or imported after it
    ///
    /// Every stored ciphertext has an ACL entry from the moment it is
    /// stored, so the ones missing from the restored ACL are exactly the
    /// ones created after the checkpoint.
    pub fn rollback(&mut self, checkpoint: ExecutorCheckpoint) {
        self.nonce = checkpoint.nonce;
        self.acl = checkpoint.acl;
        let acl = &self.acl;
        self.uints.retain(|handle, _| acl.contains_key(handle));
        self.bools.retain(|handle, _| acl.contains_key(handle));
    }

    /// Grant `account` access to `handle`
    pub fn allow(&mut self, handle: Handle, account: Address) {
        if handle.is_zero() {
            return;
        }
        self.acl.entry(handle).or_default().insert(account);
    }

    pub fn is_allowed(&self, handle: Handle, account: &Address) -> bool {
        handle.is_zero()
            || self
                .acl
                .get(&handle)
                .map(|accounts| accounts.contains(account))
                .unwrap_or(false)
    }

    /// Import a client input for use by `contract` on behalf of `sender`
    ///
    /// The proof must be bound to exactly this (contract, sender) pair and
    /// must name `handle`. On success the contract is allowed on the handle.
    pub fn verify_input(
        &mut self,
        handle: Handle,
        proof: &InputProof,
        contract: Address,
        sender: Address,
    ) -> FHEResult<Euint64> {
        if proof.contract != contract || proof.user != sender {
            return Err(FHEError::ProofContextMismatch {
                proof_contract: proof.contract,
                proof_user: proof.user,
                contract,
                sender,
            });
        }
        self.attestor.verify(proof)?;

        let handles = InputAttestor::handles_for(proof)?;
        let index = handles
            .iter()
            .position(|h| *h == handle)
            .ok_or_else(|| FHEError::InvalidProof(format!("handle {} is not in the proof", handle.short())))?;

        if !self.uints.contains_key(&handle) {
            let ct = B::deserialize_uint(&proof.ciphertexts[index])?;
            self.uints.insert(handle, ct);
        }
        self.allow(handle, contract);

        tracing::debug!(
            handle = %handle.short(),
            contract = %contract.short(),
            sender = %sender.short(),
            "verified client input"
        );
        Ok(Euint64::from_handle(handle))
    }

    /// Decrypt a value for `user`, as the network's decryption service does
    ///
    /// Both the contract holding the value and the user must be on the ACL.
    pub fn user_decrypt_u64<C>(&self, client: &C, handle: Handle, contract: Address, user: Address) -> FHEResult<u64>
    where
        C: FheClient<Backend = B>,
    {
        for account in [contract, user] {
            if !self.is_allowed(handle, &account) {
                return Err(FHEError::AccessDenied { handle, account });
            }
        }
        if handle.is_zero() {
            return Ok(0);
        }
        let ct = self.uints.get(&handle).ok_or(FHEError::UnknownHandle(handle))?;
        client.decrypt_u64(ct)
    }

    fn next_handle(&mut self) -> Handle {
        self.nonce += 1;
        let mut hasher = blake3::Hasher::new_derive_key(COMPUTED_HANDLE_CONTEXT);
        hasher.update(&self.nonce.to_le_bytes());
        Handle::new(*hasher.finalize().as_bytes())
    }

    fn store_uint(&mut self, value: B::Uint, owner: Address) -> Euint64 {
        let handle = self.next_handle();
        self.uints.insert(handle, value);
        self.allow(handle, owner);
        Euint64::from_handle(handle)
    }

    fn store_bool(&mut self, value: B::Bool, owner: Address) -> Ebool {
        let handle = self.next_handle();
        self.bools.insert(handle, value);
        self.allow(handle, owner);
        Ebool::from_handle(handle)
    }

    fn check_access(&self, handle: Handle, account: Address) -> FHEResult<()> {
        if self.is_allowed(handle, &account) {
            Ok(())
        } else {
            Err(FHEError::AccessDenied { handle, account })
        }
    }

    fn load_uint(&self, value: Euint64, reader: Address) -> FHEResult<B::Uint> {
        let handle = value.handle();
        self.check_access(handle, reader)?;
        if handle.is_zero() {
            return self.backend.trivial_u64(0);
        }
        self.uints.get(&handle).cloned().ok_or(FHEError::UnknownHandle(handle))
    }

    fn load_bool(&self, value: Ebool, reader: Address) -> FHEResult<B::Bool> {
        let handle = value.handle();
        self.check_access(handle, reader)?;
        if handle.is_zero() {
            let zero = self.backend.trivial_u64(0)?;
            return self.backend.gt(&zero, &zero);
        }
        self.bools.get(&handle).cloned().ok_or(FHEError::UnknownHandle(handle))
    }

    /// Snapshot of the store for persistence
    pub fn export_state(&self) -> FHEResult<ExecutorState> {
        let uints = self
            .uints
            .iter()
            .map(|(h, ct)| Ok((*h, hex::encode(B::serialize_uint(ct)?))))
            .collect::<FHEResult<BTreeMap<_, _>>>()?;
        let bools = self
            .bools
            .iter()
            .map(|(h, ct)| Ok((*h, hex::encode(B::serialize_bool(ct)?))))
            .collect::<FHEResult<BTreeMap<_, _>>>()?;
        let acl = self
            .acl
            .iter()
            .map(|(h, accounts)| (*h, accounts.clone()))
            .collect();

        Ok(ExecutorState {
            backend: self.backend.name().to_string(),
            nonce: self.nonce,
            uints,
            bools,
            acl,
        })
    }

    /// Rebuild an executor from an exported state
    pub fn from_state(backend: B, attestor: InputAttestor, state: ExecutorState) -> FHEResult<Self> {
        if state.backend != backend.name() {
            return Err(FHEError::ConfigError(format!(
                "state was exported by the {} backend, not {}",
                state.backend,
                backend.name()
            )));
        }

        let decode = |s: &str| hex::decode(s).map_err(|e| FHEError::InvalidCiphertext(e.to_string()));
        let uints = state
            .uints
            .iter()
            .map(|(h, ct)| Ok((*h, B::deserialize_uint(&decode(ct.as_str())?)?)))
            .collect::<FHEResult<HashMap<_, _>>>()?;
        let bools = state
            .bools
            .iter()
            .map(|(h, ct)| Ok((*h, B::deserialize_bool(&decode(ct.as_str())?)?)))
            .collect::<FHEResult<HashMap<_, _>>>()?;

        Ok(Self {
            backend,
            attestor,
            uints,
            bools,
            acl: state.acl.into_iter().collect(),
            nonce: state.nonce,
        })
    }
}

impl<B: FheBackend> std::fmt::Debug for FheExecutor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FheExecutor")
            .field("backend", &self.backend.name())
            .field("uints", &self.uints.len())
            .field("bools", &self.bools.len())
            .field("nonce", &self.nonce)
            .finish()
    }
}

/// Evaluation view of the executor for a single contract
///
/// Every operand must be readable by the contract; every result is
/// allowed to it.
pub struct FheScope<'a, B: FheBackend> {
    executor: &'a mut FheExecutor<B>,
    contract: Address,
}

impl<'a, B: FheBackend> FheScope<'a, B> {
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Trivially encrypt a public constant
    pub fn as_trivial(&mut self, value: u64) -> FHEResult<Euint64> {
        let ct = self.executor.backend.trivial_u64(value)?;
        Ok(self.executor.store_uint(ct, self.contract))
    }

    fn binary(
        &mut self,
        a: Euint64,
        b: Euint64,
        op: impl FnOnce(&B, &B::Uint, &B::Uint) -> FHEResult<B::Uint>,
    ) -> FHEResult<Euint64> {
        let lhs = self.executor.load_uint(a, self.contract)?;
        let rhs = self.executor.load_uint(b, self.contract)?;
        let out = op(&self.executor.backend, &lhs, &rhs)?;
        Ok(self.executor.store_uint(out, self.contract))
    }

    fn scalar(
        &mut self,
        a: Euint64,
        op: impl FnOnce(&B, &B::Uint) -> FHEResult<B::Uint>,
    ) -> FHEResult<Euint64> {
        let lhs = self.executor.load_uint(a, self.contract)?;
        let out = op(&self.executor.backend, &lhs)?;
        Ok(self.executor.store_uint(out, self.contract))
    }

    fn compare(
        &mut self,
        a: Euint64,
        b: Euint64,
        op: impl FnOnce(&B, &B::Uint, &B::Uint) -> FHEResult<B::Bool>,
    ) -> FHEResult<Ebool> {
        let lhs = self.executor.load_uint(a, self.contract)?;
        let rhs = self.executor.load_uint(b, self.contract)?;
        let out = op(&self.executor.backend, &lhs, &rhs)?;
        Ok(self.executor.store_bool(out, self.contract))
    }

    /// Wrapping addition
    pub fn add(&mut self, a: Euint64, b: Euint64) -> FHEResult<Euint64> {
        self.binary(a, b, |be, x, y| be.add(x, y))
    }

    /// Wrapping subtraction
    pub fn sub(&mut self, a: Euint64, b: Euint64) -> FHEResult<Euint64> {
        self.binary(a, b, |be, x, y| be.sub(x, y))
    }

    /// `a - min(a, b)`
    pub fn saturating_sub(&mut self, a: Euint64, b: Euint64) -> FHEResult<Euint64> {
        self.binary(a, b, |be, x, y| {
            let m = be.min(x, y)?;
            be.sub(x, &m)
        })
    }

    pub fn add_scalar(&mut self, a: Euint64, scalar: u64) -> FHEResult<Euint64> {
        self.scalar(a, |be, x| be.add_scalar(x, scalar))
    }

    pub fn mul_scalar(&mut self, a: Euint64, scalar: u64) -> FHEResult<Euint64> {
        self.scalar(a, |be, x| be.mul_scalar(x, scalar))
    }

    pub fn div_scalar(&mut self, a: Euint64, scalar: u64) -> FHEResult<Euint64> {
        self.scalar(a, |be, x| be.div_scalar(x, scalar))
    }

    pub fn min(&mut self, a: Euint64, b: Euint64) -> FHEResult<Euint64> {
        self.binary(a, b, |be, x, y| be.min(x, y))
    }

    pub fn lt(&mut self, a: Euint64, b: Euint64) -> FHEResult<Ebool> {
        self.compare(a, b, |be, x, y| be.lt(x, y))
    }

    pub fn le(&mut self, a: Euint64, b: Euint64) -> FHEResult<Ebool> {
        self.compare(a, b, |be, x, y| be.le(x, y))
    }

    pub fn gt(&mut self, a: Euint64, b: Euint64) -> FHEResult<Ebool> {
        self.compare(a, b, |be, x, y| be.gt(x, y))
    }

    pub fn ge(&mut self, a: Euint64, b: Euint64) -> FHEResult<Ebool> {
        self.compare(a, b, |be, x, y| be.ge(x, y))
    }

    pub fn eq(&mut self, a: Euint64, b: Euint64) -> FHEResult<Ebool> {
        self.compare(a, b, |be, x, y| be.eq(x, y))
    }

    /// Oblivious `cond ? if_true : if_false`
    pub fn select(&mut self, cond: Ebool, if_true: Euint64, if_false: Euint64) -> FHEResult<Euint64> {
        let c = self.executor.load_bool(cond, self.contract)?;
        let t = self.executor.load_uint(if_true, self.contract)?;
        let f = self.executor.load_uint(if_false, self.contract)?;
        let out = self.executor.backend.select(&c, &t, &f)?;
        Ok(self.executor.store_uint(out, self.contract))
    }

    /// Share a handle the contract can read with another account
    pub fn allow(&mut self, handle: impl Into<Handle>, account: Address) -> FHEResult<()> {
        let handle = handle.into();
        self.executor.check_access(handle, self.contract)?;
        self.executor.allow(handle, account);
        Ok(())
    }

    pub fn is_allowed(&self, handle: impl Into<Handle>, account: &Address) -> bool {
        self.executor.is_allowed(handle.into(), account)
    }
}
