//! Encrypted-integer backends
//!
//! [`FheBackend`] is the server-side algebra (what validators evaluate with
//! the server key). [`FheClient`] holds the secret material that encrypts
//! inputs and decrypts authorized results; protocol code never sees it.

use crate::FHEResult;

/// Homomorphic operations on encrypted u64 values
///
/// Arithmetic wraps modulo 2^64 like the underlying ciphertexts do.
/// Callers that need saturation build it from `min` and `sub`.
pub trait FheBackend {
    /// Encrypted 64-bit unsigned integer
    type Uint: Clone;
    /// Encrypted boolean
    type Bool: Clone;

    /// Short backend identifier, recorded in snapshots
    fn name(&self) -> &'static str;

    /// Trivially encrypt a public constant
    fn trivial_u64(&self, value: u64) -> FHEResult<Self::Uint>;

    fn add(&self, a: &Self::Uint, b: &Self::Uint) -> FHEResult<Self::Uint>;

    fn sub(&self, a: &Self::Uint, b: &Self::Uint) -> FHEResult<Self::Uint>;

    fn add_scalar(&self, a: &Self::Uint, scalar: u64) -> FHEResult<Self::Uint>;

    fn mul_scalar(&self, a: &Self::Uint, scalar: u64) -> FHEResult<Self::Uint>;

    /// Fails on a zero divisor
    fn div_scalar(&self, a: &Self::Uint, scalar: u64) -> FHEResult<Self::Uint>;

    fn lt(&self, a: &Self::Uint, b: &Self::Uint) -> FHEResult<Self::Bool>;

    fn le(&self, a: &Self::Uint, b: &Self::Uint) -> FHEResult<Self::Bool>;

    fn gt(&self, a: &Self::Uint, b: &Self::Uint) -> FHEResult<Self::Bool>;

    fn ge(&self, a: &Self::Uint, b: &Self::Uint) -> FHEResult<Self::Bool>;

    fn eq(&self, a: &Self::Uint, b: &Self::Uint) -> FHEResult<Self::Bool>;

    /// Oblivious select: `cond ? if_true : if_false`
    fn select(
        &self,
        cond: &Self::Bool,
        if_true: &Self::Uint,
        if_false: &Self::Uint,
    ) -> FHEResult<Self::Uint>;

    fn min(&self, a: &Self::Uint, b: &Self::Uint) -> FHEResult<Self::Uint> {
        let a_smaller = self.lt(a, b)?;
        self.select(&a_smaller, a, b)
    }

    fn serialize_uint(value: &Self::Uint) -> FHEResult<Vec<u8>>;

    fn deserialize_uint(bytes: &[u8]) -> FHEResult<Self::Uint>;

    fn serialize_bool(value: &Self::Bool) -> FHEResult<Vec<u8>>;

    fn deserialize_bool(bytes: &[u8]) -> FHEResult<Self::Bool>;
}

/// Secret-key holder for a backend
pub trait FheClient {
    type Backend: FheBackend;

    /// Evaluation backend matching this client's keys
    fn backend(&self) -> FHEResult<Self::Backend>;

    fn encrypt_u64(&self, value: u64) -> FHEResult<<Self::Backend as FheBackend>::Uint>;

    fn decrypt_u64(&self, value: &<Self::Backend as FheBackend>::Uint) -> FHEResult<u64>;

    fn decrypt_bool(&self, value: &<Self::Backend as FheBackend>::Bool) -> FHEResult<bool>;
}
