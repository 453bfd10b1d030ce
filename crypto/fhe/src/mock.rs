//! Mock backend
//!
//! Ciphertexts carry their plaintext, so every operation is instant. This
//! is the backend the local network and most tests run on; it follows the
//! same wrapping semantics as the TFHE backend so protocol code behaves
//! identically on both.

use std::fmt;

use crate::backend::{FheBackend, FheClient};
use crate::{FHEError, FHEResult};

/// Mock encrypted u64
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MockUint(u64);

impl fmt::Debug for MockUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MockUint(<encrypted>)")
    }
}

/// Mock encrypted bool
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MockBool(bool);

impl fmt::Debug for MockBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MockBool(<encrypted>)")
    }
}

/// Evaluation side of the mock scheme
#[derive(Clone, Copy, Debug, Default)]
pub struct MockBackend;

impl FheBackend for MockBackend {
    type Uint = MockUint;
    type Bool = MockBool;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn trivial_u64(&self, value: u64) -> FHEResult<MockUint> {
        Ok(MockUint(value))
    }

    fn add(&self, a: &MockUint, b: &MockUint) -> FHEResult<MockUint> {
        Ok(MockUint(a.0.wrapping_add(b.0)))
    }

    fn sub(&self, a: &MockUint, b: &MockUint) -> FHEResult<MockUint> {
        Ok(MockUint(a.0.wrapping_sub(b.0)))
    }

    fn add_scalar(&self, a: &MockUint, scalar: u64) -> FHEResult<MockUint> {
        Ok(MockUint(a.0.wrapping_add(scalar)))
    }

    fn mul_scalar(&self, a: &MockUint, scalar: u64) -> FHEResult<MockUint> {
        Ok(MockUint(a.0.wrapping_mul(scalar)))
    }

    fn div_scalar(&self, a: &MockUint, scalar: u64) -> FHEResult<MockUint> {
        if scalar == 0 {
            return Err(FHEError::OperationFailed("division by zero".into()));
        }
        Ok(MockUint(a.0 / scalar))
    }

    fn lt(&self, a: &MockUint, b: &MockUint) -> FHEResult<MockBool> {
        Ok(MockBool(a.0 < b.0))
    }

    fn le(&self, a: &MockUint, b: &MockUint) -> FHEResult<MockBool> {
        Ok(MockBool(a.0 <= b.0))
    }

    fn gt(&self, a: &MockUint, b: &MockUint) -> FHEResult<MockBool> {
        Ok(MockBool(a.0 > b.0))
    }

    fn ge(&self, a: &MockUint, b: &MockUint) -> FHEResult<MockBool> {
        Ok(MockBool(a.0 >= b.0))
    }

    fn eq(&self, a: &MockUint, b: &MockUint) -> FHEResult<MockBool> {
        Ok(MockBool(a.0 == b.0))
    }

    fn select(&self, cond: &MockBool, if_true: &MockUint, if_false: &MockUint) -> FHEResult<MockUint> {
        Ok(if cond.0 { *if_true } else { *if_false })
    }

    fn serialize_uint(value: &MockUint) -> FHEResult<Vec<u8>> {
        Ok(value.0.to_le_bytes().to_vec())
    }

    fn deserialize_uint(bytes: &[u8]) -> FHEResult<MockUint> {
        let raw: [u8; 8] = bytes.try_into().map_err(|_| {
            FHEError::InvalidCiphertext(format!("mock u64 needs 8 bytes, got {}", bytes.len()))
        })?;
        Ok(MockUint(u64::from_le_bytes(raw)))
    }

    fn serialize_bool(value: &MockBool) -> FHEResult<Vec<u8>> {
        Ok(vec![value.0 as u8])
    }

    fn deserialize_bool(bytes: &[u8]) -> FHEResult<MockBool> {
        match bytes {
            [0] => Ok(MockBool(false)),
            [1] => Ok(MockBool(true)),
            _ => Err(FHEError::InvalidCiphertext("mock bool must be a single 0/1 byte".into())),
        }
    }
}

/// Key holder of the mock scheme
#[derive(Clone, Copy, Debug, Default)]
pub struct MockClient;

impl FheClient for MockClient {
    type Backend = MockBackend;

    fn backend(&self) -> FHEResult<MockBackend> {
        Ok(MockBackend)
    }

    fn encrypt_u64(&self, value: u64) -> FHEResult<MockUint> {
        Ok(MockUint(value))
    }

    fn decrypt_u64(&self, value: &MockUint) -> FHEResult<u64> {
        Ok(value.0)
    }

    fn decrypt_bool(&self, value: &MockBool) -> FHEResult<bool> {
        Ok(value.0)
    }
}
