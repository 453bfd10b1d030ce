//! FHE Homomorphic Operations with Real TFHE-rs
//!
//! The server key must be installed on the calling thread
//! (see [`set_server_key`](super::keys::set_server_key)).

use tfhe::prelude::*;
use tfhe::FheBool as TfheFheBool;

use super::ciphertext::FHEUint64;
use super::keys::ClientKey;
use crate::{FHEError, FHEResult};

/// Encrypted boolean for comparison results
#[derive(Clone)]
pub struct FHEBool {
    inner: TfheFheBool,
}

impl FHEBool {
    pub fn from_tfhe(inner: TfheFheBool) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &TfheFheBool {
        &self.inner
    }

    pub fn decrypt(&self, client_key: &ClientKey) -> bool {
        self.inner.decrypt(client_key.inner())
    }

    pub fn to_bytes(&self) -> FHEResult<Vec<u8>> {
        bincode::serialize(&self.inner).map_err(|e| FHEError::SerializationError(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> FHEResult<Self> {
        let inner: TfheFheBool =
            bincode::deserialize(bytes).map_err(|e| FHEError::InvalidCiphertext(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl std::fmt::Debug for FHEBool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FHEBool").finish()
    }
}

/// FHE Operations using the installed server key
pub struct FHEOps;

impl FHEOps {
    pub fn add(a: &FHEUint64, b: &FHEUint64) -> FHEUint64 {
        let result = a.inner() + b.inner();
        FHEUint64::from_tfhe_with_ops(result, a.op_count() + b.op_count() + 1)
    }

    pub fn sub(a: &FHEUint64, b: &FHEUint64) -> FHEUint64 {
        let result = a.inner() - b.inner();
        FHEUint64::from_tfhe_with_ops(result, a.op_count() + b.op_count() + 1)
    }

    pub fn add_scalar(a: &FHEUint64, scalar: u64) -> FHEUint64 {
        let result = a.inner() + scalar;
        FHEUint64::from_tfhe_with_ops(result, a.op_count() + 1)
    }

    pub fn mul_scalar(a: &FHEUint64, scalar: u64) -> FHEUint64 {
        let result = a.inner() * scalar;
        FHEUint64::from_tfhe_with_ops(result, a.op_count() + 2)
    }

    pub fn div_scalar(a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        if scalar == 0 {
            return Err(FHEError::OperationFailed("division by zero".into()));
        }
        let result = a.inner() / scalar;
        Ok(FHEUint64::from_tfhe_with_ops(result, a.op_count() + 5))
    }

    pub fn lt(a: &FHEUint64, b: &FHEUint64) -> FHEBool {
        FHEBool::from_tfhe(a.inner().lt(b.inner()))
    }

    pub fn le(a: &FHEUint64, b: &FHEUint64) -> FHEBool {
        FHEBool::from_tfhe(a.inner().le(b.inner()))
    }

    pub fn gt(a: &FHEUint64, b: &FHEUint64) -> FHEBool {
        FHEBool::from_tfhe(a.inner().gt(b.inner()))
    }

    pub fn ge(a: &FHEUint64, b: &FHEUint64) -> FHEBool {
        FHEBool::from_tfhe(a.inner().ge(b.inner()))
    }

    pub fn eq(a: &FHEUint64, b: &FHEUint64) -> FHEBool {
        FHEBool::from_tfhe(a.inner().eq(b.inner()))
    }

    /// Conditional select: if cond then a else b
    pub fn select(cond: &FHEBool, a: &FHEUint64, b: &FHEUint64) -> FHEUint64 {
        let result = cond.inner().if_then_else(a.inner(), b.inner());
        FHEUint64::from_tfhe_with_ops(result, a.op_count() + b.op_count() + 5)
    }

    pub fn min(a: &FHEUint64, b: &FHEUint64) -> FHEUint64 {
        let result = a.inner().min(b.inner());
        FHEUint64::from_tfhe_with_ops(result, a.op_count() + b.op_count() + 3)
    }
}
