//! Real TFHE-rs implementation
//!
//! Production-grade FHE using TFHE-rs library.

mod backend;
mod ciphertext;
mod keys;
mod operations;

pub use backend::{TfheBackend, TfheClient};
pub use ciphertext::FHEUint64;
pub use keys::{set_server_key, ClientKey, KeyPair, ServerKey};
pub use operations::{FHEBool, FHEOps};
