//! Account addresses and ciphertext handles
//!
//! Contracts never hold ciphertexts. They hold 32-byte handles that point
//! into the executor's ciphertext store, typed as [`Euint64`] or [`Ebool`].
//! The all-zero handle is "uninitialized" and evaluates as encrypted zero.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::FHEError;

/// 20-byte account identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Deterministic address for a named account
    pub fn from_label(label: &str) -> Self {
        let key = blake3::derive_key("novalend account address v1", label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&key[..20]);
        Self(bytes)
    }

    /// Address of the `nonce`-th contract deployed by `deployer`
    pub fn contract(deployer: &Address, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("novalend contract address v1");
        hasher.update(&deployer.0);
        hasher.update(&nonce.to_le_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..20]);
        Self(bytes)
    }

    /// Abbreviated form for logs
    pub fn short(&self) -> String {
        format!("0x{}…{}", hex::encode(&self.0[..3]), hex::encode(&self.0[18..]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = FHEError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(digits).map_err(|e| FHEError::InvalidAddress(format!("{s}: {e}")))?;
        let bytes: [u8; 20] = raw
            .try_into()
            .map_err(|_| FHEError::InvalidAddress(format!("{s}: expected 20 bytes")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque reference to a ciphertext held by the executor
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Handle([u8; 32]);

impl Handle {
    /// The uninitialized handle
    pub const ZERO: Handle = Handle([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Abbreviated form for logs
    pub fn short(&self) -> String {
        format!("0x{}…{}", hex::encode(&self.0[..4]), hex::encode(&self.0[30..]))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.short())
    }
}

impl FromStr for Handle {
    type Err = FHEError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(digits)
            .map_err(|e| FHEError::InvalidCiphertext(format!("bad handle {s}: {e}")))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| FHEError::InvalidCiphertext(format!("bad handle {s}: expected 32 bytes")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Handle to an encrypted 64-bit unsigned integer
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Euint64(Handle);

impl Euint64 {
    pub const fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }

    pub fn handle(&self) -> Handle {
        self.0
    }

    /// False for the uninitialized (encrypted-zero) handle
    pub fn is_initialized(&self) -> bool {
        !self.0.is_zero()
    }
}

impl fmt::Debug for Euint64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Euint64({})", self.0.short())
    }
}

impl From<Euint64> for Handle {
    fn from(value: Euint64) -> Self {
        value.0
    }
}

/// Handle to an encrypted boolean
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ebool(Handle);

impl Ebool {
    pub const fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }

    pub fn handle(&self) -> Handle {
        self.0
    }
}

impl fmt::Debug for Ebool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ebool({})", self.0.short())
    }
}

impl From<Ebool> for Handle {
    fn from(value: Ebool) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_label_is_deterministic() {
        assert_eq!(Address::from_label("alice"), Address::from_label("alice"));
        assert_ne!(Address::from_label("alice"), Address::from_label("bob"));
    }

    #[test]
    fn test_address_parse_display() {
        let alice = Address::from_label("alice");
        let parsed: Address = alice.to_string().parse().unwrap();
        assert_eq!(parsed, alice);
        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz".parse::<Address>().is_err());
    }

    #[test]
    fn test_contract_addresses_differ_by_nonce() {
        let deployer = Address::from_label("deployer");
        assert_ne!(Address::contract(&deployer, 0), Address::contract(&deployer, 1));
    }

    #[test]
    fn test_handle_serde_as_hex_string() {
        let handle = Handle::new([7u8; 32]);
        let json = serde_json::to_string(&Euint64::from_handle(handle)).unwrap();
        assert_eq!(json, format!("\"{}\"", handle));

        let back: Euint64 = serde_json::from_str(&json).unwrap();
        assert_eq!(back.handle(), handle);
    }

    #[test]
    fn test_default_handle_is_uninitialized() {
        assert!(!Euint64::default().is_initialized());
        assert!(Handle::ZERO.is_zero());
    }
}
