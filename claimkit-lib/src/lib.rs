//! Claimkit library.
//!
//! A decentralized, encrypted off-chain data protocol for publishing and
//! verifying identity claims and private application data. An account
//! publishes a small signed metadata document pointing at one or more
//! storage roots; data objects are written under conventional paths inside
//! those roots, authenticated by detached signatures, and optionally
//! encrypted to a set of recipients.
//!
//! This crate intentionally stays stateless and delegates external concerns
//! to callers through trait-based dependency injection:
//!
//! - **Account registry** ([`registry::AccountRegistry`]): resolves an
//!   address to its metadata URL, data-encryption key, and registered
//!   delegate signers.
//! - **Key custody** ([`custody::KeyCustody`]): holds private keys and
//!   performs signing, shared-secret computation, and decryption.
//! - **Storage transport** ([`storage::StorageWriter`],
//!   [`fetcher::MetadataFetcher`]): physically persists and serves bytes.
//!
//! # Example
//!
//! ```ignore
//! use claimkit_lib::accessors::NameAccessor;
//! use claimkit_lib::wrapper::OffchainDataWrapper;
//!
//! let wrapper = OffchainDataWrapper::new(me, context, registry, custody, fetcher, storage);
//! let names = NameAccessor::new(wrapper.clone());
//! names.write(&NamePayload { name: "test".into() }).await?;
//! let received = names.read(&me).await?;
//! ```

use sha2::{Digest, Sha256};

pub mod accessors;
pub mod crypto;
pub mod custody;
pub mod encrypted;
pub mod errors;
pub mod fetcher;
pub mod metadata;
pub mod prelude;
pub mod registry;
pub mod signing;
pub mod storage;
pub mod wrapper;

/// Test utilities: in-memory storage host, registry, and key fixtures.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use errors::{CustodyError, OffchainError, OffchainResult, SchemaError, SchemaResult};
pub use signing::{SignatureEnvelope, SigningContext};
pub use wrapper::OffchainDataWrapper;

/// Number of bytes in an [`Address`].
pub const ADDRESS_LENGTH: usize = 20;

/// Fixed-length public account identifier.
///
/// Derived as the trailing 20 bytes of SHA-256 over a 32-byte public key
/// (ed25519 for signing keys, x25519 for data-encryption keys). Rendered as
/// `0x` + 40 lowercase hex characters; parsing accepts any case, so equality
/// is effectively case-insensitive.
///
/// # Example
///
/// ```
/// use claimkit_lib::Address;
///
/// let a: Address = "0x00112233445566778899aabbccddeeff00112233".parse().unwrap();
/// let b: Address = "0x00112233445566778899AABBCCDDEEFF00112233".parse().unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Construct an address from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derive the address of a 32-byte public key.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let digest = Sha256::digest(public_key);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// The raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::str::FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        if stripped.len() != ADDRESS_LENGTH * 2 {
            return Err(AddressParseError(s.to_string()));
        }
        let raw = hex::decode(stripped).map_err(|_| AddressParseError(s.to_string()))?;
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// Error returned when parsing a malformed address string.
#[derive(Debug, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct AddressParseError(String);

/// A 32-byte x25519 public data-encryption key, hex-serialized.
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncryptionPublicKey([u8; 32]);

impl EncryptionPublicKey {
    /// Construct from raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The address that identifies this key in the key custody.
    pub fn to_address(&self) -> Address {
        Address::from_public_key(&self.0)
    }
}

impl From<x25519_dalek::PublicKey> for EncryptionPublicKey {
    fn from(pk: x25519_dalek::PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

impl From<EncryptionPublicKey> for x25519_dalek::PublicKey {
    fn from(pk: EncryptionPublicKey) -> Self {
        x25519_dalek::PublicKey::from(pk.0)
    }
}

impl std::fmt::Display for EncryptionPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for EncryptionPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::str::FromStr for EncryptionPublicKey {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        if stripped.len() != 64 {
            return Err(AddressParseError(s.to_string()));
        }
        let raw = hex::decode(stripped).map_err(|_| AddressParseError(s.to_string()))?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for EncryptionPublicKey {
    type Error = AddressParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EncryptionPublicKey> for String {
    fn from(pk: EncryptionPublicKey) -> Self {
        pk.to_string()
    }
}
