//! The on-chain account registry, seen from its interface boundary.
//!
//! The registry resolves an address to its published metadata URL and data
//! encryption key, and lists the delegate signer addresses an account has
//! registered (used as the fallback when a metadata signature was not
//! produced by the account key itself). This subsystem only reads from it.

use async_trait::async_trait;

use crate::{Address, EncryptionPublicKey};

/// Read-only view of the account registry.
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// The URL under which `address` publishes its metadata document.
    async fn metadata_url(&self, address: &Address) -> Option<String>;

    /// The public data-encryption key registered for `address`.
    async fn data_encryption_key(&self, address: &Address) -> Option<EncryptionPublicKey>;

    /// Delegate signer addresses registered on-chain for `address`.
    async fn registered_signers(&self, address: &Address) -> Vec<Address>;
}
