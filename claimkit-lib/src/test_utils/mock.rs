//! In-memory doubles for the external collaborators.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::errors::OffchainResult;
use crate::fetcher::{resolve_path, FetchError, MetadataFetcher};
use crate::metadata::verify::DnsResolver;
use crate::registry::AccountRegistry;
use crate::storage::StorageWriter;
use crate::{Address, EncryptionPublicKey};

/// An in-memory "web host": a URL-to-bytes map shared between storage
/// writers and fetchers, so what one account writes another can read.
#[derive(Clone, Default)]
pub struct MockHost {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MockHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish raw bytes at a URL, replacing any previous content.
    pub fn publish(&self, url: &str, bytes: Vec<u8>) {
        self.objects
            .write()
            .expect("host lock poisoned")
            .insert(url.to_string(), bytes);
    }

    /// Remove the object at a URL.
    pub fn remove(&self, url: &str) {
        self.objects
            .write()
            .expect("host lock poisoned")
            .remove(url);
    }

    /// A fetcher reading from this host.
    pub fn fetcher(&self) -> MockFetcher {
        MockFetcher { host: self.clone() }
    }

    /// A storage writer publishing into this host under `serve_root`.
    pub fn writer(&self, serve_root: impl Into<String>) -> MockStorageWriter {
        MockStorageWriter {
            host: self.clone(),
            serve_root: serve_root.into(),
        }
    }
}

/// Fetcher over a [`MockHost`].
#[derive(Clone)]
pub struct MockFetcher {
    host: MockHost,
}

#[async_trait]
impl MetadataFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.host
            .objects
            .read()
            .expect("host lock poisoned")
            .get(url)
            .cloned()
            .ok_or(FetchError::NotFound)
    }
}

/// Storage writer over a [`MockHost`].
pub struct MockStorageWriter {
    host: MockHost,
    serve_root: String,
}

#[async_trait]
impl StorageWriter for MockStorageWriter {
    fn root(&self) -> &str {
        &self.serve_root
    }

    async fn write(&self, data: &[u8], path: &str) -> OffchainResult<()> {
        self.host
            .publish(&resolve_path(&self.serve_root, path), data.to_vec());
        Ok(())
    }
}

/// In-memory account registry.
#[derive(Default)]
pub struct InMemoryRegistry {
    metadata_urls: RwLock<HashMap<Address, String>>,
    encryption_keys: RwLock<HashMap<Address, EncryptionPublicKey>>,
    signers: RwLock<HashMap<Address, Vec<Address>>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the metadata URL for an account.
    pub fn register_metadata_url(&self, account: Address, url: impl Into<String>) {
        self.metadata_urls
            .write()
            .expect("registry lock poisoned")
            .insert(account, url.into());
    }

    /// Record the data-encryption key for an account.
    pub fn register_encryption_key(&self, account: Address, key: EncryptionPublicKey) {
        self.encryption_keys
            .write()
            .expect("registry lock poisoned")
            .insert(account, key);
    }

    /// Register a delegate signer for an account.
    pub fn register_signer(&self, account: Address, signer: Address) {
        self.signers
            .write()
            .expect("registry lock poisoned")
            .entry(account)
            .or_default()
            .push(signer);
    }
}

#[async_trait]
impl AccountRegistry for InMemoryRegistry {
    async fn metadata_url(&self, address: &Address) -> Option<String> {
        self.metadata_urls
            .read()
            .expect("registry lock poisoned")
            .get(address)
            .cloned()
    }

    async fn data_encryption_key(&self, address: &Address) -> Option<EncryptionPublicKey> {
        self.encryption_keys
            .read()
            .expect("registry lock poisoned")
            .get(address)
            .copied()
    }

    async fn registered_signers(&self, address: &Address) -> Vec<Address> {
        self.signers
            .read()
            .expect("registry lock poisoned")
            .get(address)
            .cloned()
            .unwrap_or_default()
    }
}

/// In-memory DNS TXT resolver.
#[derive(Default)]
pub struct MockDnsResolver {
    records: RwLock<HashMap<String, Vec<String>>>,
}

impl MockDnsResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a TXT entry for a domain.
    pub fn publish_txt(&self, domain: &str, entry: impl Into<String>) {
        self.records
            .write()
            .expect("dns lock poisoned")
            .entry(domain.to_string())
            .or_default()
            .push(entry.into());
    }
}

#[async_trait]
impl DnsResolver for MockDnsResolver {
    async fn resolve_txt(&self, domain: &str) -> Result<Vec<String>, String> {
        Ok(self
            .records
            .read()
            .expect("dns lock poisoned")
            .get(domain)
            .cloned()
            .unwrap_or_default())
    }
}
