//! Ready-made multi-account protocol environments.

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use super::mock::{InMemoryRegistry, MockHost};
use crate::custody::LocalKeystore;
use crate::fetcher::resolve_path;
use crate::metadata::{create_storage_claim, IdentityMetadata};
use crate::signing::SigningContext;
use crate::wrapper::OffchainDataWrapper;
use crate::{Address, EncryptionPublicKey};

const TEST_CHAIN_ID: u64 = 1;

/// One fully provisioned test account.
pub struct TestAccount {
    /// The account address (of the ed25519 signing key).
    pub address: Address,
    /// The account's registered x25519 data-encryption key.
    pub encryption_key: EncryptionPublicKey,
    /// The base URL of the account's storage root.
    pub root: String,
    /// Where the account's metadata document is published.
    pub metadata_url: String,
    key_address: Address,
}

/// A complete in-process protocol deployment: a shared host, a registry,
/// one keystore, and `n` accounts that each publish signed metadata with a
/// storage claim.
pub struct TestEnvironment {
    /// The shared in-memory host all roots are served from.
    pub host: MockHost,
    /// The shared registry.
    pub registry: Arc<InMemoryRegistry>,
    /// The shared keystore holding every account's keys.
    pub keystore: Arc<LocalKeystore>,
    accounts: Vec<TestAccount>,
    wrappers: Vec<OffchainDataWrapper>,
}

impl TestEnvironment {
    /// Provision `n` accounts.
    pub async fn new(n: usize) -> Self {
        let host = MockHost::new();
        let registry = Arc::new(InMemoryRegistry::new());
        let keystore = Arc::new(LocalKeystore::new());
        let context = SigningContext::new(TEST_CHAIN_ID);

        let mut accounts = Vec::with_capacity(n);
        let mut wrappers = Vec::with_capacity(n);
        for _ in 0..n {
            let address = keystore.add_signing_key(SigningKey::generate(&mut OsRng));
            let secret = StaticSecret::random_from_rng(OsRng);
            let encryption_key = EncryptionPublicKey::from(PublicKey::from(&secret));
            let key_address = keystore.add_decryption_key(secret);
            registry.register_encryption_key(address, encryption_key);

            let root = format!("http://test.host/{address}");
            let metadata_url = format!("http://test.host/metadata/{address}");
            let mut metadata = IdentityMetadata::from_empty(address);
            metadata
                .add_claim(
                    create_storage_claim(&root, ".*"),
                    keystore.as_ref(),
                    &address,
                )
                .await
                .expect("storage claim");
            host.publish(&metadata_url, metadata.to_bytes());
            registry.register_metadata_url(address, &metadata_url);

            wrappers.push(OffchainDataWrapper::new(
                address,
                context.clone(),
                registry.clone(),
                keystore.clone(),
                Arc::new(host.fetcher()),
                Arc::new(host.writer(&root)),
            ));
            accounts.push(TestAccount {
                address,
                encryption_key,
                root,
                metadata_url,
                key_address,
            });
        }

        Self {
            host,
            registry,
            keystore,
            accounts,
            wrappers,
        }
    }

    /// A wrapper acting for account `i`.
    pub fn wrapper(&self, i: usize) -> OffchainDataWrapper {
        self.wrappers[i].clone()
    }

    /// The fixture data for account `i`.
    pub fn account(&self, i: usize) -> &TestAccount {
        &self.accounts[i]
    }

    /// Generate a fresh signing key in the shared keystore and return its
    /// address. Useful for delegation scenarios.
    pub fn add_signing_key(&self) -> Address {
        self.keystore.add_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Replace the served bytes under an account's root without re-signing.
    pub fn corrupt(&self, account: &Address, path: &str, bytes: Vec<u8>) {
        let fixture = self.fixture(account);
        self.host.publish(&resolve_path(&fixture.root, path), bytes);
    }

    /// Drop all local key material for an account.
    pub fn remove_keys(&self, account: &Address) {
        let key_address = self.fixture(account).key_address;
        self.keystore.remove_account(account);
        self.keystore.remove_account(&key_address);
    }

    /// The registered encryption key of an account.
    pub fn encryption_key(&self, account: &Address) -> EncryptionPublicKey {
        self.fixture(account).encryption_key
    }

    fn fixture(&self, account: &Address) -> &TestAccount {
        self.accounts
            .iter()
            .find(|a| a.address == *account)
            .expect("unknown test account")
    }
}
