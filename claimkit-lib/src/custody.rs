//! Key custody: the collaborator that holds private keys.
//!
//! The protocol never touches private key material directly. Signing,
//! shared-secret computation, and decryption all go through [`KeyCustody`];
//! absence of a key is an expected, recoverable condition
//! ([`CustodyError::UnknownAccount`]), not a crash.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::errors::CustodyError;
use crate::signing::SignatureEnvelope;
use crate::{Address, EncryptionPublicKey};

/// Trait describing the wallet/key-custody collaborator.
#[async_trait]
pub trait KeyCustody: Send + Sync {
    /// Whether a private key for `address` is held locally.
    fn has_account(&self, address: &Address) -> bool;

    /// Sign a 32-byte digest with the key identified by `address`.
    async fn sign_digest(
        &self,
        address: &Address,
        digest: &[u8; 32],
    ) -> Result<SignatureEnvelope, CustodyError>;

    /// Compute the ECDH shared secret between the local key identified by
    /// `my_address` and a counter-party public key.
    async fn compute_shared_secret(
        &self,
        my_address: &Address,
        other: &EncryptionPublicKey,
    ) -> Result<Vec<u8>, CustodyError>;

    /// Decrypt a wrapped payload addressed to the key identified by
    /// `my_address`.
    async fn decrypt(
        &self,
        my_address: &Address,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CustodyError>;
}

/// In-memory key custody holding ed25519 signing keys and x25519
/// data-encryption keys, each addressable by the address of its public key.
///
/// Suitable for tests and short-lived processes; production deployments
/// would put an HSM or OS keychain behind the same trait.
#[derive(Default)]
pub struct LocalKeystore {
    signing_keys: RwLock<HashMap<Address, SigningKey>>,
    decryption_keys: RwLock<HashMap<Address, StaticSecret>>,
}

impl LocalKeystore {
    /// Create an empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ed25519 signing key; returns the address it is filed under.
    pub fn add_signing_key(&self, key: SigningKey) -> Address {
        let address = Address::from_public_key(key.verifying_key().as_bytes());
        self.signing_keys
            .write()
            .expect("keystore lock poisoned")
            .insert(address, key);
        address
    }

    /// Add an x25519 decryption key; returns the address it is filed under.
    pub fn add_decryption_key(&self, secret: StaticSecret) -> Address {
        let public = EncryptionPublicKey::from(PublicKey::from(&secret));
        let address = public.to_address();
        self.decryption_keys
            .write()
            .expect("keystore lock poisoned")
            .insert(address, secret);
        address
    }

    /// Remove all key material filed under `address`.
    pub fn remove_account(&self, address: &Address) {
        self.signing_keys
            .write()
            .expect("keystore lock poisoned")
            .remove(address);
        self.decryption_keys
            .write()
            .expect("keystore lock poisoned")
            .remove(address);
    }
}

#[async_trait]
impl KeyCustody for LocalKeystore {
    fn has_account(&self, address: &Address) -> bool {
        self.signing_keys
            .read()
            .expect("keystore lock poisoned")
            .contains_key(address)
            || self
                .decryption_keys
                .read()
                .expect("keystore lock poisoned")
                .contains_key(address)
    }

    async fn sign_digest(
        &self,
        address: &Address,
        digest: &[u8; 32],
    ) -> Result<SignatureEnvelope, CustodyError> {
        let keys = self.signing_keys.read().expect("keystore lock poisoned");
        let key = keys
            .get(address)
            .ok_or(CustodyError::UnknownAccount(*address))?;
        Ok(SignatureEnvelope::sign(key, digest))
    }

    async fn compute_shared_secret(
        &self,
        my_address: &Address,
        other: &EncryptionPublicKey,
    ) -> Result<Vec<u8>, CustodyError> {
        let keys = self.decryption_keys.read().expect("keystore lock poisoned");
        let secret = keys
            .get(my_address)
            .ok_or(CustodyError::UnknownAccount(*my_address))?;
        let shared = secret.diffie_hellman(&PublicKey::from(*other));
        Ok(Zeroizing::new(*shared.as_bytes()).to_vec())
    }

    async fn decrypt(
        &self,
        my_address: &Address,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CustodyError> {
        let keys = self.decryption_keys.read().expect("keystore lock poisoned");
        let secret = keys
            .get(my_address)
            .ok_or(CustodyError::UnknownAccount(*my_address))?;
        crate::crypto::ecies_decrypt(secret, ciphertext)
            .map_err(|e| CustodyError::Decryption(e.to_string()))
    }
}
