//! Identity metadata: the signed document that anchors an account's claims.
//!
//! The document is a JSON object `{ claims: [...], meta: { address,
//! signature } }` published at the URL the registry records for the account.
//! Parsing is fail-closed: a document with claims whose signature is
//! absent, malformed, or produced by a key that is neither the account nor
//! one of its registered signers is rejected outright. Only a freshly
//! created zero-claim document may be unsigned.

use serde::{Deserialize, Serialize};

use crate::custody::KeyCustody;
use crate::fetcher::MetadataFetcher;
use crate::registry::AccountRegistry;
use crate::signing::SignatureEnvelope;
use crate::Address;

pub mod claims;
pub mod verify;

pub use claims::{
    create_account_claim, create_attestation_service_url_claim, create_domain_claim,
    create_keybase_claim, create_name_claim, create_storage_claim, hash_of_claim, hash_of_claims,
    serialize_claim, Claim, ClaimType, SINGULAR_CLAIM_TYPES,
};

/// Error raised while constructing, parsing, or signing a metadata document.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// An Account claim pointed back at the claimant itself.
    #[error("an account cannot claim itself")]
    SelfClaim,

    /// The document bytes did not parse as metadata.
    #[error("malformed metadata document: {0}")]
    Malformed(String),

    /// The document carried no signature, or one that does not verify
    /// against the account or any of its registered signers.
    #[error("metadata signature invalid for {0}")]
    InvalidSignature(Address),

    /// Fetching the document failed.
    #[error("metadata fetch failed for {url}: {reason}")]
    Fetch {
        /// The metadata URL.
        url: String,
        /// Underlying failure description.
        reason: String,
    },

    /// Signing through the key custody failed.
    #[error(transparent)]
    Custody(#[from] crate::errors::CustodyError),
}

/// The `meta` half of a metadata document: who published it, and proof.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// The publishing account.
    pub address: Address,
    /// Signature over [`hash_of_claims`], absent only on a freshly created,
    /// never-signed document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureEnvelope>,
}

/// A parsed identity metadata document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    /// The published claims, in document order.
    pub claims: Vec<Claim>,
    /// Publisher identity and document signature.
    pub meta: Meta,
}

impl IdentityMetadata {
    /// Create an empty, unsigned document for `address`.
    pub fn from_empty(address: Address) -> Self {
        Self {
            claims: Vec::new(),
            meta: Meta {
                address,
                signature: None,
            },
        }
    }

    /// Parse and verify a raw document.
    ///
    /// The signature must cover the current claim hash and be produced
    /// either by the account key itself or by one of the signers the
    /// registry lists for the account.
    pub async fn from_raw_string(
        registry: &dyn AccountRegistry,
        raw: &[u8],
    ) -> Result<Self, MetadataError> {
        let parsed: IdentityMetadata =
            serde_json::from_slice(raw).map_err(|e| MetadataError::Malformed(e.to_string()))?;

        // A freshly created document carries no claims and no signature;
        // anything with claims must verify.
        match parsed.meta.signature.as_ref() {
            None if parsed.claims.is_empty() => {}
            None => return Err(MetadataError::InvalidSignature(parsed.meta.address)),
            Some(envelope) => {
                let digest = hash_of_claims(&parsed.claims);
                if !verify_signer_for_address(registry, &digest, envelope, &parsed.meta.address)
                    .await
                {
                    return Err(MetadataError::InvalidSignature(parsed.meta.address));
                }
            }
        }
        // Fail-closed: a duplicated singular claim is a parse error, never a
        // silent truncation.
        for claim_type in SINGULAR_CLAIM_TYPES {
            if parsed.filter_claims(claim_type).len() > 1 {
                return Err(MetadataError::Malformed(format!(
                    "more than one {claim_type:?} claim"
                )));
            }
        }
        Ok(parsed)
    }

    /// Fetch and verify the document published at `url`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(registry, fetcher)))]
    pub async fn fetch_from_url(
        registry: &dyn AccountRegistry,
        fetcher: &dyn MetadataFetcher,
        url: &str,
    ) -> Result<Self, MetadataError> {
        let raw = fetcher.fetch(url).await.map_err(|e| MetadataError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_raw_string(registry, &raw).await
    }

    /// Add a claim and re-sign the document with `signer`'s key.
    ///
    /// Singular claim types replace any existing claim of the same type.
    /// Repeatable claims are idempotent on their identifying field: adding
    /// an Account claim for an already-claimed address (or Domain/Keybase
    /// for an already-claimed domain/username) leaves the document unchanged
    /// and returns the existing claim.
    pub async fn add_claim(
        &mut self,
        claim: Claim,
        custody: &dyn KeyCustody,
        signer: &Address,
    ) -> Result<Claim, MetadataError> {
        if let Claim::Account { address, .. } = &claim {
            if *address == self.meta.address {
                return Err(MetadataError::SelfClaim);
            }
        }

        if let Some(existing) = self.find_duplicate(&claim) {
            return Ok(existing.clone());
        }
        if SINGULAR_CLAIM_TYPES.contains(&claim.claim_type()) {
            self.claims.retain(|c| c.claim_type() != claim.claim_type());
        }
        self.claims.push(claim.clone());

        let digest = hash_of_claims(&self.claims);
        self.meta.signature = Some(custody.sign_digest(signer, &digest).await?);
        Ok(claim)
    }

    /// The first claim of the given type, if any.
    pub fn find_claim(&self, claim_type: ClaimType) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type() == claim_type)
    }

    /// All claims of the given type, in document order.
    pub fn filter_claims(&self, claim_type: ClaimType) -> Vec<&Claim> {
        self.claims
            .iter()
            .filter(|c| c.claim_type() == claim_type)
            .collect()
    }

    /// Deterministic hash of the current claim list.
    pub fn hash_of_claims(&self) -> [u8; 32] {
        hash_of_claims(&self.claims)
    }

    /// Serialize to the published JSON form.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("metadata documents serialize without failure")
    }

    fn find_duplicate(&self, claim: &Claim) -> Option<&Claim> {
        self.claims.iter().find(|existing| match (existing, claim) {
            (Claim::Account { address: a, .. }, Claim::Account { address: b, .. }) => a == b,
            (Claim::Domain { domain: a, .. }, Claim::Domain { domain: b, .. }) => a == b,
            (Claim::Keybase { username: a, .. }, Claim::Keybase { username: b, .. }) => a == b,
            _ => false,
        })
    }
}

impl std::fmt::Display for IdentityMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json =
            serde_json::to_string(self).expect("metadata documents serialize without failure");
        f.write_str(&json)
    }
}

/// Check whether `envelope` over `digest` was produced by `address` or by
/// one of the signers the registry lists for it.
pub async fn verify_signer_for_address(
    registry: &dyn AccountRegistry,
    digest: &[u8; 32],
    envelope: &SignatureEnvelope,
    address: &Address,
) -> bool {
    let signer = match envelope.verify(digest) {
        Ok(signer) => signer,
        Err(_) => return false,
    };
    if signer == *address {
        return true;
    }
    registry.registered_signers(address).await.contains(&signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::LocalKeystore;
    use crate::test_utils::InMemoryRegistry;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    async fn signed_document() -> (IdentityMetadata, Address, LocalKeystore) {
        let keystore = LocalKeystore::new();
        let address = keystore.add_signing_key(SigningKey::generate(&mut OsRng));
        let mut metadata = IdentityMetadata::from_empty(address);
        metadata
            .add_claim(create_name_claim("test"), &keystore, &address)
            .await
            .unwrap();
        (metadata, address, keystore)
    }

    #[tokio::test]
    async fn round_trips_through_raw_string() {
        let (metadata, _, _) = signed_document().await;
        let registry = InMemoryRegistry::new();
        let parsed = IdentityMetadata::from_raw_string(&registry, &metadata.to_bytes())
            .await
            .unwrap();
        assert_eq!(parsed, metadata);
    }

    #[tokio::test]
    async fn empty_unsigned_document_is_valid() {
        let address = Address::from_public_key(&[1u8; 32]);
        let metadata = IdentityMetadata::from_empty(address);
        let registry = InMemoryRegistry::new();
        let parsed = IdentityMetadata::from_raw_string(&registry, &metadata.to_bytes())
            .await
            .unwrap();
        assert!(parsed.claims.is_empty());
    }

    #[tokio::test]
    async fn unsigned_document_with_claims_is_rejected() {
        let address = Address::from_public_key(&[1u8; 32]);
        let mut metadata = IdentityMetadata::from_empty(address);
        metadata.claims.push(create_name_claim("unsigned"));
        let registry = InMemoryRegistry::new();
        let result = IdentityMetadata::from_raw_string(&registry, &metadata.to_bytes()).await;
        assert!(matches!(result, Err(MetadataError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn tampered_claims_are_rejected() {
        let (mut metadata, _, _) = signed_document().await;
        metadata.claims.push(create_domain_claim("evil.example"));
        let registry = InMemoryRegistry::new();
        let result = IdentityMetadata::from_raw_string(&registry, &metadata.to_bytes()).await;
        assert!(matches!(result, Err(MetadataError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn garbage_bytes_are_malformed() {
        let registry = InMemoryRegistry::new();
        let result = IdentityMetadata::from_raw_string(&registry, b"not json").await;
        assert!(matches!(result, Err(MetadataError::Malformed(_))));
    }

    #[tokio::test]
    async fn duplicated_singular_claim_fails_parse() {
        let keystore = LocalKeystore::new();
        let address = keystore.add_signing_key(SigningKey::generate(&mut OsRng));
        let mut metadata = IdentityMetadata::from_empty(address);
        metadata.claims.push(create_name_claim("one"));
        metadata.claims.push(create_name_claim("two"));
        let digest = metadata.hash_of_claims();
        metadata.meta.signature = Some(keystore.sign_digest(&address, &digest).await.unwrap());

        let registry = InMemoryRegistry::new();
        let result = IdentityMetadata::from_raw_string(&registry, &metadata.to_bytes()).await;
        assert!(matches!(result, Err(MetadataError::Malformed(_))));
    }

    #[tokio::test]
    async fn registered_signer_signature_is_accepted() {
        let keystore = LocalKeystore::new();
        let account = keystore.add_signing_key(SigningKey::generate(&mut OsRng));
        let delegate = keystore.add_signing_key(SigningKey::generate(&mut OsRng));

        let mut metadata = IdentityMetadata::from_empty(account);
        metadata
            .add_claim(create_name_claim("delegated"), &keystore, &delegate)
            .await
            .unwrap();

        let registry = InMemoryRegistry::new();
        let bytes = metadata.to_bytes();
        let rejected = IdentityMetadata::from_raw_string(&registry, &bytes).await;
        assert!(rejected.is_err());

        registry.register_signer(account, delegate);
        let accepted = IdentityMetadata::from_raw_string(&registry, &bytes).await;
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn singular_claim_replaces_previous() {
        let (mut metadata, address, keystore) = signed_document().await;
        metadata
            .add_claim(create_name_claim("renamed"), &keystore, &address)
            .await
            .unwrap();

        let names = metadata.filter_claims(ClaimType::Name);
        assert_eq!(names.len(), 1);
        assert!(matches!(names[0], Claim::Name { name, .. } if name == "renamed"));
    }

    #[tokio::test]
    async fn repeatable_claim_is_idempotent() {
        let (mut metadata, address, keystore) = signed_document().await;
        let first = metadata
            .add_claim(create_domain_claim("example.com"), &keystore, &address)
            .await
            .unwrap();
        let second = metadata
            .add_claim(create_domain_claim("example.com"), &keystore, &address)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(metadata.filter_claims(ClaimType::Domain).len(), 1);
    }

    #[tokio::test]
    async fn self_account_claim_is_rejected() {
        let (mut metadata, address, keystore) = signed_document().await;
        let claim = Claim::Account {
            timestamp: 0,
            address,
            public_key: None,
        };
        let result = metadata.add_claim(claim, &keystore, &address).await;
        assert!(matches!(result, Err(MetadataError::SelfClaim)));
    }
}
