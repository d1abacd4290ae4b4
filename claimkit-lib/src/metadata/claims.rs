//! Identity claims: typed statements published in a metadata document.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::MetadataError;
use crate::{Address, EncryptionPublicKey};

/// The tag of a claim variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimType {
    /// A claim that another account belongs to the same entity.
    Account,
    /// The URL of the account's attestation service.
    AttestationServiceUrl,
    /// Ownership of a DNS domain.
    Domain,
    /// Ownership of a Keybase username.
    Keybase,
    /// A display name.
    Name,
    /// A storage root where the account's off-chain data lives.
    Storage,
}

/// Claim types that occur at most once per document; adding a second
/// replaces the first.
pub const SINGULAR_CLAIM_TYPES: [ClaimType; 3] = [
    ClaimType::Name,
    ClaimType::AttestationServiceUrl,
    ClaimType::Storage,
];

/// A typed statement published in an identity metadata document.
///
/// Every variant carries a Unix creation timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Claim {
    /// Claims that `address` belongs to the same entity as the publisher.
    Account {
        /// Creation time, Unix seconds.
        timestamp: i64,
        /// The claimed account.
        address: Address,
        /// Optionally, that account's data-encryption key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_key: Option<EncryptionPublicKey>,
    },
    /// The URL of the account's attestation service.
    AttestationServiceUrl {
        /// Creation time, Unix seconds.
        timestamp: i64,
        /// The service URL.
        url: String,
    },
    /// Claims ownership of a DNS domain, proven by a TXT record.
    Domain {
        /// Creation time, Unix seconds.
        timestamp: i64,
        /// The claimed domain.
        domain: String,
    },
    /// Claims ownership of a Keybase username, proven by a hosted file.
    Keybase {
        /// Creation time, Unix seconds.
        timestamp: i64,
        /// The claimed username.
        username: String,
    },
    /// A display name.
    Name {
        /// Creation time, Unix seconds.
        timestamp: i64,
        /// The display name.
        name: String,
    },
    /// A storage root for the account's off-chain data.
    Storage {
        /// Creation time, Unix seconds.
        timestamp: i64,
        /// Base URL of the storage root.
        address: String,
        /// Pattern restricting which data paths live under this root.
        filtered_data_paths: String,
    },
}

impl Claim {
    /// The variant tag of this claim.
    pub fn claim_type(&self) -> ClaimType {
        match self {
            Claim::Account { .. } => ClaimType::Account,
            Claim::AttestationServiceUrl { .. } => ClaimType::AttestationServiceUrl,
            Claim::Domain { .. } => ClaimType::Domain,
            Claim::Keybase { .. } => ClaimType::Keybase,
            Claim::Name { .. } => ClaimType::Name,
            Claim::Storage { .. } => ClaimType::Storage,
        }
    }

    /// Creation timestamp, Unix seconds.
    pub fn timestamp(&self) -> i64 {
        match self {
            Claim::Account { timestamp, .. }
            | Claim::AttestationServiceUrl { timestamp, .. }
            | Claim::Domain { timestamp, .. }
            | Claim::Keybase { timestamp, .. }
            | Claim::Name { timestamp, .. }
            | Claim::Storage { timestamp, .. } => *timestamp,
        }
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Create an Account claim. Fails if the claimant claims itself.
pub fn create_account_claim(
    claimant: &Address,
    address: Address,
    public_key: Option<EncryptionPublicKey>,
) -> Result<Claim, MetadataError> {
    if address == *claimant {
        return Err(MetadataError::SelfClaim);
    }
    Ok(Claim::Account {
        timestamp: now(),
        address,
        public_key,
    })
}

/// Create an AttestationServiceUrl claim.
pub fn create_attestation_service_url_claim(url: impl Into<String>) -> Claim {
    Claim::AttestationServiceUrl {
        timestamp: now(),
        url: url.into(),
    }
}

/// Create a Domain claim.
pub fn create_domain_claim(domain: impl Into<String>) -> Claim {
    Claim::Domain {
        timestamp: now(),
        domain: domain.into(),
    }
}

/// Create a Keybase claim.
pub fn create_keybase_claim(username: impl Into<String>) -> Claim {
    Claim::Keybase {
        timestamp: now(),
        username: username.into(),
    }
}

/// Create a Name claim.
pub fn create_name_claim(name: impl Into<String>) -> Claim {
    Claim::Name {
        timestamp: now(),
        name: name.into(),
    }
}

/// Create a Storage claim pointing at a base URL. `filtered_data_paths`
/// restricts which paths live under this root (`.*` for all).
pub fn create_storage_claim(
    address: impl Into<String>,
    filtered_data_paths: impl Into<String>,
) -> Claim {
    Claim::Storage {
        timestamp: now(),
        address: address.into(),
        filtered_data_paths: filtered_data_paths.into(),
    }
}

/// Canonical serialized form of a claim.
pub fn serialize_claim(claim: &Claim) -> String {
    serde_json::to_string(claim).expect("claims serialize without failure")
}

/// SHA-256 of a claim's canonical serialization.
pub fn hash_of_claim(claim: &Claim) -> [u8; 32] {
    Sha256::digest(serialize_claim(claim).as_bytes()).into()
}

/// Deterministic hash of a claim sequence: SHA-256 over the concatenation
/// of the per-claim hashes, in document order.
pub fn hash_of_claims(claims: &[Claim]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for claim in claims {
        hasher.update(hash_of_claim(claim));
    }
    hasher.finalize().into()
}
