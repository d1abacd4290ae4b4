//! Claim verification: checking that a published claim is backed by
//! out-of-band evidence.
//!
//! Each verifier returns `Ok(())` when the evidence checks out and
//! `Err(diagnostic)` otherwise. The diagnostic is a human-readable reason,
//! not a typed error: callers surface it to operators, they do not branch
//! on it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{hash_of_claim, verify_signer_for_address, Claim, ClaimType, MetadataError};
use crate::custody::KeyCustody;
use crate::fetcher::MetadataFetcher;
use crate::registry::AccountRegistry;
use crate::signing::SignatureEnvelope;
use crate::Address;

/// Key of the TXT entry that proves a Domain claim.
pub const DOMAIN_TXT_HEADER: &str = "celo-site-verification";

/// Trait describing DNS TXT lookups for domain claim verification.
#[async_trait::async_trait]
pub trait DnsResolver: Send + Sync {
    /// All TXT record strings published for `domain`.
    async fn resolve_txt(&self, domain: &str) -> Result<Vec<String>, String>;
}

/// The proof document an account hosts on Keybase for a Keybase claim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeybaseProof {
    /// The claim being proven.
    pub claim: Claim,
    /// Signature over the claim hash by the claiming account.
    pub signature: SignatureEnvelope,
}

/// URL at which the proof for a Keybase claim must be hosted.
pub fn keybase_proof_url(username: &str, address: &Address) -> String {
    format!("https://{username}.keybase.pub/.well-known/celo/verify-{address}.claim")
}

/// Build the TXT entry (`celo-site-verification=<base64>`) that proves a
/// Domain claim: the metadata document's own signature over its claims
/// hash, republished on the domain.
///
/// The document must already be signed; re-sign it (add a claim) after
/// updating the TXT record, not before.
pub fn domain_txt_entry(metadata: &super::IdentityMetadata) -> Result<String, MetadataError> {
    let envelope = metadata
        .meta
        .signature
        .as_ref()
        .ok_or(MetadataError::InvalidSignature(metadata.meta.address))?;
    Ok(format!(
        "{DOMAIN_TXT_HEADER}={}",
        STANDARD.encode(envelope.to_bytes())
    ))
}

/// Build the proof document an account hosts to back a Keybase claim.
pub async fn create_keybase_proof(
    claim: Claim,
    custody: &dyn KeyCustody,
    signer: &Address,
) -> Result<KeybaseProof, MetadataError> {
    let digest = hash_of_claim(&claim);
    let signature = custody.sign_digest(signer, &digest).await?;
    Ok(KeybaseProof { claim, signature })
}

/// Verifier for published claims. Collaborators are injected so tests can
/// run against in-memory registries, hosts, and resolvers.
pub struct ClaimVerifier<'a> {
    registry: &'a dyn AccountRegistry,
    fetcher: &'a dyn MetadataFetcher,
    dns: &'a dyn DnsResolver,
}

impl<'a> ClaimVerifier<'a> {
    /// Create a verifier around the given collaborators.
    pub fn new(
        registry: &'a dyn AccountRegistry,
        fetcher: &'a dyn MetadataFetcher,
        dns: &'a dyn DnsResolver,
    ) -> Self {
        Self {
            registry,
            fetcher,
            dns,
        }
    }

    /// Verify a claim published by `address` against its evidence.
    ///
    /// Claim types with no external evidence (Name, AttestationServiceUrl,
    /// Storage) verify vacuously.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, claim)))]
    pub async fn verify_claim(&self, claim: &Claim, address: &Address) -> Result<(), String> {
        match claim {
            Claim::Account {
                address: claimed, ..
            } => self.verify_account_claim(address, claimed).await,
            Claim::Domain { domain, .. } => self.verify_domain_claim(address, domain).await,
            Claim::Keybase { username, .. } => {
                self.verify_keybase_claim(address, username).await
            }
            _ => Ok(()),
        }
    }

    /// An Account claim verifies when the claimed account publishes a
    /// reciprocal Account claim naming the claimant.
    pub async fn verify_account_claim(
        &self,
        claimant: &Address,
        claimed: &Address,
    ) -> Result<(), String> {
        let url = self
            .registry
            .metadata_url(claimed)
            .await
            .ok_or_else(|| format!("{claimed} has no metadata URL registered"))?;
        let metadata = super::IdentityMetadata::fetch_from_url(self.registry, self.fetcher, &url)
            .await
            .map_err(|e| format!("could not load metadata of {claimed}: {e}"))?;

        let reciprocal = metadata
            .filter_claims(ClaimType::Account)
            .into_iter()
            .any(|c| matches!(c, Claim::Account { address, .. } if address == claimant));
        if reciprocal {
            Ok(())
        } else {
            Err(format!("{claimed} does not claim {claimant} back"))
        }
    }

    /// A Domain claim verifies when the domain publishes a TXT entry
    /// `celo-site-verification=<base64 envelope>` whose signature over the
    /// claimant's current claims hash was produced by the claimant or one
    /// of its signers.
    pub async fn verify_domain_claim(
        &self,
        claimant: &Address,
        domain: &str,
    ) -> Result<(), String> {
        let url = self
            .registry
            .metadata_url(claimant)
            .await
            .ok_or_else(|| format!("{claimant} has no metadata URL registered"))?;
        let metadata = super::IdentityMetadata::fetch_from_url(self.registry, self.fetcher, &url)
            .await
            .map_err(|e| format!("could not load metadata of {claimant}: {e}"))?;
        let digest = metadata.hash_of_claims();

        let records = self
            .dns
            .resolve_txt(domain)
            .await
            .map_err(|e| format!("TXT lookup for {domain} failed: {e}"))?;

        for record in &records {
            let Some(encoded) = record.strip_prefix(DOMAIN_TXT_HEADER).and_then(|r| r.strip_prefix('='))
            else {
                continue;
            };
            let Ok(raw) = STANDARD.decode(encoded.trim()) else {
                continue;
            };
            let Ok(envelope) = SignatureEnvelope::from_bytes(&raw) else {
                continue;
            };
            if verify_signer_for_address(self.registry, &digest, &envelope, claimant).await {
                return Ok(());
            }
        }
        Err(format!(
            "no valid {DOMAIN_TXT_HEADER} TXT entry found on {domain}"
        ))
    }

    /// A Keybase claim verifies when the username hosts a proof document
    /// whose signature over the claim hash was produced by the claimant.
    pub async fn verify_keybase_claim(
        &self,
        claimant: &Address,
        username: &str,
    ) -> Result<(), String> {
        let url = keybase_proof_url(username, claimant);
        let raw = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| format!("proof fetch from {url} failed: {e}"))?;
        let proof: KeybaseProof = serde_json::from_slice(&raw)
            .map_err(|e| format!("proof at {url} is malformed: {e}"))?;

        match &proof.claim {
            Claim::Keybase {
                username: proven, ..
            } if proven == username => {}
            _ => return Err(format!("proof at {url} is for a different claim")),
        }

        let digest = hash_of_claim(&proof.claim);
        if verify_signer_for_address(self.registry, &digest, &proof.signature, claimant).await {
            Ok(())
        } else {
            Err(format!("proof at {url} is not signed by {claimant}"))
        }
    }
}
