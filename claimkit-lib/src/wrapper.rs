//! The off-chain data wrapper: authenticated reads and writes against an
//! account's storage roots.
//!
//! Reads resolve the target account's metadata document, collect its Storage
//! claims, and race a verified fetch against every claimed root; the first
//! root to deliver an authentic object wins. Writes always go through the
//! caller's own storage writer and pair every object with a detached
//! signature at `<path>.signature`.

use std::sync::Arc;

use futures::future::{select_ok, try_join};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::accessors::authorized_signer::signer_record_path;
use crate::custody::KeyCustody;
use crate::errors::{OffchainError, OffchainResult};
use crate::fetcher::{resolve_path, FetchError, MetadataFetcher};
use crate::metadata::{ClaimType, IdentityMetadata, MetadataError};
use crate::registry::AccountRegistry;
use crate::signing::{signing_digest, SignatureEnvelope, SignedContent, SigningContext};
use crate::storage::StorageWriter;
use crate::Address;

/// How many delegation hops a signature may be removed from the account.
/// A data object may be signed by an authorized signer, but the record
/// authorizing that signer must be signed by the account key itself.
pub const MAX_SIGNER_DELEGATION_DEPTH: usize = 1;

/// The record published at `/account/authorizedSigners/<signer>` that
/// delegates signing authority to another key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedSignerRecord {
    /// The delegate signer's address.
    pub address: Address,
    /// Opaque proof that the account controls the delegate key.
    pub proof_of_possession: String,
    /// Regex restricting which data paths the delegate may sign.
    pub filtered_data_paths: String,
}

/// Entry point for authenticated off-chain reads and writes.
///
/// Cloning is cheap: collaborators are shared behind [`Arc`].
#[derive(Clone)]
pub struct OffchainDataWrapper {
    self_address: Address,
    signer: Address,
    context: SigningContext,
    registry: Arc<dyn AccountRegistry>,
    custody: Arc<dyn KeyCustody>,
    fetcher: Arc<dyn MetadataFetcher>,
    storage: Arc<dyn StorageWriter>,
}

impl OffchainDataWrapper {
    /// Create a wrapper signing as the account itself.
    pub fn new(
        self_address: Address,
        context: SigningContext,
        registry: Arc<dyn AccountRegistry>,
        custody: Arc<dyn KeyCustody>,
        fetcher: Arc<dyn MetadataFetcher>,
        storage: Arc<dyn StorageWriter>,
    ) -> Self {
        Self {
            self_address,
            signer: self_address,
            context,
            registry,
            custody,
            fetcher,
            storage,
        }
    }

    /// Use a delegate key for signing new writes. Readers will accept the
    /// delegate only once an authorized-signer record for it is published.
    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = signer;
        self
    }

    /// The account this wrapper acts for.
    pub fn self_address(&self) -> &Address {
        &self.self_address
    }

    /// The key writes are signed with.
    pub fn signer(&self) -> &Address {
        &self.signer
    }

    /// The signing domain separator in use.
    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    /// The account registry collaborator.
    pub fn registry(&self) -> &Arc<dyn AccountRegistry> {
        &self.registry
    }

    /// The key custody collaborator.
    pub fn custody(&self) -> &Arc<dyn KeyCustody> {
        &self.custody
    }

    /// The fetch collaborator.
    pub fn fetcher(&self) -> &Arc<dyn MetadataFetcher> {
        &self.fetcher
    }

    /// The storage writer for this wrapper's own root.
    pub fn storage(&self) -> &Arc<dyn StorageWriter> {
        &self.storage
    }

    /// Sign `content` at `path` with the configured signer key.
    pub async fn sign(
        &self,
        path: &str,
        content: SignedContent<'_>,
    ) -> OffchainResult<SignatureEnvelope> {
        let digest = signing_digest(&self.context, path, content);
        self.custody
            .sign_digest(&self.signer, &digest)
            .await
            .map_err(|e| OffchainError::InvalidSignature {
                path: format!("{path}: {e}"),
            })
    }

    /// Write `data` and its detached signature under the caller's own root.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, data, signature)))]
    pub async fn write_data(
        &self,
        data: &[u8],
        signature: &SignatureEnvelope,
        path: &str,
    ) -> OffchainResult<()> {
        self.storage.write(data, path).await?;
        self.storage
            .write(&signature.to_bytes(), &format!("{path}.signature"))
            .await
    }

    /// Read and verify `path` from `account`'s storage roots.
    ///
    /// All claimed roots are queried concurrently and the first authentic
    /// response wins. `binary` selects how the signature binds the content:
    /// by hash for opaque bytes, by canonical JSON for structured data.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn read_data_as_result(
        &self,
        account: &Address,
        path: &str,
        binary: bool,
    ) -> OffchainResult<Vec<u8>> {
        let roots = self.storage_roots(account).await?;
        if roots.is_empty() {
            return Err(OffchainError::NoStorageRootProvidedData { account: *account });
        }

        let reads = roots
            .iter()
            .map(|root| Box::pin(self.read_from_root(root, account, path, binary)))
            .collect::<Vec<_>>();
        let (data, _) = select_ok(reads).await?;
        Ok(data)
    }

    /// The storage roots `account` currently claims, in document order.
    pub async fn storage_roots(&self, account: &Address) -> OffchainResult<Vec<String>> {
        let url = self
            .registry
            .metadata_url(account)
            .await
            .ok_or(OffchainError::NoStorageRootProvidedData { account: *account })?;
        let metadata =
            IdentityMetadata::fetch_from_url(self.registry.as_ref(), self.fetcher.as_ref(), &url)
                .await
                .map_err(|e| match e {
                    MetadataError::Fetch { url, reason } => {
                        OffchainError::FetchError { url, reason }
                    }
                    other => OffchainError::InvalidSignature {
                        path: format!("{url}: {other}"),
                    },
                })?;

        Ok(metadata
            .filter_claims(ClaimType::Storage)
            .into_iter()
            .filter_map(|claim| match claim {
                crate::metadata::Claim::Storage { address, .. } => Some(address.clone()),
                _ => None,
            })
            .collect())
    }

    async fn read_from_root(
        &self,
        root: &str,
        account: &Address,
        path: &str,
        binary: bool,
    ) -> OffchainResult<Vec<u8>> {
        let (data, envelope) = self.fetch_with_signature(root, path).await?;
        let content = self.bind_content(&data, path, binary)?;
        let digest = signing_digest(&self.context, path, content_ref(&content));
        let signer = envelope.verify(&digest).map_err(|_| {
            OffchainError::InvalidSignature {
                path: path.to_string(),
            }
        })?;

        if signer == *account {
            return Ok(data);
        }
        self.verify_delegate(root, account, &signer, path).await?;
        Ok(data)
    }

    /// Check the one-hop delegation chain for a signature produced by a key
    /// other than the account: the same root must publish an authorized
    /// signer record for the key, signed directly by the account, whose
    /// path filter admits the object being read.
    async fn verify_delegate(
        &self,
        root: &str,
        account: &Address,
        signer: &Address,
        data_path: &str,
    ) -> OffchainResult<()> {
        let record_path = signer_record_path(signer);
        let (raw, envelope) = self.fetch_with_signature(root, &record_path).await?;

        let value: serde_json::Value = serde_json::from_slice(&raw).map_err(|_| {
            OffchainError::InvalidSignature {
                path: record_path.clone(),
            }
        })?;
        let digest = signing_digest(&self.context, &record_path, SignedContent::Structured(&value));
        let record_signer =
            envelope
                .verify(&digest)
                .map_err(|_| OffchainError::InvalidSignature {
                    path: record_path.clone(),
                })?;
        // Depth 1: the record itself must be account-signed, never
        // delegate-signed.
        if record_signer != *account {
            return Err(OffchainError::InvalidSignature { path: record_path });
        }

        let record: AuthorizedSignerRecord =
            serde_json::from_value(value).map_err(|_| OffchainError::InvalidSignature {
                path: record_path.clone(),
            })?;
        if record.address != *signer {
            return Err(OffchainError::InvalidSignature { path: record_path });
        }
        let filter = Regex::new(&record.filtered_data_paths).map_err(|_| {
            OffchainError::InvalidSignature {
                path: record_path.clone(),
            }
        })?;
        if !filter.is_match(data_path) {
            return Err(OffchainError::InvalidSignature {
                path: data_path.to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_with_signature(
        &self,
        root: &str,
        path: &str,
    ) -> OffchainResult<(Vec<u8>, SignatureEnvelope)> {
        let data_url = resolve_path(root, path);
        let signature_url = resolve_path(root, &format!("{path}.signature"));
        let (data, signature_bytes) = try_join(
            self.fetch_url(&data_url),
            self.fetch_url(&signature_url),
        )
        .await?;
        let envelope = SignatureEnvelope::from_bytes(&signature_bytes)?;
        Ok((data, envelope))
    }

    async fn fetch_url(&self, url: &str) -> OffchainResult<Vec<u8>> {
        self.fetcher
            .fetch(url)
            .await
            .map_err(|e: FetchError| OffchainError::FetchError {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn bind_content(
        &self,
        data: &[u8],
        path: &str,
        binary: bool,
    ) -> OffchainResult<BoundContent> {
        if binary {
            Ok(BoundContent::Binary(data.to_vec()))
        } else {
            let value: serde_json::Value = serde_json::from_slice(data).map_err(|_| {
                OffchainError::InvalidSignature {
                    path: path.to_string(),
                }
            })?;
            Ok(BoundContent::Structured(value))
        }
    }
}

enum BoundContent {
    Binary(Vec<u8>),
    Structured(serde_json::Value),
}

fn content_ref(content: &BoundContent) -> SignedContent<'_> {
    match content {
        BoundContent::Binary(bytes) => SignedContent::Binary(bytes),
        BoundContent::Structured(value) => SignedContent::Structured(value),
    }
}
