//! Authorized signer records: one-hop signing delegation.
//!
//! An account publishes a record at `/account/authorizedSigners/<signer>`
//! to let `signer` sign data objects on its behalf. The record must itself
//! be signed by the account key; readers enforce that when they encounter a
//! delegate-signed object.

use crate::errors::{SchemaError, SchemaResult};
use crate::signing::SignedContent;
use crate::wrapper::{AuthorizedSignerRecord, OffchainDataWrapper};
use crate::Address;

/// Base path for authorized signer records.
pub const AUTHORIZED_SIGNERS_BASE: &str = "/account/authorizedSigners";

/// The record path for a delegate signer.
pub fn signer_record_path(signer: &Address) -> String {
    format!("{AUTHORIZED_SIGNERS_BASE}/{signer}")
}

/// Accessor for authorized signer records.
pub struct AuthorizedSignerAccessor {
    wrapper: OffchainDataWrapper,
}

impl AuthorizedSignerAccessor {
    /// Create the accessor.
    pub fn new(wrapper: OffchainDataWrapper) -> Self {
        Self { wrapper }
    }

    /// Read and verify the record `account` published for `signer`.
    pub async fn read(
        &self,
        account: &Address,
        signer: &Address,
    ) -> SchemaResult<AuthorizedSignerRecord> {
        let path = signer_record_path(signer);
        let data = self
            .wrapper
            .read_data_as_result(account, &path, false)
            .await?;
        serde_json::from_slice(&data).map_err(|_| SchemaError::InvalidDataError)
    }

    /// Publish a record delegating signing authority to `signer` for paths
    /// matching `filtered_data_paths`.
    ///
    /// The record is always signed with the account key, regardless of the
    /// wrapper's configured signer: delegation depth is capped at one hop,
    /// so a delegate cannot mint further delegates.
    pub async fn write(
        &self,
        signer: &Address,
        proof_of_possession: impl Into<String>,
        filtered_data_paths: impl Into<String>,
    ) -> SchemaResult<()> {
        let record = AuthorizedSignerRecord {
            address: *signer,
            proof_of_possession: proof_of_possession.into(),
            filtered_data_paths: filtered_data_paths.into(),
        };
        let path = signer_record_path(signer);
        let value = serde_json::to_value(&record)?;
        let data = serde_json::to_vec(&value)?;

        let account_signed = self
            .wrapper
            .clone()
            .with_signer(*self.wrapper.self_address());
        let signature = account_signed
            .sign(&path, SignedContent::Structured(&value))
            .await?;
        account_signed.write_data(&data, &signature, &path).await?;
        Ok(())
    }
}
