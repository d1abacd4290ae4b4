//! Error types for off-chain data operations.
//!
//! Errors are modeled as closed, tagged sets per layer: transport-level
//! failures (`OffchainError`), schema-level failures (`SchemaError`), and
//! key-custody failures (`CustodyError`). Expected conditions always travel
//! as error values, never as panics.

use crate::Address;

/// Transport-level error for reads and writes against storage roots.
#[derive(Debug, thiserror::Error)]
pub enum OffchainError {
    /// A fetch against a storage root or metadata URL failed.
    #[error("fetch failed for {url}: {reason}")]
    FetchError {
        /// The URL that failed to resolve.
        url: String,
        /// Underlying failure description.
        reason: String,
    },

    /// The object or its detached signature failed authenticity checks.
    #[error("invalid signature for {path}")]
    InvalidSignature {
        /// The logical data path whose verification failed.
        path: String,
    },

    /// The account has no storage roots configured at all.
    ///
    /// Distinct from a transient `FetchError`: retrying other roots cannot
    /// help because there are none.
    #[error("no storage root of {account} provided data")]
    NoStorageRootProvidedData {
        /// The account whose metadata lacks storage claims.
        account: Address,
    },

    /// A write through the caller's own storage writer failed.
    #[error("storage write failed: {0}")]
    Storage(String),

    /// Serialization or deserialization of a protocol object failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl OffchainError {
    /// Returns true if this error is potentially recoverable by retrying
    /// (possibly against another storage root).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchError { .. } | Self::Storage(_))
    }
}

impl From<serde_json::Error> for OffchainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for transport-level operations.
pub type OffchainResult<T> = std::result::Result<T, OffchainError>;

/// Error for typed (schema) accessors and the encryption engine.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The fetched bytes were authentic but did not match the schema.
    #[error("invalid data")]
    InvalidDataError,

    /// The underlying transport failed.
    #[error(transparent)]
    Offchain(#[from] OffchainError),

    /// The reader's decryption key is not held locally. Recoverable once
    /// the key is imported.
    #[error("no local key material available for {0}")]
    UnavailableKey(Address),

    /// A wrapped symmetric key was recovered with the wrong length.
    /// This indicates data corruption and is fatal.
    #[error("invalid symmetric key length {length}, expected {expected}")]
    InvalidKey {
        /// Length of the recovered key in bytes.
        length: usize,
        /// The protocol's fixed key length.
        expected: usize,
    },

    /// An encryption or decryption primitive failed (e.g. MAC mismatch).
    #[error("encryption error: {0}")]
    Encryption(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(_: serde_json::Error) -> Self {
        Self::InvalidDataError
    }
}

impl From<CustodyError> for SchemaError {
    fn from(err: CustodyError) -> Self {
        match err {
            CustodyError::UnknownAccount(address) => Self::UnavailableKey(address),
            CustodyError::Decryption(msg) => Self::Encryption(msg),
        }
    }
}

/// Result alias for schema-level operations.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Error from the key-custody collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    /// The custody holds no private key for the given address.
    #[error("no key material for {0}")]
    UnknownAccount(Address),

    /// Decryption with a held key failed.
    #[error("decryption failed: {0}")]
    Decryption(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_are_retryable() {
        let err = OffchainError::FetchError {
            url: "http://example.com/root/account/name".into(),
            reason: "connection refused".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn signature_errors_are_not_retryable() {
        let err = OffchainError::InvalidSignature {
            path: "/account/name".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn custody_unknown_account_maps_to_unavailable_key() {
        let address: Address = "0x0000000000000000000000000000000000000001"
            .parse()
            .unwrap();
        let err: SchemaError = CustodyError::UnknownAccount(address).into();
        assert!(matches!(err, SchemaError::UnavailableKey(a) if a == address));
    }
}
