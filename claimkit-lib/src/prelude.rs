//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits for
//! quick setup. Import everything with:
//!
//! ```rust,ignore
//! use claimkit_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Core types: `Address`, `EncryptionPublicKey`, `OffchainDataWrapper`
//! - Error types: `OffchainError`, `SchemaError`, `CustodyError`
//! - Collaborator traits: `AccountRegistry`, `KeyCustody`, `MetadataFetcher`,
//!   `StorageWriter`
//! - Metadata: `IdentityMetadata`, `Claim`, `ClaimVerifier`
//! - Accessors: name, picture, and authorized-signer accessors

// Core types
pub use crate::{Address, EncryptionPublicKey};
pub use crate::wrapper::{AuthorizedSignerRecord, OffchainDataWrapper};

// Error handling
pub use crate::errors::{
    CustodyError, OffchainError, OffchainResult, SchemaError, SchemaResult,
};

// Collaborator traits
pub use crate::custody::KeyCustody;
pub use crate::fetcher::MetadataFetcher;
pub use crate::metadata::verify::DnsResolver;
pub use crate::registry::AccountRegistry;
pub use crate::storage::StorageWriter;

// Signing
pub use crate::signing::{SignatureEnvelope, SignedContent, SigningContext};

// Metadata and claims
pub use crate::metadata::verify::ClaimVerifier;
pub use crate::metadata::{Claim, ClaimType, IdentityMetadata};

// Encrypted data
pub use crate::encrypted::{read_encrypted, write_encrypted, KeyDistribution};

// Accessors
pub use crate::accessors::{
    AuthorizedSignerAccessor, NameAccessor, NamePayload, PictureAccessor,
    PrivateBinaryAccessor, PrivateNameAccessor, PublicBinaryAccessor, PublicSimpleAccessor,
};

// Built-in collaborators
pub use crate::custody::LocalKeystore;
pub use crate::storage::LocalStorageWriter;

// HTTP fetcher (when available)
#[cfg(feature = "http-fetch")]
pub use crate::fetcher::HttpFetcher;
