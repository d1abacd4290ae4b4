//! Typed accessors over conventional data paths.
//!
//! An accessor binds a schema to a path: generic public/private accessors
//! for structured and binary data, plus the concrete well-known ones
//! (display name, picture, authorized signer records). Public accessors
//! verify authenticity; private accessors additionally encrypt to a
//! recipient set.

pub mod authorized_signer;
pub mod binary;
pub mod simple;

pub use authorized_signer::{signer_record_path, AuthorizedSignerAccessor, AUTHORIZED_SIGNERS_BASE};
pub use binary::{PictureAccessor, PrivateBinaryAccessor, PublicBinaryAccessor};
pub use simple::{
    NameAccessor, NamePayload, PrivateNameAccessor, PrivateSimpleAccessor, PublicSimpleAccessor,
};
