//! Cryptographic primitives for the off-chain data protocol.
//!
//! Three building blocks:
//!
//! - [`label`]: unlinkable ciphertext path derivation from a shared secret.
//! - [`symmetric`]: AES-128-CTR payload encryption (`IV ‖ ciphertext`).
//! - [`ecies`]: single-recipient integrated encryption (ephemeral x25519 +
//!   HKDF-SHA256 + AES-128-CTR + HMAC-SHA256), used to wrap content keys.
//!
//! These constants and wire formats are protocol version 1; all clients must
//! use identical formats for reader and writer to interoperate.

pub mod ecies;
pub mod label;
pub mod symmetric;

pub use ecies::{ecies_decrypt, ecies_encrypt};
pub use label::{ciphertext_label, ciphertext_path, CIPHERTEXT_DIR};
pub use symmetric::{symmetric_decrypt, symmetric_encrypt, IV_LENGTH, KEY_LENGTH};
