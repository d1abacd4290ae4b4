//! Unlinkable ciphertext path derivation.
//!
//! `label = PRF(ECDH(A, B), A ‖ B ‖ data path)` where the PRF is
//! HMAC-SHA256 keyed with the ECDH shared secret. The physical storage path
//! is `ciphertexts/<base64url(label)>`.
//!
//! Both parties compute the same label independently because ECDH is
//! symmetric: `shared(a_priv, b_pub) == shared(b_priv, a_pub)`. If either
//! party's registered public key changes, previously written labels become
//! unreachable by the new key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::EncryptionPublicKey;

type HmacSha256 = Hmac<Sha256>;

/// Directory under which all derived ciphertext objects live.
pub const CIPHERTEXT_DIR: &str = "ciphertexts";

/// Derive the label for `(sender, receiver, path)` under a shared secret.
///
/// Deterministic for identical inputs and non-invertible without the shared
/// secret, so unrelated observers cannot correlate it to the logical path.
pub fn ciphertext_label(
    path: &str,
    shared_secret: &[u8],
    sender: &EncryptionPublicKey,
    receiver: &EncryptionPublicKey,
) -> String {
    let mut mac =
        HmacSha256::new_from_slice(shared_secret).expect("HMAC accepts keys of any length");
    mac.update(sender.as_bytes());
    mac.update(receiver.as_bytes());
    mac.update(path.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// The full storage path for a derived label: `ciphertexts/<label>`.
pub fn ciphertext_path(
    path: &str,
    shared_secret: &[u8],
    sender: &EncryptionPublicKey,
    receiver: &EncryptionPublicKey,
) -> String {
    format!(
        "{}/{}",
        CIPHERTEXT_DIR,
        ciphertext_label(path, shared_secret, sender, receiver)
    )
}
