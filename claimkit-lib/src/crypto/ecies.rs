//! Integrated encryption to a single recipient.
//!
//! Ephemeral x25519 ECDH, HKDF-SHA256 key derivation, AES-128-CTR, and an
//! HMAC-SHA256 tag. Used to wrap short payloads (typically a 16-byte content
//! key) to a recipient's data-encryption key.
//!
//! # Wire format
//!
//! ```text
//! [32 bytes ephemeral pubkey][16 bytes IV][N bytes ciphertext][32 bytes MAC]
//! ```
//!
//! The MAC covers `IV ‖ ciphertext`.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::EncryptionPublicKey;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type HmacSha256 = Hmac<Sha256>;

const EPHEMERAL_LENGTH: usize = 32;
const IV_LENGTH: usize = 16;
const MAC_LENGTH: usize = 32;
const KDF_INFO: &[u8] = b"claimkit-ecies-v1";

/// Errors from the integrated encryption scheme.
#[derive(Debug, thiserror::Error)]
pub enum EciesError {
    /// Ciphertext shorter than the minimum wire size.
    #[error("ciphertext too short")]
    TooShort,
    /// Authentication tag did not verify.
    #[error("MAC verification failed")]
    MacMismatch,
}

/// Derive the cipher and MAC keys for a shared point.
fn derive_keys(shared: &[u8]) -> ([u8; 16], [u8; 32]) {
    let hk = Hkdf::<Sha256>::new(None, shared);
    let mut okm = [0u8; 48];
    hk.expand(KDF_INFO, &mut okm)
        .expect("48 bytes is a valid HKDF-SHA256 output length");
    let mut enc_key = [0u8; 16];
    let mut mac_key = [0u8; 32];
    enc_key.copy_from_slice(&okm[..16]);
    mac_key.copy_from_slice(&okm[16..]);
    (enc_key, mac_key)
}

/// Encrypt `plaintext` to `recipient`'s public key.
pub fn ecies_encrypt(recipient: &EncryptionPublicKey, plaintext: &[u8]) -> Vec<u8> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&PublicKey::from(*recipient));
    let (enc_key, mac_key) = derive_keys(shared.as_bytes());

    let mut iv = [0u8; IV_LENGTH];
    rand::thread_rng().fill_bytes(&mut iv);

    let mut ciphertext = plaintext.to_vec();
    let mut cipher = Aes128Ctr::new((&enc_key).into(), (&iv).into());
    cipher.apply_keystream(&mut ciphertext);

    let mut mac = HmacSha256::new_from_slice(&mac_key).expect("HMAC accepts keys of any length");
    mac.update(&iv);
    mac.update(&ciphertext);
    let tag = mac.finalize().into_bytes();

    let mut out = Vec::with_capacity(EPHEMERAL_LENGTH + IV_LENGTH + ciphertext.len() + MAC_LENGTH);
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&tag);
    out
}

/// Decrypt an [`ecies_encrypt`] payload with the recipient's secret key.
pub fn ecies_decrypt(secret: &StaticSecret, payload: &[u8]) -> Result<Vec<u8>, EciesError> {
    if payload.len() < EPHEMERAL_LENGTH + IV_LENGTH + MAC_LENGTH {
        return Err(EciesError::TooShort);
    }

    let mut ephemeral_bytes = [0u8; 32];
    ephemeral_bytes.copy_from_slice(&payload[..EPHEMERAL_LENGTH]);
    let ephemeral_public = PublicKey::from(ephemeral_bytes);

    let iv = &payload[EPHEMERAL_LENGTH..EPHEMERAL_LENGTH + IV_LENGTH];
    let ciphertext = &payload[EPHEMERAL_LENGTH + IV_LENGTH..payload.len() - MAC_LENGTH];
    let tag = &payload[payload.len() - MAC_LENGTH..];

    let shared = secret.diffie_hellman(&ephemeral_public);
    let (enc_key, mac_key) = derive_keys(shared.as_bytes());

    let mut mac = HmacSha256::new_from_slice(&mac_key).expect("HMAC accepts keys of any length");
    mac.update(iv);
    mac.update(ciphertext);
    mac.verify_slice(tag).map_err(|_| EciesError::MacMismatch)?;

    let mut plaintext = ciphertext.to_vec();
    let mut cipher = Aes128Ctr::new((&enc_key).into(), iv.into());
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> (StaticSecret, EncryptionPublicKey) {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = EncryptionPublicKey::from(PublicKey::from(&secret));
        (secret, public)
    }

    #[test]
    fn round_trip() {
        let (secret, public) = recipient();
        let payload = ecies_encrypt(&public, b"sixteen byte key");
        let plaintext = ecies_decrypt(&secret, &payload).unwrap();
        assert_eq!(plaintext, b"sixteen byte key");
    }

    #[test]
    fn tampering_is_detected() {
        let (secret, public) = recipient();
        let mut payload = ecies_encrypt(&public, b"sixteen byte key");
        let mid = EPHEMERAL_LENGTH + IV_LENGTH + 3;
        payload[mid] ^= 1;
        assert!(matches!(
            ecies_decrypt(&secret, &payload),
            Err(EciesError::MacMismatch)
        ));
    }

    #[test]
    fn wrong_recipient_fails_mac() {
        let (_, public) = recipient();
        let (other_secret, _) = recipient();
        let payload = ecies_encrypt(&public, b"sixteen byte key");
        assert!(ecies_decrypt(&other_secret, &payload).is_err());
    }

    #[test]
    fn short_payload_rejected() {
        let (secret, _) = recipient();
        assert!(matches!(
            ecies_decrypt(&secret, &[0u8; 10]),
            Err(EciesError::TooShort)
        ));
    }
}
