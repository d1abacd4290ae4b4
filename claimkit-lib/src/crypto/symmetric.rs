//! Symmetric payload encryption.
//!
//! Payloads are encrypted with AES-128-CTR under a 16-byte content key and a
//! freshly random 16-byte IV, and stored as `IV ‖ ciphertext` at
//! `<path>.enc`. Integrity comes from the detached signature over the full
//! stored payload, not from the cipher itself.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use rand::RngCore;

use crate::errors::SchemaError;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Fixed content-key length in bytes.
pub const KEY_LENGTH: usize = 16;

/// IV length in bytes.
pub const IV_LENGTH: usize = 16;

/// Encrypt `data` under `key` with a freshly random IV.
///
/// Returns the stored payload `IV ‖ ciphertext`.
pub fn symmetric_encrypt(key: &[u8; KEY_LENGTH], data: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; IV_LENGTH];
    rand::thread_rng().fill_bytes(&mut iv);

    let mut out = Vec::with_capacity(IV_LENGTH + data.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(data);

    let mut cipher = Aes128Ctr::new(key.into(), (&iv).into());
    cipher.apply_keystream(&mut out[IV_LENGTH..]);
    out
}

/// Decrypt a stored `IV ‖ ciphertext` payload under `key`.
pub fn symmetric_decrypt(key: &[u8; KEY_LENGTH], payload: &[u8]) -> Result<Vec<u8>, SchemaError> {
    if payload.len() < IV_LENGTH {
        return Err(SchemaError::InvalidDataError);
    }
    let (iv, ciphertext) = payload.split_at(IV_LENGTH);
    let mut plaintext = ciphertext.to_vec();
    let mut cipher = Aes128Ctr::new(key.into(), iv.into());
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}
