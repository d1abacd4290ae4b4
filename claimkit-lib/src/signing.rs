//! Structured signing payloads and detached signature envelopes.
//!
//! Every stored object is accompanied by a detached signature over a
//! domain-separated, typed payload that binds the logical path to the
//! content: the SHA-256 hash of the bytes for binary content, or the parsed
//! JSON value for structured content. A validly signed object therefore
//! cannot be replayed at a different path, nor across unrelated applications
//! sharing the same keys.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{OffchainError, OffchainResult};
use crate::Address;

/// Name of the signing domain, fixed per protocol version.
pub const SIGNING_DOMAIN_NAME: &str = "CIP8 Claim";

/// Version of the signing domain.
pub const SIGNING_DOMAIN_VERSION: &str = "1.0.0";

/// Domain separator for typed signing payloads.
///
/// The chain id distinguishes otherwise identical deployments so a signature
/// produced for one network cannot be replayed on another.
#[derive(Clone, Debug, Serialize)]
pub struct SigningContext {
    /// Domain name, fixed per protocol version.
    pub name: &'static str,
    /// Domain version.
    pub version: &'static str,
    /// Chain identifier of the deployment.
    pub chain_id: u64,
}

impl SigningContext {
    /// Build the signing context for a chain id.
    pub fn new(chain_id: u64) -> Self {
        Self {
            name: SIGNING_DOMAIN_NAME,
            version: SIGNING_DOMAIN_VERSION,
            chain_id,
        }
    }
}

/// The content half of a typed signing payload.
pub enum SignedContent<'a> {
    /// Raw bytes; bound by their SHA-256 hash.
    Binary(&'a [u8]),
    /// Parsed structured content; bound by its canonical JSON form.
    Structured(&'a serde_json::Value),
}

#[derive(Serialize)]
struct TypedPayload<'a> {
    domain: &'a SigningContext,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a serde_json::Value>,
}

/// Compute the digest that gets signed for `(path, content)` under `context`.
///
/// Canonical JSON serialization keeps this deterministic: object keys are
/// ordered, so writer and verifier reach the same digest from independently
/// parsed values.
pub fn signing_digest(context: &SigningContext, path: &str, content: SignedContent<'_>) -> [u8; 32] {
    let typed = match content {
        SignedContent::Binary(bytes) => TypedPayload {
            domain: context,
            path,
            hash: Some(hex::encode(Sha256::digest(bytes))),
            payload: None,
        },
        SignedContent::Structured(value) => TypedPayload {
            domain: context,
            path,
            hash: None,
            payload: Some(value),
        },
    };
    let serialized =
        serde_json::to_vec(&typed).expect("typed payloads serialize without failure");
    Sha256::digest(&serialized).into()
}

/// Detached signature stored at `<path>.signature`.
///
/// Carries the signer's public key so a verifier can derive the candidate
/// signer address; ed25519 has no signer recovery, so the envelope makes the
/// claim explicit and the signature proves it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    /// Base64 of the signer's 32-byte ed25519 public key.
    pub public_key: String,
    /// Base64 of the 64-byte signature over the signing digest.
    pub signature: String,
}

impl SignatureEnvelope {
    /// Sign a digest with an ed25519 key.
    pub fn sign(key: &SigningKey, digest: &[u8; 32]) -> Self {
        let signature = key.sign(digest);
        Self {
            public_key: STANDARD.encode(key.verifying_key().as_bytes()),
            signature: STANDARD.encode(signature.to_bytes()),
        }
    }

    /// The address of the key that produced this envelope.
    pub fn signer_address(&self) -> OffchainResult<Address> {
        Ok(Address::from_public_key(self.verifying_key()?.as_bytes()))
    }

    /// Verify the signature over `digest` and return the signer's address.
    pub fn verify(&self, digest: &[u8; 32]) -> OffchainResult<Address> {
        let key = self.verifying_key()?;
        let raw = STANDARD
            .decode(&self.signature)
            .map_err(|_| malformed("signature is not valid base64"))?;
        let bytes: [u8; 64] = raw
            .as_slice()
            .try_into()
            .map_err(|_| malformed("signature has wrong length"))?;
        key.verify(digest, &Signature::from_bytes(&bytes))
            .map_err(|_| malformed("signature does not verify"))?;
        Ok(Address::from_public_key(key.as_bytes()))
    }

    /// Serialize to the stored JSON form.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("envelopes serialize without failure")
    }

    /// Parse the stored JSON form.
    pub fn from_bytes(bytes: &[u8]) -> OffchainResult<Self> {
        serde_json::from_slice(bytes).map_err(|_| malformed("signature envelope is not valid JSON"))
    }

    fn verifying_key(&self) -> OffchainResult<VerifyingKey> {
        let raw = STANDARD
            .decode(&self.public_key)
            .map_err(|_| malformed("public key is not valid base64"))?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| malformed("public key has wrong length"))?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| malformed("public key is not a valid point"))
    }
}

fn malformed(reason: &str) -> OffchainError {
    OffchainError::InvalidSignature {
        path: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn context() -> SigningContext {
        SigningContext::new(42)
    }

    #[test]
    fn binary_digest_binds_path_and_content() {
        let ctx = context();
        let base = signing_digest(&ctx, "/account/picture", SignedContent::Binary(b"img"));
        let other_path = signing_digest(&ctx, "/account/name", SignedContent::Binary(b"img"));
        let other_content = signing_digest(&ctx, "/account/picture", SignedContent::Binary(b"gmi"));
        assert_ne!(base, other_path);
        assert_ne!(base, other_content);
    }

    #[test]
    fn structured_digest_is_stable_across_reparse() {
        let ctx = context();
        let value: serde_json::Value = serde_json::from_str(r#"{"name":"test","age":3}"#).unwrap();
        let reparsed: serde_json::Value =
            serde_json::from_str(r#"{"age":3,"name":"test"}"#).unwrap();
        assert_eq!(
            signing_digest(&ctx, "/p", SignedContent::Structured(&value)),
            signing_digest(&ctx, "/p", SignedContent::Structured(&reparsed))
        );
    }

    #[test]
    fn digest_differs_across_chains() {
        let value = serde_json::json!({"name": "test"});
        assert_ne!(
            signing_digest(&SigningContext::new(1), "/p", SignedContent::Structured(&value)),
            signing_digest(&SigningContext::new(2), "/p", SignedContent::Structured(&value))
        );
    }

    #[test]
    fn envelope_round_trip_and_verify() {
        let key = SigningKey::generate(&mut OsRng);
        let digest = signing_digest(&context(), "/p", SignedContent::Binary(b"data"));
        let envelope = SignatureEnvelope::sign(&key, &digest);

        let parsed = SignatureEnvelope::from_bytes(&envelope.to_bytes()).unwrap();
        let signer = parsed.verify(&digest).unwrap();
        assert_eq!(signer, Address::from_public_key(key.verifying_key().as_bytes()));
    }

    #[test]
    fn flipped_signature_bit_fails_verification() {
        let key = SigningKey::generate(&mut OsRng);
        let digest = signing_digest(&context(), "/p", SignedContent::Binary(b"data"));
        let mut envelope = SignatureEnvelope::sign(&key, &digest);

        let mut raw = STANDARD.decode(&envelope.signature).unwrap();
        raw[10] ^= 1;
        envelope.signature = STANDARD.encode(raw);

        assert!(envelope.verify(&digest).is_err());
    }

    #[test]
    fn wrong_digest_fails_verification() {
        let key = SigningKey::generate(&mut OsRng);
        let digest = signing_digest(&context(), "/p", SignedContent::Binary(b"data"));
        let envelope = SignatureEnvelope::sign(&key, &digest);

        let other = signing_digest(&context(), "/p", SignedContent::Binary(b"tampered"));
        assert!(envelope.verify(&other).is_err());
    }
}
