//! Private data: symmetric payload encryption with per-recipient key
//! distribution.
//!
//! A payload at `path` is encrypted once under a 16-byte content key and
//! stored at `<path>.enc`; the content key is then wrapped separately to
//! every recipient's data-encryption key and stored under an unlinkable
//! derived label. The writer is always a recipient of its own key so the
//! same content key can be reused when the payload is rewritten or shared
//! with additional recipients later.

use futures::future::join_all;
use rand::RngCore;

use crate::crypto::{
    ciphertext_path, ecies_encrypt, symmetric_decrypt, symmetric_encrypt, KEY_LENGTH,
};
use crate::errors::{OffchainError, SchemaError, SchemaResult};
use crate::signing::SignedContent;
use crate::wrapper::OffchainDataWrapper;
use crate::{Address, EncryptionPublicKey};

/// Per-recipient report of a key distribution round.
///
/// Distribution is not transactional: one recipient's missing encryption
/// key must not block the others, so each outcome is reported individually.
#[derive(Debug)]
pub struct KeyDistribution {
    /// One entry per recipient, in distribution order.
    pub outcomes: Vec<(Address, SchemaResult<()>)>,
}

impl KeyDistribution {
    /// True when every recipient received a wrapped key.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|(_, result)| result.is_ok())
    }

    /// The recipients whose distribution failed.
    pub fn failures(&self) -> Vec<&Address> {
        self.outcomes
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(address, _)| address)
            .collect()
    }
}

/// Encrypt `data` at `data_path` and distribute the content key to `to`.
///
/// When `symmetric_key` is `None`, the writer's previously stored content
/// key for this path is reused if one exists; a fresh key is generated only
/// when none is recoverable. Reuse keeps earlier recipients able to read
/// rewritten payloads without redistribution.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(skip(wrapper, data, symmetric_key))
)]
pub async fn write_encrypted(
    wrapper: &OffchainDataWrapper,
    data_path: &str,
    data: &[u8],
    to: &[Address],
    symmetric_key: Option<[u8; KEY_LENGTH]>,
) -> SchemaResult<KeyDistribution> {
    let key = match symmetric_key {
        Some(key) => key,
        None => fetch_or_generate_key(wrapper, data_path).await?,
    };

    let payload = symmetric_encrypt(&key, data);
    let payload_path = format!("{data_path}.enc");
    let signature = wrapper
        .sign(&payload_path, SignedContent::Binary(&payload))
        .await?;
    wrapper.write_data(&payload, &signature, &payload_path).await?;

    Ok(write_symmetric_keys(wrapper, data_path, &key, to).await)
}

/// Wrap the content key for `data_path` to each recipient in `to`, plus the
/// writer itself, and store each copy under its derived label.
pub async fn write_symmetric_keys(
    wrapper: &OffchainDataWrapper,
    data_path: &str,
    key: &[u8; KEY_LENGTH],
    to: &[Address],
) -> KeyDistribution {
    let me = *wrapper.self_address();
    let mut recipients = vec![me];
    recipients.extend(to.iter().copied().filter(|r| *r != me));

    let writes = recipients
        .iter()
        .map(|recipient| async move {
            let result = distribute_to(wrapper, data_path, key, recipient).await;
            (*recipient, result)
        })
        .collect::<Vec<_>>();
    KeyDistribution {
        outcomes: join_all(writes).await,
    }
}

async fn distribute_to(
    wrapper: &OffchainDataWrapper,
    data_path: &str,
    key: &[u8; KEY_LENGTH],
    recipient: &Address,
) -> SchemaResult<()> {
    let (sender_pub, sender_key_address) = own_encryption_key(wrapper).await?;
    let recipient_pub = wrapper
        .registry()
        .data_encryption_key(recipient)
        .await
        .ok_or(SchemaError::UnavailableKey(*recipient))?;

    let shared = wrapper
        .custody()
        .compute_shared_secret(&sender_key_address, &recipient_pub)
        .await
        .map_err(|_| SchemaError::UnavailableKey(*wrapper.self_address()))?;
    let label_path = ciphertext_path(
        &format!("{data_path}.key"),
        &shared,
        &sender_pub,
        &recipient_pub,
    );

    let wrapped = ecies_encrypt(&recipient_pub, key);
    let signature = wrapper
        .sign(&label_path, SignedContent::Binary(&wrapped))
        .await?;
    wrapper.write_data(&wrapped, &signature, &label_path).await?;
    Ok(())
}

/// Recover the content key `sender` wrapped to this wrapper's account for
/// `data_path`.
pub async fn read_symmetric_key(
    wrapper: &OffchainDataWrapper,
    sender: &Address,
    data_path: &str,
) -> SchemaResult<[u8; KEY_LENGTH]> {
    let (my_pub, my_key_address) = own_encryption_key(wrapper).await?;
    let sender_pub = wrapper
        .registry()
        .data_encryption_key(sender)
        .await
        .ok_or(SchemaError::UnavailableKey(*sender))?;

    let shared = wrapper
        .custody()
        .compute_shared_secret(&my_key_address, &sender_pub)
        .await
        .map_err(|_| SchemaError::UnavailableKey(*wrapper.self_address()))?;
    let label_path = ciphertext_path(&format!("{data_path}.key"), &shared, &sender_pub, &my_pub);

    let wrapped = wrapper
        .read_data_as_result(sender, &label_path, true)
        .await?;
    let raw = wrapper
        .custody()
        .decrypt(&my_key_address, &wrapped)
        .await?;
    raw.as_slice()
        .try_into()
        .map_err(|_| SchemaError::InvalidKey {
            length: raw.len(),
            expected: KEY_LENGTH,
        })
}

/// Read and decrypt the payload `sender` published at `data_path`.
///
/// Payload and wrapped key are fetched concurrently; both must verify.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(wrapper)))]
pub async fn read_encrypted(
    wrapper: &OffchainDataWrapper,
    sender: &Address,
    data_path: &str,
) -> SchemaResult<Vec<u8>> {
    let payload_path = format!("{data_path}.enc");
    let (payload, key) = futures::try_join!(
        async {
            wrapper
                .read_data_as_result(sender, &payload_path, true)
                .await
                .map_err(SchemaError::from)
        },
        read_symmetric_key(wrapper, sender, data_path),
    )?;
    symmetric_decrypt(&key, &payload)
}

/// Reuse the writer's stored content key for `data_path`, generating a
/// fresh one only when no copy is recoverable.
///
/// Only absence regenerates (nothing stored yet, or no storage roots);
/// any other failure is surfaced so a corrupt or unreadable key is never
/// silently replaced.
pub async fn fetch_or_generate_key(
    wrapper: &OffchainDataWrapper,
    data_path: &str,
) -> SchemaResult<[u8; KEY_LENGTH]> {
    match read_symmetric_key(wrapper, wrapper.self_address(), data_path).await {
        Ok(key) => Ok(key),
        Err(SchemaError::Offchain(
            OffchainError::FetchError { .. } | OffchainError::NoStorageRootProvidedData { .. },
        )) => {
            let mut key = [0u8; KEY_LENGTH];
            rand::thread_rng().fill_bytes(&mut key);
            Ok(key)
        }
        Err(other) => Err(other),
    }
}

async fn own_encryption_key(
    wrapper: &OffchainDataWrapper,
) -> SchemaResult<(EncryptionPublicKey, Address)> {
    let me = *wrapper.self_address();
    let public = wrapper
        .registry()
        .data_encryption_key(&me)
        .await
        .ok_or(SchemaError::UnavailableKey(me))?;
    let key_address = public.to_address();
    if !wrapper.custody().has_account(&key_address) {
        return Err(SchemaError::UnavailableKey(me));
    }
    Ok((public, key_address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnvironment;

    #[tokio::test]
    async fn recipient_reads_encrypted_payload() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);
        let bob = env.wrapper(1);

        let distribution = write_encrypted(
            &alice,
            "/private/note",
            b"for bob only",
            &[*bob.self_address()],
            None,
        )
        .await
        .unwrap();
        assert!(distribution.is_complete());

        let plaintext = read_encrypted(&bob, alice.self_address(), "/private/note")
            .await
            .unwrap();
        assert_eq!(plaintext, b"for bob only");
    }

    #[tokio::test]
    async fn non_recipient_cannot_find_key() {
        let env = TestEnvironment::new(3).await;
        let alice = env.wrapper(0);
        let bob = env.wrapper(1);
        let eve = env.wrapper(2);

        write_encrypted(
            &alice,
            "/private/note",
            b"for bob only",
            &[*bob.self_address()],
            None,
        )
        .await
        .unwrap();

        // Eve's derived label points nowhere: nothing was wrapped to her.
        let result = read_encrypted(&eve, alice.self_address(), "/private/note").await;
        assert!(matches!(
            result,
            Err(SchemaError::Offchain(OffchainError::FetchError { .. }))
        ));
    }

    #[tokio::test]
    async fn rewrites_reuse_the_content_key() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);
        let bob = env.wrapper(1);

        write_encrypted(
            &alice,
            "/private/note",
            b"version one",
            &[*bob.self_address()],
            None,
        )
        .await
        .unwrap();
        let first = read_symmetric_key(&alice, alice.self_address(), "/private/note")
            .await
            .unwrap();

        // Rewrite without naming bob again; his existing wrapped key still opens it.
        write_encrypted(&alice, "/private/note", b"version two", &[], None)
            .await
            .unwrap();
        let second = read_symmetric_key(&alice, alice.self_address(), "/private/note")
            .await
            .unwrap();
        assert_eq!(first, second);

        let plaintext = read_encrypted(&bob, alice.self_address(), "/private/note")
            .await
            .unwrap();
        assert_eq!(plaintext, b"version two");
    }

    #[tokio::test]
    async fn incremental_recipients_share_one_key() {
        let env = TestEnvironment::new(3).await;
        let alice = env.wrapper(0);
        let bob = env.wrapper(1);
        let carol = env.wrapper(2);

        write_encrypted(
            &alice,
            "/private/note",
            b"shared secret",
            &[*bob.self_address()],
            None,
        )
        .await
        .unwrap();

        // Grant carol access later without rewriting the payload.
        let key = read_symmetric_key(&alice, alice.self_address(), "/private/note")
            .await
            .unwrap();
        let distribution =
            write_symmetric_keys(&alice, "/private/note", &key, &[*carol.self_address()]).await;
        assert!(distribution.is_complete());

        let plaintext = read_encrypted(&carol, alice.self_address(), "/private/note")
            .await
            .unwrap();
        assert_eq!(plaintext, b"shared secret");
    }

    #[tokio::test]
    async fn distribution_reports_per_recipient_failures() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);
        let bob = env.wrapper(1);
        // An account with no registered encryption key.
        let stranger = Address::from_public_key(&[42u8; 32]);

        let distribution = write_encrypted(
            &alice,
            "/private/note",
            b"payload",
            &[*bob.self_address(), stranger],
            None,
        )
        .await
        .unwrap();

        assert!(!distribution.is_complete());
        assert_eq!(distribution.failures(), vec![&stranger]);
        let bob_outcome = distribution
            .outcomes
            .iter()
            .find(|(address, _)| address == bob.self_address())
            .unwrap();
        assert!(bob_outcome.1.is_ok());
    }

    #[tokio::test]
    async fn reader_without_local_key_gets_unavailable_key() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);
        let bob = env.wrapper(1);

        write_encrypted(
            &alice,
            "/private/note",
            b"payload",
            &[*bob.self_address()],
            None,
        )
        .await
        .unwrap();

        env.remove_keys(bob.self_address());
        let result = read_encrypted(&bob, alice.self_address(), "/private/note").await;
        assert!(matches!(
            result,
            Err(SchemaError::UnavailableKey(a)) if a == *bob.self_address()
        ));
    }

    #[tokio::test]
    async fn wrapped_key_of_wrong_length_is_invalid_key() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);
        let bob = env.wrapper(1);

        // Wrap something that is not a 16-byte key.
        let (sender_pub, sender_key_address) = own_encryption_key(&alice).await.unwrap();
        let bob_pub = env.encryption_key(bob.self_address());
        let shared = alice
            .custody()
            .compute_shared_secret(&sender_key_address, &bob_pub)
            .await
            .unwrap();
        let label_path =
            ciphertext_path("/private/note.key", &shared, &sender_pub, &bob_pub);
        let wrapped = ecies_encrypt(&bob_pub, b"short");
        let signature = alice
            .sign(&label_path, SignedContent::Binary(&wrapped))
            .await
            .unwrap();
        alice.write_data(&wrapped, &signature, &label_path).await.unwrap();

        let result = read_symmetric_key(&bob, alice.self_address(), "/private/note").await;
        assert!(matches!(
            result,
            Err(SchemaError::InvalidKey { length: 5, expected: KEY_LENGTH })
        ));
    }
}
