//! Accessors for structured (JSON) data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::encrypted::{read_encrypted, write_encrypted, KeyDistribution};
use crate::errors::{SchemaError, SchemaResult};
use crate::signing::SignedContent;
use crate::wrapper::OffchainDataWrapper;
use crate::Address;

/// Publicly readable structured data at a fixed path.
///
/// Writes serialize the payload to JSON and sign its canonical form; reads
/// verify authenticity before deserializing, so schema errors are only ever
/// reported for authentic data.
pub struct PublicSimpleAccessor<T> {
    wrapper: OffchainDataWrapper,
    data_path: String,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> PublicSimpleAccessor<T> {
    /// Bind the accessor to a wrapper and a data path.
    pub fn new(wrapper: OffchainDataWrapper, data_path: impl Into<String>) -> Self {
        Self {
            wrapper,
            data_path: data_path.into(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Publish `payload` under the caller's own root.
    pub async fn write(&self, payload: &T) -> SchemaResult<()> {
        let value = serde_json::to_value(payload)?;
        let data = serde_json::to_vec(&value)?;
        let signature = self
            .wrapper
            .sign(&self.data_path, SignedContent::Structured(&value))
            .await?;
        self.wrapper
            .write_data(&data, &signature, &self.data_path)
            .await?;
        Ok(())
    }

    /// Read and verify `account`'s payload at this path.
    pub async fn read(&self, account: &Address) -> SchemaResult<T> {
        let data = self
            .wrapper
            .read_data_as_result(account, &self.data_path, false)
            .await?;
        serde_json::from_slice(&data).map_err(|_| SchemaError::InvalidDataError)
    }
}

/// Encrypted structured data at a fixed path, readable by a recipient set.
pub struct PrivateSimpleAccessor<T> {
    wrapper: OffchainDataWrapper,
    data_path: String,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> PrivateSimpleAccessor<T> {
    /// Bind the accessor to a wrapper and a data path.
    pub fn new(wrapper: OffchainDataWrapper, data_path: impl Into<String>) -> Self {
        Self {
            wrapper,
            data_path: data_path.into(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Encrypt `payload` to `to` and publish it under the caller's root.
    pub async fn write(&self, payload: &T, to: &[Address]) -> SchemaResult<KeyDistribution> {
        let data = serde_json::to_vec(payload)?;
        write_encrypted(&self.wrapper, &self.data_path, &data, to, None).await
    }

    /// Read and decrypt `sender`'s payload at this path.
    pub async fn read(&self, sender: &Address) -> SchemaResult<T> {
        let data = read_encrypted(&self.wrapper, sender, &self.data_path).await?;
        serde_json::from_slice(&data).map_err(|_| SchemaError::InvalidDataError)
    }
}

/// The payload stored at the display-name path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePayload {
    /// The account's display name.
    pub name: String,
}

const NAME_PATH: &str = "/account/name";

/// Public display name at `/account/name`.
pub struct NameAccessor(PublicSimpleAccessor<NamePayload>);

impl NameAccessor {
    /// Create the accessor.
    pub fn new(wrapper: OffchainDataWrapper) -> Self {
        Self(PublicSimpleAccessor::new(wrapper, NAME_PATH))
    }

    /// Publish the caller's display name.
    pub async fn write(&self, payload: &NamePayload) -> SchemaResult<()> {
        self.0.write(payload).await
    }

    /// Read `account`'s display name.
    pub async fn read(&self, account: &Address) -> SchemaResult<NamePayload> {
        self.0.read(account).await
    }
}

/// Display name at `/account/name`, encrypted to chosen recipients.
pub struct PrivateNameAccessor(PrivateSimpleAccessor<NamePayload>);

impl PrivateNameAccessor {
    /// Create the accessor.
    pub fn new(wrapper: OffchainDataWrapper) -> Self {
        Self(PrivateSimpleAccessor::new(wrapper, NAME_PATH))
    }

    /// Publish the caller's name, readable only by `to`.
    pub async fn write(&self, payload: &NamePayload, to: &[Address]) -> SchemaResult<KeyDistribution> {
        self.0.write(payload, to).await
    }

    /// Read `sender`'s private name.
    pub async fn read(&self, sender: &Address) -> SchemaResult<NamePayload> {
        self.0.read(sender).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnvironment;

    #[tokio::test]
    async fn name_round_trip() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);

        NameAccessor::new(alice.clone())
            .write(&NamePayload { name: "alice".into() })
            .await
            .unwrap();

        let read = NameAccessor::new(env.wrapper(1))
            .read(alice.self_address())
            .await
            .unwrap();
        assert_eq!(read.name, "alice");
    }

    #[tokio::test]
    async fn malformed_payload_is_invalid_data() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);

        // Authentic but schema-violating content.
        let value = serde_json::json!({"unexpected": true});
        let data = serde_json::to_vec(&value).unwrap();
        let signature = alice
            .sign("/account/name", SignedContent::Structured(&value))
            .await
            .unwrap();
        alice.write_data(&data, &signature, "/account/name").await.unwrap();

        let result = NameAccessor::new(env.wrapper(1))
            .read(alice.self_address())
            .await;
        assert!(matches!(result, Err(SchemaError::InvalidDataError)));
    }

    #[tokio::test]
    async fn private_name_round_trip() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);
        let bob = env.wrapper(1);

        let distribution = PrivateNameAccessor::new(alice.clone())
            .write(
                &NamePayload { name: "secret alice".into() },
                &[*bob.self_address()],
            )
            .await
            .unwrap();
        assert!(distribution.is_complete());

        let read = PrivateNameAccessor::new(bob.clone())
            .read(alice.self_address())
            .await
            .unwrap();
        assert_eq!(read.name, "secret alice");
    }
}
