//! Accessors for opaque binary data.

use crate::encrypted::{read_encrypted, write_encrypted, KeyDistribution};
use crate::errors::SchemaResult;
use crate::signing::SignedContent;
use crate::wrapper::OffchainDataWrapper;
use crate::Address;

/// Publicly readable binary data at a fixed path, signed by content hash.
pub struct PublicBinaryAccessor {
    wrapper: OffchainDataWrapper,
    data_path: String,
}

impl PublicBinaryAccessor {
    /// Bind the accessor to a wrapper and a data path.
    pub fn new(wrapper: OffchainDataWrapper, data_path: impl Into<String>) -> Self {
        Self {
            wrapper,
            data_path: data_path.into(),
        }
    }

    /// Publish `data` under the caller's own root.
    pub async fn write(&self, data: &[u8]) -> SchemaResult<()> {
        let signature = self
            .wrapper
            .sign(&self.data_path, SignedContent::Binary(data))
            .await?;
        self.wrapper
            .write_data(data, &signature, &self.data_path)
            .await?;
        Ok(())
    }

    /// Read and verify `account`'s bytes at this path.
    pub async fn read(&self, account: &Address) -> SchemaResult<Vec<u8>> {
        Ok(self
            .wrapper
            .read_data_as_result(account, &self.data_path, true)
            .await?)
    }
}

/// Encrypted binary data at a fixed path, readable by a recipient set.
pub struct PrivateBinaryAccessor {
    wrapper: OffchainDataWrapper,
    data_path: String,
}

impl PrivateBinaryAccessor {
    /// Bind the accessor to a wrapper and a data path.
    pub fn new(wrapper: OffchainDataWrapper, data_path: impl Into<String>) -> Self {
        Self {
            wrapper,
            data_path: data_path.into(),
        }
    }

    /// Encrypt `data` to `to` and publish it under the caller's root.
    pub async fn write(&self, data: &[u8], to: &[Address]) -> SchemaResult<KeyDistribution> {
        write_encrypted(&self.wrapper, &self.data_path, data, to, None).await
    }

    /// Read and decrypt `sender`'s bytes at this path.
    pub async fn read(&self, sender: &Address) -> SchemaResult<Vec<u8>> {
        read_encrypted(&self.wrapper, sender, &self.data_path).await
    }
}

const PICTURE_PATH: &str = "/account/picture";

/// Public profile picture at `/account/picture`.
pub struct PictureAccessor(PublicBinaryAccessor);

impl PictureAccessor {
    /// Create the accessor.
    pub fn new(wrapper: OffchainDataWrapper) -> Self {
        Self(PublicBinaryAccessor::new(wrapper, PICTURE_PATH))
    }

    /// Publish the caller's picture bytes.
    pub async fn write(&self, data: &[u8]) -> SchemaResult<()> {
        self.0.write(data).await
    }

    /// Read `account`'s picture bytes.
    pub async fn read(&self, account: &Address) -> SchemaResult<Vec<u8>> {
        self.0.read(account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnvironment;

    #[tokio::test]
    async fn picture_round_trip() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);

        let image = vec![0x89u8, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];
        PictureAccessor::new(alice.clone()).write(&image).await.unwrap();

        let read = PictureAccessor::new(env.wrapper(1))
            .read(alice.self_address())
            .await
            .unwrap();
        assert_eq!(read, image);
    }

    #[tokio::test]
    async fn private_binary_round_trip() {
        let env = TestEnvironment::new(2).await;
        let alice = env.wrapper(0);
        let bob = env.wrapper(1);

        let accessor = PrivateBinaryAccessor::new(alice.clone(), "/vault/backup");
        let distribution = accessor
            .write(b"binary secret", &[*bob.self_address()])
            .await
            .unwrap();
        assert!(distribution.is_complete());

        let read = PrivateBinaryAccessor::new(bob.clone(), "/vault/backup")
            .read(alice.self_address())
            .await
            .unwrap();
        assert_eq!(read, b"binary secret");
    }
}
