//! Fetching published bytes: metadata documents, stored objects, proofs.
//!
//! Readers pull everything over plain URLs. The fetch routine is a
//! constructor-injected collaborator rather than a swappable global, so
//! tests run against an in-memory host and production runs against HTTP.

use async_trait::async_trait;

/// Failure modes of a fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL resolved but nothing is published there.
    #[error("not found")]
    NotFound,
    /// Network or host failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Trait describing read access to published URLs.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch the bytes at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP-backed fetcher.
#[cfg(feature = "http-fetch")]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http-fetch")]
impl HttpFetcher {
    /// Create a fetcher with a default client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http-fetch")]
impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http-fetch")]
#[async_trait]
impl MetadataFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !response.status().is_success() {
            return Err(FetchError::Transport(format!(
                "request failed with status {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Join a base URL and a relative path, tolerating stray slashes on either
/// side so users can configure roots like `https://example.com/store/under`.
pub fn resolve_path(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
