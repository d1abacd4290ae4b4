//! Storage transport: where written bytes physically land.
//!
//! Writes always target the caller's own configured storage root; an
//! object's location is decided solely by its publisher. The transport is a
//! deployment concern (filesystem, git remote, object storage, in-memory
//! mock), abstracted behind [`StorageWriter`].

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::{OffchainError, OffchainResult};

/// Trait describing write access to the caller's own storage root.
#[async_trait]
pub trait StorageWriter: Send + Sync {
    /// Base URL under which written paths are later served to readers.
    fn root(&self) -> &str;

    /// Persist `data` at `path` relative to the root.
    async fn write(&self, data: &[u8], path: &str) -> OffchainResult<()>;
}

/// Storage writer backed by a local directory, served at a fixed base URL
/// by some external web server.
pub struct LocalStorageWriter {
    local_root: PathBuf,
    serve_root: String,
}

impl LocalStorageWriter {
    /// Create a writer that persists under `local_root` and is served at
    /// `serve_root`.
    pub fn new(local_root: impl Into<PathBuf>, serve_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            serve_root: serve_root.into(),
        }
    }

    fn resolve(&self, path: &str) -> OffchainResult<PathBuf> {
        // Storage paths are forward-slash relative; refuse traversal.
        if path.split('/').any(|segment| segment == "..") {
            return Err(OffchainError::Storage(format!(
                "path escapes storage root: {path}"
            )));
        }
        Ok(self.local_root.join(path.trim_start_matches('/')))
    }
}

#[async_trait]
impl StorageWriter for LocalStorageWriter {
    fn root(&self) -> &str {
        &self.serve_root
    }

    async fn write(&self, data: &[u8], path: &str) -> OffchainResult<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OffchainError::Storage(e.to_string()))?;
        }
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| OffchainError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_land_under_local_root() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LocalStorageWriter::new(dir.path(), "http://example.com/root");
        writer.write(b"payload", "/account/name").await.unwrap();

        let stored = std::fs::read(dir.path().join("account/name")).unwrap();
        assert_eq!(stored, b"payload");
        assert_eq!(writer.root(), "http://example.com/root");
    }

    #[tokio::test]
    async fn rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LocalStorageWriter::new(dir.path(), "http://example.com/root");
        let result = writer.write(b"x", "../outside").await;
        assert!(matches!(result, Err(OffchainError::Storage(_))));
    }
}
