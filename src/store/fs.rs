//! Filesystem blob store

use std::path::PathBuf;

use async_trait::async_trait;

use super::traits::BlobStore;
use crate::error::StoreError;

/// Blob store writing under a local base directory
///
/// Download URLs join the configured public base URL with the blob path;
/// serving that directory (static file server, reverse proxy) is the
/// deployment's concern.
pub struct FsBlobStore {
    base_dir: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new(base_dir: PathBuf, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            base_dir,
            public_base_url,
        }
    }

    fn blob_file(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(
        &self,
        path: &str,
        data: &[u8],
        _content_type: &str,
    ) -> Result<(), StoreError> {
        let file = self.blob_file(path);
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        tokio::fs::write(&file, data)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String, StoreError> {
        Ok(format!("{}/{}", self.public_base_url, path))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_writes_under_base_dir() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().to_path_buf(), "https://cdn.example.com");

        store
            .upload("processed/report!pdocx.html", b"<h1>report</h1>", "text/html")
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("processed/report!pdocx.html")).unwrap();
        assert_eq!(written, b"<h1>report</h1>");
    }

    #[tokio::test]
    async fn test_upload_replaces_existing_blob() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().to_path_buf(), "https://cdn.example.com");

        store.upload("processed/a.html", b"old", "text/html").await.unwrap();
        store.upload("processed/a.html", b"new", "text/html").await.unwrap();

        let written = std::fs::read(dir.path().join("processed/a.html")).unwrap();
        assert_eq!(written, b"new");
    }

    #[tokio::test]
    async fn test_download_url_joins_public_base() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().to_path_buf(), "https://cdn.example.com/");

        let url = store.download_url("processed/a.html").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/processed/a.html");
    }
}
