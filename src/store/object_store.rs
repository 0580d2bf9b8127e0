//! Filesystem-backed `ObjectStore` reference implementation. Stands in for
//! a real object store (S3/Supabase Storage in the original system); the
//! path layout and upsert semantics match §6 exactly so swapping in a real
//! backend later is a drop-in change.

use super::ObjectStore;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct FsObjectStore {
    base_dir: PathBuf,
}

impl FsObjectStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn full_path(&self, bucket: &str, path: &str) -> PathBuf {
        self.base_dir.join(bucket).join(path)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> AppResult<()> {
        let full = self.full_path(bucket, path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(AppError::Io)?;
        }
        tokio::fs::write(&full, bytes).await.map_err(AppError::Io)?;
        Ok(())
    }

    async fn get_public_url(&self, bucket: &str, path: &str) -> AppResult<Option<String>> {
        let full = self.full_path(bucket, path);
        if tokio::fs::metadata(&full).await.is_ok() {
            Ok(Some(format!("file://{}", full.display())))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_get_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().to_path_buf());
        store
            .upload("receipts", "p1/5491112345/123.png", b"data", "image/png")
            .await
            .unwrap();

        let url = store
            .get_public_url("receipts", "p1/5491112345/123.png")
            .await
            .unwrap();
        assert!(url.unwrap().starts_with("file://"));
    }

    #[tokio::test]
    async fn missing_object_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().to_path_buf());
        let url = store.get_public_url("receipts", "missing.png").await.unwrap();
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn upload_allows_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().to_path_buf());
        store.upload("receipts", "p1/x/1.png", b"first", "image/png").await.unwrap();
        store.upload("receipts", "p1/x/1.png", b"second", "image/png").await.unwrap();
        let full = dir.path().join("receipts/p1/x/1.png");
        let contents = tokio::fs::read(full).await.unwrap();
        assert_eq!(contents, b"second");
    }
}
