use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ImageStoreError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes) -> Result<(), ImageStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ImageStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ImageStoreError>;
}

/// Flat directory of files addressed by name.
#[derive(Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys are plain file names; anything that could leave `root` is refused.
    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let plain = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(|c: char| c == '/' || c == '\\' || c == '\0');
        plain.then(|| self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, body: Bytes) -> Result<(), ImageStoreError> {
        let write_err = |source| ImageStoreError::Write {
            filename: key.to_string(),
            source,
        };
        let path = self.path_for(key).ok_or_else(|| {
            write_err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "invalid image file name",
            ))
        })?;
        tokio::fs::write(&path, &body).await.map_err(write_err)
    }

    async fn get(&self, key: &str) -> Result<Bytes, ImageStoreError> {
        let path = self
            .path_for(key)
            .ok_or_else(|| ImageStoreError::NotFound(key.to_string()))?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) => {
                tracing::debug!(error = %e, key, "image read failed");
                Err(ImageStoreError::NotFound(key.to_string()))
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), ImageStoreError> {
        let path = self
            .path_for(key)
            .ok_or_else(|| ImageStoreError::NotFound(key.to_string()))?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ImageStoreError::NotFound(key.to_string()))
            }
            Err(source) => Err(ImageStoreError::Write {
                filename: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        store.put("a.png", Bytes::from_static(b"\x89PNG")).await.unwrap();
        assert_eq!(store.get("a.png").await.unwrap(), Bytes::from_static(b"\x89PNG"));

        store.delete("a.png").await.unwrap();
        assert!(matches!(
            store.get("a.png").await,
            Err(ImageStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("a.png").await,
            Err(ImageStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("images").join("meals");
        let store = LocalBlobStore::new(&nested).await.unwrap();
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn refuses_keys_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("images")).await.unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"nope").unwrap();

        for key in ["../secret.txt", "..", "", "sub/x.png", "..\\secret.txt"] {
            assert!(
                matches!(store.get(key).await, Err(ImageStoreError::NotFound(_))),
                "key {key:?}"
            );
        }
        assert!(matches!(
            store.put("../escape.png", Bytes::from_static(b"x")).await,
            Err(ImageStoreError::Write { .. })
        ));
        assert!(!dir.path().join("escape.png").exists());
    }

    #[tokio::test]
    async fn write_into_missing_directory_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("images")).await.unwrap();
        std::fs::remove_dir(store.root()).unwrap();

        let err = store.put("a.png", Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, ImageStoreError::Write { ref filename, .. } if filename == "a.png"));
    }
}
