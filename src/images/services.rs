use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::ImageStoreError;
use crate::storage::BlobStore;

/// Content type assumed for bytes that arrive without one.
const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// What a view should show for a meal's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Stored(Bytes),
    Placeholder,
}

/// Meal photos keyed by generated file name.
#[derive(Clone)]
pub struct ImageStore {
    blobs: Arc<dyn BlobStore>,
    http: reqwest::Client,
}

impl ImageStore {
    pub fn new(blobs: Arc<dyn BlobStore>, http: reqwest::Client) -> Self {
        Self { blobs, http }
    }

    pub async fn save(&self, body: Bytes) -> Result<String, ImageStoreError> {
        self.save_typed(body, DEFAULT_CONTENT_TYPE).await
    }

    pub async fn save_typed(
        &self,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, ImageStoreError> {
        let ext = ext_from_mime(content_type).unwrap_or("bin");
        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let size = body.len();
        self.blobs.put(&filename, body).await?;
        info!(%filename, size, "image saved");
        Ok(filename)
    }

    pub async fn load(&self, filename: &str) -> Result<Bytes, ImageStoreError> {
        self.blobs.get(filename).await
    }

    /// Never fails; a missing or unreadable image degrades to the placeholder.
    pub async fn load_or_placeholder(&self, filename: &str) -> ImageSource {
        match self.load(filename).await {
            Ok(bytes) => ImageSource::Stored(bytes),
            Err(e) => {
                debug!(error = %e, filename, "using placeholder image");
                ImageSource::Placeholder
            }
        }
    }

    pub async fn delete(&self, filename: &str) -> Result<(), ImageStoreError> {
        self.blobs.delete(filename).await
    }

    #[instrument(skip(self))]
    pub async fn download_and_save(&self, url: &str) -> Result<String, ImageStoreError> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ImageStoreError::Network(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            warn!(%status, "image download failed");
            return Err(ImageStoreError::HttpStatus(status.as_u16()));
        }

        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let body = res
            .bytes()
            .await
            .map_err(|e| ImageStoreError::Network(e.to_string()))?;

        self.save_typed(body, &content_type).await
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    let essence = ct.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::storage::LocalBlobStore;
    use crate::test_support;
    use axum::{http::header, http::StatusCode, routing::get, Router};
    use tempfile::TempDir;

    async fn store() -> (ImageStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path()).await.unwrap();
        (ImageStore::new(Arc::new(blobs), reqwest::Client::new()), dir)
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("IMAGE/PNG; charset=binary"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime(""), None);
    }

    #[tokio::test]
    async fn load_returns_saved_bytes() {
        let (images, _dir) = store().await;
        for body in [Vec::new(), vec![0u8, 255, 13, 10], vec![7u8; 64 * 1024]] {
            let name = images.save(Bytes::from(body.clone())).await.unwrap();
            assert!(name.ends_with(".png"));
            assert_eq!(images.load(&name).await.unwrap(), Bytes::from(body));
        }
    }

    #[tokio::test]
    async fn filenames_are_unique() {
        let (images, _dir) = store().await;
        let a = images.save(Bytes::from_static(b"same")).await.unwrap();
        let b = images.save(Bytes::from_static(b"same")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn missing_image_falls_back_to_placeholder() {
        let (images, _dir) = store().await;
        assert!(matches!(
            images.load("nope.png").await,
            Err(ImageStoreError::NotFound(_))
        ));
        assert_eq!(images.load_or_placeholder("nope.png").await, ImageSource::Placeholder);
        assert_eq!(images.load_or_placeholder("").await, ImageSource::Placeholder);

        let name = images.save_typed(Bytes::from_static(b"jpg"), "image/jpeg").await.unwrap();
        assert!(name.ends_with(".jpg"));
        assert_eq!(
            images.load_or_placeholder(&name).await,
            ImageSource::Stored(Bytes::from_static(b"jpg"))
        );
    }

    #[tokio::test]
    async fn download_saves_remote_bytes() {
        let app = Router::new()
            .route(
                "/img.jpg",
                get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], vec![1u8, 2, 3]) }),
            )
            .route("/gone.png", get(|| async { StatusCode::NOT_FOUND }));
        let base = test_support::spawn(app).await;
        let (images, _dir) = store().await;

        let name = images
            .download_and_save(&format!("{}/img.jpg", base))
            .await
            .unwrap();
        assert!(name.ends_with(".jpg"));
        assert_eq!(images.load(&name).await.unwrap(), Bytes::from_static(&[1, 2, 3]));

        let err = images
            .download_and_save(&format!("{}/gone.png", base))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageStoreError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn download_from_unreachable_host_is_network_error() {
        let (images, dir) = store().await;
        let base = test_support::dead_url().await;
        let err = images
            .download_and_save(&format!("{}/img.png", base))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageStoreError::Network(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
