use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::generation::{GenerationClient, MealDraftGenerator};
use crate::images::ImageStore;
use crate::meals::{list::MealList, repo::MealRepo};
use crate::storage::{BlobStore, LocalBlobStore};

/// Everything the core needs, built once and passed down explicitly.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub meals: MealRepo,
    pub list: Arc<MealList>,
    pub images: ImageStore,
    pub generator: Arc<dyn MealDraftGenerator>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        Self::from_config(AppConfig::from_env()?).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = crate::db::connect(&config.database_url).await?;

        let blobs = LocalBlobStore::new(&config.image_dir)
            .await
            .with_context(|| format!("create image dir {}", config.image_dir.display()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.generation.timeout_secs))
            .build()
            .context("build http client")?;

        let generator = GenerationClient::new(config.generation.clone())?;

        Ok(Self::from_parts(
            db,
            Arc::new(config),
            Arc::new(blobs),
            http,
            Arc::new(generator),
        ))
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        blobs: Arc<dyn BlobStore>,
        http: reqwest::Client,
        generator: Arc<dyn MealDraftGenerator>,
    ) -> Self {
        let meals = MealRepo::new(db.clone());
        let list = Arc::new(MealList::new(Arc::new(meals.clone())));
        Self {
            db,
            config,
            meals,
            list,
            images: ImageStore::new(blobs, http),
            generator,
        }
    }
}
