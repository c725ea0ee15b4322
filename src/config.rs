use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub image_size: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".into(),
            chat_model: "gpt-4".into(),
            image_size: "512x512".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub image_dir: PathBuf,
    pub generation: GenerationConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = GenerationConfig::default();
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://mealtracker.db?mode=rwc".into());
        let image_dir = std::env::var("IMAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("images"));

        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set; meal generation will be rejected upstream");
        }

        let generation = GenerationConfig {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            chat_model: std::env::var("OPENAI_CHAT_MODEL").unwrap_or(defaults.chat_model),
            image_size: std::env::var("OPENAI_IMAGE_SIZE").unwrap_or(defaults.image_size),
            timeout_secs: parse_timeout_secs(
                std::env::var("HTTP_TIMEOUT_SECS").ok(),
                defaults.timeout_secs,
            )?,
        };

        Ok(Self {
            database_url,
            image_dir,
            generation,
        })
    }
}

/// Unset falls back to `default`; a value that is not a whole number of
/// seconds is an error rather than silently ignored.
fn parse_timeout_secs(raw: Option<String>, default: u64) -> anyhow::Result<u64> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("HTTP_TIMEOUT_SECS must be whole seconds, got {:?}", v)),
    }
}
