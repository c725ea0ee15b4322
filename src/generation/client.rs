use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::dto::{
    ChatMessage, ChatRequest, ChatResponse, ImageRequest, ImageResponse, MealDraft, RecipeFields,
};
use super::MealDraftGenerator;
use crate::config::GenerationConfig;
use crate::error::GenerationError;

const USER_AGENT: &str = concat!("mealtracker/", env!("CARGO_PKG_VERSION"));

const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Reply with a JSON containing two \
    key/value pairs: 1) 'name': the name of the meal, 2) 'description': a better description of \
    the meal including food items. Should be reasonably concise and fit on a mobile phone";

/// Client for the chat-completion and image-generation endpoints.
/// Requests are never retried.
#[derive(Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    config: GenerationConfig,
}

impl GenerationClient {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, GenerationError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            warn!(%status, %url, "generation api rejected request");
            return Err(GenerationError::HttpStatus(status.as_u16()));
        }

        let raw = res
            .bytes()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        let value: Value = serde_json::from_slice(&raw)
            .map_err(|e| GenerationError::MalformedJson(e.to_string()))?;
        serde_json::from_value(value)
            .map_err(|e| GenerationError::InvalidResponseShape(e.to_string()))
    }

    /// Step one: ask the chat model for a name and description.
    #[instrument(skip(self))]
    pub async fn generate_recipe(&self, prompt: &str) -> Result<RecipeFields, GenerationError> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "user",
                    content: format!(
                        "I have a meal in mind. It's {}. Can you suggest a recipe?",
                        prompt
                    ),
                },
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
            ],
        };

        let response: ChatResponse = self.post_json("chat/completions", &request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                GenerationError::InvalidResponseShape("no message content in choices".into())
            })?;

        debug!(%content, "recipe reply received");
        parse_recipe(&content)
    }

    /// Step two: one image for `prompt`; returns its url.
    #[instrument(skip(self))]
    pub async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ImageRequest {
            prompt,
            n: 1,
            size: &self.config.image_size,
        };

        let response: ImageResponse = self.post_json("images/generations", &request).await?;
        let url = response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| GenerationError::InvalidResponseShape("no image url in data".into()))?;

        validate_url(&url)?;
        Ok(url)
    }
}

#[async_trait]
impl MealDraftGenerator for GenerationClient {
    async fn generate_meal_draft(&self, prompt: &str) -> Result<MealDraft, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let recipe = self.generate_recipe(prompt).await?;
        let image_url = self.generate_image(&recipe.description).await?;

        info!(name = %recipe.name, %image_url, "meal draft generated");
        Ok(MealDraft {
            name: recipe.name,
            description: recipe.description,
            image_url,
        })
    }
}

/// Parses the model's reply. Tolerates a surrounding Markdown code fence.
fn parse_recipe(content: &str) -> Result<RecipeFields, GenerationError> {
    lazy_static! {
        static ref FENCED: Regex = Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").unwrap();
    }
    let body = FENCED
        .captures(content)
        .and_then(|c| c.get(1))
        .map_or(content, |m| m.as_str());

    let value: Value =
        serde_json::from_str(body).map_err(|e| GenerationError::MalformedJson(e.to_string()))?;

    let field = |key: &str| -> Result<String, GenerationError> {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                GenerationError::InvalidResponseShape(format!("missing or empty '{}'", key))
            })
    };

    Ok(RecipeFields {
        name: field("name")?,
        description: field("description")?,
    })
}

fn validate_url(url: &str) -> Result<(), GenerationError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| GenerationError::InvalidResponseShape(format!("bad image url: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(GenerationError::InvalidResponseShape(format!(
            "unsupported image url scheme {}",
            other
        ))),
    }
}
