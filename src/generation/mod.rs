mod client;
pub mod dto;

use async_trait::async_trait;

use crate::error::GenerationError;

pub use client::GenerationClient;
pub use dto::MealDraft;

/// Produces a meal draft from a free-text prompt. Text first, then the image,
/// because the image prompt is the generated description.
#[async_trait]
pub trait MealDraftGenerator: Send + Sync {
    async fn generate_meal_draft(&self, prompt: &str) -> Result<MealDraft, GenerationError>;
}
