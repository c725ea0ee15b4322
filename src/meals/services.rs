use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::ImagePicked;
use super::repo_types::Meal;
use crate::error::{PipelineError, StoreError};
use crate::images::ImageSource;
use crate::state::AppState;

/// Prompt → draft → downloaded image → stored meal → list refresh.
/// Any failure aborts the whole run and leaves nothing stored.
#[instrument(skip(state))]
pub async fn generate_meal(state: &AppState, prompt: &str) -> Result<Meal, PipelineError> {
    let draft = state.generator.generate_meal_draft(prompt).await?;
    let filename = state.images.download_and_save(&draft.image_url).await?;

    let meal = Meal::new(draft.name, draft.description, filename);
    if let Err(e) = state.meals.create(&meal).await {
        discard_image(state, &meal.image_ref).await;
        return Err(e.into());
    }

    info!(meal_id = %meal.id, name = %meal.name, "generated meal logged");
    refresh_after_write(state).await;
    Ok(meal)
}

/// Manual entry. Without a picked photo the meal renders with the placeholder.
#[instrument(skip(state, picked))]
pub async fn log_manual_meal(
    state: &AppState,
    name: &str,
    description: &str,
    picked: Option<ImagePicked>,
) -> Result<Meal, PipelineError> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidMeal("name must not be empty").into());
    }

    let image_ref = match picked {
        Some(img) => state.images.save_typed(img.body, &img.content_type).await?,
        None => String::new(),
    };

    let meal = Meal::new(name, description, image_ref);
    if let Err(e) = state.meals.create(&meal).await {
        discard_image(state, &meal.image_ref).await;
        return Err(e.into());
    }

    info!(meal_id = %meal.id, "manual meal logged");
    refresh_after_write(state).await;
    Ok(meal)
}

pub async fn rename(state: &AppState, id: Uuid, name: &str) -> Result<Meal, PipelineError> {
    let name = name.to_string();
    let meal = state.meals.update(id, move |m| m.name = name).await?;
    refresh_after_write(state).await;
    Ok(meal)
}

pub async fn describe(
    state: &AppState,
    id: Uuid,
    description: &str,
) -> Result<Meal, PipelineError> {
    let description = description.to_string();
    let meal = state
        .meals
        .update(id, move |m| m.description = description)
        .await?;
    refresh_after_write(state).await;
    Ok(meal)
}

pub async fn toggle_eaten(state: &AppState, id: Uuid) -> Result<Meal, PipelineError> {
    let meal = state.meals.update(id, |m| m.eaten = !m.eaten).await?;
    refresh_after_write(state).await;
    Ok(meal)
}

/// Swaps in a new photo. The old file is removed once the record points away from it.
#[instrument(skip(state, picked))]
pub async fn replace_image(
    state: &AppState,
    id: Uuid,
    picked: ImagePicked,
) -> Result<Meal, PipelineError> {
    let filename = state
        .images
        .save_typed(picked.body, &picked.content_type)
        .await?;

    let mut previous = String::new();
    let new_ref = filename.clone();
    let updated = state
        .meals
        .update(id, |m| previous = std::mem::replace(&mut m.image_ref, new_ref))
        .await;

    let meal = match updated {
        Ok(meal) => meal,
        Err(e) => {
            discard_image(state, &filename).await;
            return Err(e.into());
        }
    };

    discard_image(state, &previous).await;
    refresh_after_write(state).await;
    Ok(meal)
}

/// Permanent delete of the record and, best effort, its photo.
#[instrument(skip(state))]
pub async fn remove_meal(state: &AppState, id: Uuid) -> Result<(), PipelineError> {
    let meal = state.meals.get(id).await?;
    state.meals.delete(id).await?;
    discard_image(state, &meal.image_ref).await;

    info!(meal_id = %id, "meal removed");
    refresh_after_write(state).await;
    Ok(())
}

pub async fn meal_image(state: &AppState, meal: &Meal) -> ImageSource {
    state.images.load_or_placeholder(&meal.image_ref).await
}

/// The write already committed; a failed refresh only leaves the list stale.
async fn refresh_after_write(state: &AppState) {
    if let Err(e) = state.list.refresh().await {
        warn!(error = %e, "meal list refresh after write failed");
    }
}

async fn discard_image(state: &AppState, filename: &str) {
    if filename.is_empty() {
        return;
    }
    if let Err(e) = state.images.delete(filename).await {
        warn!(error = %e, filename, "failed to remove image");
    }
}
