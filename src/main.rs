use mealtracker::{
    meals::{services, SortOrder},
    telemetry, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let state = AppState::init().await?;
    tracing::info!(
        database = %state.config.database_url,
        images = %state.config.image_dir.display(),
        "meal store ready"
    );

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !prompt.trim().is_empty() {
        let meal = services::generate_meal(&state, &prompt).await?;
        tracing::info!(meal_id = %meal.id, name = %meal.name, image = %meal.image_ref, "meal generated");
    }

    state.list.set_sort(SortOrder::default()).await?;
    for meal in state.list.snapshot().meals {
        tracing::info!(meal_id = %meal.id, "{}", meal);
    }

    Ok(())
}
