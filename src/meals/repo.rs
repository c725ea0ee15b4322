use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use super::dto::SortOrder;
use super::list::ListDataSource;
use super::repo_types::{Meal, MealRow};
use crate::error::StoreError;

const SELECT_MEAL: &str = "SELECT id, name, date, description, image_ref, eaten FROM meals";

/// SQLite-backed gateway; the only component that touches the `meals` table.
#[derive(Clone)]
pub struct MealRepo {
    db: SqlitePool,
}

impl MealRepo {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// All complete meals in the given order. Incomplete rows are skipped.
    pub async fn list(&self, order: SortOrder) -> Result<Vec<Meal>, StoreError> {
        let sql = format!("{} ORDER BY {}", SELECT_MEAL, order.sql());
        let rows = sqlx::query_as::<_, MealRow>(&sql)
            .fetch_all(&self.db)
            .await
            .map_err(StoreError::Read)?;

        let total = rows.len();
        let meals: Vec<Meal> = rows.into_iter().filter_map(MealRow::into_meal).collect();
        if meals.len() < total {
            warn!(skipped = total - meals.len(), "skipping incomplete meal rows");
        }
        debug!(count = meals.len(), ?order, "listed meals");
        Ok(meals)
    }

    pub async fn get(&self, id: Uuid) -> Result<Meal, StoreError> {
        let sql = format!("{} WHERE id = ?", SELECT_MEAL);
        sqlx::query_as::<_, MealRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::Read)?
            .and_then(MealRow::into_meal)
            .ok_or(StoreError::NotFound(id))
    }

    pub async fn create(&self, meal: &Meal) -> Result<(), StoreError> {
        validate(meal)?;
        let date = meal
            .date_nanos()
            .ok_or(StoreError::InvalidMeal("date out of range"))?;
        sqlx::query(
            r#"
            INSERT INTO meals (id, name, date, description, image_ref, eaten)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(meal.id)
        .bind(&meal.name)
        .bind(date)
        .bind(&meal.description)
        .bind(&meal.image_ref)
        .bind(meal.eaten)
        .execute(&self.db)
        .await
        .map_err(StoreError::Write)?;

        debug!(meal_id = %meal.id, name = %meal.name, "meal created");
        Ok(())
    }

    /// Applies `mutator` to the stored meal and commits. `id` and `date` are
    /// not writable through this path; whatever the mutator does to them is
    /// discarded.
    pub async fn update<F>(&self, id: Uuid, mutator: F) -> Result<Meal, StoreError>
    where
        F: FnOnce(&mut Meal) + Send,
    {
        let mut tx = self.db.begin().await.map_err(StoreError::Write)?;

        let sql = format!("{} WHERE id = ?", SELECT_MEAL);
        let mut meal = sqlx::query_as::<_, MealRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::Read)?
            .and_then(MealRow::into_meal)
            .ok_or(StoreError::NotFound(id))?;

        let date = meal.date;
        mutator(&mut meal);
        meal.id = id;
        meal.date = date;
        validate(&meal)?;

        sqlx::query(
            r#"
            UPDATE meals
               SET name = ?, description = ?, image_ref = ?, eaten = ?
             WHERE id = ?
            "#,
        )
        .bind(&meal.name)
        .bind(&meal.description)
        .bind(&meal.image_ref)
        .bind(meal.eaten)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::Write)?;

        tx.commit().await.map_err(StoreError::Write)?;
        debug!(meal_id = %id, "meal updated");
        Ok(meal)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM meals WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(StoreError::Write)?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!(meal_id = %id, "meal deleted");
        Ok(())
    }
}

#[async_trait]
impl ListDataSource for MealRepo {
    async fn fetch(&self, order: SortOrder) -> Result<Vec<Meal>, StoreError> {
        self.list(order).await
    }
}

fn validate(meal: &Meal) -> Result<(), StoreError> {
    if meal.name.trim().is_empty() {
        return Err(StoreError::InvalidMeal("name must not be empty"));
    }
    Ok(())
}
