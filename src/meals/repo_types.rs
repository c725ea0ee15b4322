use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

/// Raw `meals` row. Text and date columns are nullable in the store.
#[derive(Debug, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub name: Option<String>,
    /// Unix nanoseconds, so the column sorts in time order.
    pub date: Option<i64>,
    pub description: Option<String>,
    pub image_ref: Option<String>,
    pub eaten: bool,
}

/// One logged meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub date: OffsetDateTime,
    pub description: String,
    /// Filename in the image store. Empty or dangling refs render as the placeholder.
    pub image_ref: String,
    pub eaten: bool,
}

impl Meal {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            date: OffsetDateTime::now_utc(),
            description: description.into(),
            image_ref: image_ref.into(),
            eaten: false,
        }
    }

    pub fn with_date(mut self, date: OffsetDateTime) -> Self {
        self.date = date.to_offset(UtcOffset::UTC);
        self
    }

    /// `date` as stored. `None` outside the range an `i64` of nanoseconds covers.
    pub(crate) fn date_nanos(&self) -> Option<i64> {
        i64::try_from(self.date.unix_timestamp_nanos()).ok()
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Meal(name: {}, date: {}, description: {}, eaten: {})",
            self.name, self.date, self.description, self.eaten
        )
    }
}

impl MealRow {
    /// `None` for incomplete rows; callers skip them.
    pub fn into_meal(self) -> Option<Meal> {
        Some(Meal {
            id: self.id,
            name: self.name?,
            date: OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.date?)).ok()?,
            description: self.description?,
            image_ref: self.image_ref?,
            eaten: self.eaten,
        })
    }
}
