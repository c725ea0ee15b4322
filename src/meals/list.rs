use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::dto::SortOrder;
use super::repo_types::Meal;
use crate::error::StoreError;

/// Where the list loads meals from.
#[async_trait]
pub trait ListDataSource: Send + Sync {
    async fn fetch(&self, order: SortOrder) -> Result<Vec<Meal>, StoreError>;
}

/// What the presentation layer renders.
#[derive(Debug, Clone, Default)]
pub struct MealSnapshot {
    pub meals: Vec<Meal>,
    pub order: SortOrder,
    /// Ticket of the refresh that produced this snapshot, 0 before the first one.
    pub ticket: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { count: usize },
    /// A newer refresh was triggered while this one was in flight.
    Superseded,
}

/// Transient in-memory copy of the meal list.
///
/// Refreshes are not cancelled or de-duplicated. When two overlap, the one
/// triggered last wins regardless of which finishes first; older results are
/// dropped.
pub struct MealList {
    source: Arc<dyn ListDataSource>,
    order: Mutex<SortOrder>,
    issued: AtomicU64,
    tx: watch::Sender<MealSnapshot>,
}

impl MealList {
    pub fn new(source: Arc<dyn ListDataSource>) -> Self {
        let (tx, _rx) = watch::channel(MealSnapshot::default());
        Self {
            source,
            order: Mutex::new(SortOrder::default()),
            issued: AtomicU64::new(0),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<MealSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> MealSnapshot {
        self.tx.borrow().clone()
    }

    pub fn order(&self) -> SortOrder {
        *self.order.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-fetches with the current order. On failure the previous snapshot stays.
    pub async fn refresh(&self) -> Result<RefreshOutcome, StoreError> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let order = self.order();

        let meals = match self.source.fetch(order).await {
            Ok(meals) => meals,
            Err(e) => {
                warn!(error = %e, ticket, "meal list refresh failed");
                return Err(e);
            }
        };

        let count = meals.len();
        let applied = self.tx.send_if_modified(|snap| {
            if ticket != self.issued.load(Ordering::SeqCst) || ticket <= snap.ticket {
                return false;
            }
            *snap = MealSnapshot {
                meals,
                order,
                ticket,
            };
            true
        });

        if applied {
            debug!(ticket, count, "meal list refreshed");
            Ok(RefreshOutcome::Applied { count })
        } else {
            debug!(ticket, "discarding superseded meal list refresh");
            Ok(RefreshOutcome::Superseded)
        }
    }

    pub async fn set_sort(&self, order: SortOrder) -> Result<RefreshOutcome, StoreError> {
        *self.order.lock().unwrap_or_else(|e| e.into_inner()) = order;
        self.refresh().await
    }

    /// Filters the loaded snapshot; never hits the store.
    pub fn search(&self, text: &str) -> Vec<Meal> {
        filter_by_name(&self.tx.borrow().meals, text)
    }
}

/// Case-insensitive substring match on `name`. Empty text matches everything.
pub fn filter_by_name(meals: &[Meal], text: &str) -> Vec<Meal> {
    if text.is_empty() {
        return meals.to_vec();
    }
    let needle = text.to_lowercase();
    meals
        .iter()
        .filter(|m| m.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
