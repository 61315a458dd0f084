use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::db::{DatabaseService, DbError};
use crate::models::MealItem;

/// The ordered list of item snapshots the user is about to log as a meal.
pub struct Basket {
    tx: watch::Sender<Vec<MealItem>>,
}

impl Default for Basket {
    fn default() -> Self {
        Self::new()
    }
}

impl Basket {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self { tx }
    }

    pub fn add(&self, item: MealItem) {
        self.tx.send_modify(|items| items.push(item));
    }

    /// Removes the item at `index`; out-of-range indices are ignored.
    pub fn remove(&self, index: usize) {
        self.tx.send_modify(|items| {
            if index < items.len() {
                items.remove(index);
            }
        });
    }

    pub fn clear(&self) {
        self.tx.send_modify(|items| items.clear());
    }

    pub fn count(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn items(&self) -> Vec<MealItem> {
        self.tx.borrow().clone()
    }

    /// Watch basket contents; the receiver sees every update.
    pub fn subscribe(&self) -> watch::Receiver<Vec<MealItem>> {
        self.tx.subscribe()
    }

    /// Logs the basket as a meal through the injected database service and
    /// clears it on success. `timestamp` is when the meal was eaten
    /// (`None` = now). The basket is left intact when the save fails.
    pub async fn submit(
        &self,
        db: &dyn DatabaseService,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<String, DbError> {
        let items = self.items();
        let meal_id = db.save_submitted_meal(items, timestamp).await?;
        self.clear();
        Ok(meal_id)
    }
}
