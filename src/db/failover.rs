//! Hosted-first hybrid backend with an in-process mirror.
//!
//! Every write goes to the hosted store and is mirrored in process; when the
//! hosted store fails (or never initialized) the mirror alone serves the
//! operation, so read/write-through paths never surface transient backend
//! errors to callers. `MealNotFound` is not a transient failure and always
//! propagates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

use super::{
    BackupReport, Cursor, DatabaseService, DbError, ExportData, InMemoryDatabaseService, MealPage,
    MigrationReport,
};
use crate::models::{FoodItem, MealItem, SubmittedMeal, TagSummary};

pub struct FailoverDatabaseService {
    primary: Arc<dyn DatabaseService>,
    mirror: InMemoryDatabaseService,
}

impl FailoverDatabaseService {
    pub fn new(primary: Arc<dyn DatabaseService>) -> Self {
        Self {
            primary,
            mirror: InMemoryDatabaseService::new(),
        }
    }

    /// The in-process mirror; exposed so local mode and tests can seed it.
    pub fn mirror(&self) -> &InMemoryDatabaseService {
        &self.mirror
    }
}

#[async_trait]
impl DatabaseService for FailoverDatabaseService {
    async fn get_food_items(&self) -> Result<Vec<FoodItem>, DbError> {
        if self.primary.is_available() {
            match self.primary.get_food_items().await {
                Ok(items) => {
                    self.mirror.replace_food_items(items.clone()).await;
                    return Ok(items);
                }
                Err(e) => warn!(error = %e, "hosted read failed; serving mirror"),
            }
        }
        self.mirror.get_food_items().await
    }

    async fn save_food_item(&self, item: FoodItem) -> Result<String, DbError> {
        if self.primary.is_available() {
            match self.primary.save_food_item(item.clone()).await {
                Ok(id) => {
                    let mirrored = item.with_id(id.clone());
                    let _ = self.mirror.save_food_item(mirrored).await;
                    return Ok(id);
                }
                Err(e) => warn!(error = %e, "hosted save failed; writing to mirror"),
            }
        }
        self.mirror.save_food_item(item).await
    }

    async fn update_food_item(&self, item: FoodItem) -> Result<(), DbError> {
        if self.primary.is_available() {
            if let Err(e) = self.primary.update_food_item(item.clone()).await {
                warn!(error = %e, "hosted update failed; updating mirror only");
            }
        }
        self.mirror.update_food_item(item).await
    }

    async fn delete_food_item(&self, food_id: &str) -> Result<(), DbError> {
        if self.primary.is_available() {
            if let Err(e) = self.primary.delete_food_item(food_id).await {
                warn!(error = %e, "hosted delete failed; deleting from mirror only");
            }
        }
        self.mirror.delete_food_item(food_id).await
    }

    async fn get_submitted_meals_paginated(
        &self,
        page_size: usize,
        cursor: Option<Cursor>,
    ) -> Result<MealPage, DbError> {
        // An offset cursor was issued by the mirror; only the mirror can
        // continue that pagination.
        let mirror_cursor = matches!(cursor, Some(Cursor::Offset(_)));

        if self.primary.is_available() && !mirror_cursor {
            match self
                .primary
                .get_submitted_meals_paginated(page_size, cursor.clone())
                .await
            {
                Ok(page) => return Ok(page),
                Err(e) => warn!(error = %e, "hosted page read failed; serving mirror"),
            }
        }
        // A hosted cursor is meaningless here and surfaces as ForeignCursor;
        // callers restart from the first page.
        self.mirror
            .get_submitted_meals_paginated(page_size, cursor)
            .await
    }

    async fn save_submitted_meal(
        &self,
        items: Vec<MealItem>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<String, DbError> {
        if self.primary.is_available() {
            match self
                .primary
                .save_submitted_meal(items.clone(), timestamp)
                .await
            {
                Ok(id) => {
                    let mut meal = SubmittedMeal::new(items, timestamp);
                    meal.id = id.clone();
                    self.mirror.record_meal(meal).await;
                    return Ok(id);
                }
                Err(e) => warn!(error = %e, "hosted meal save failed; writing to mirror"),
            }
        }
        self.mirror.save_submitted_meal(items, timestamp).await
    }

    async fn update_submitted_meal(&self, meal: &SubmittedMeal) -> Result<String, DbError> {
        if self.primary.is_available() {
            match self.primary.update_submitted_meal(meal).await {
                Ok(id) => {
                    let _ = self.mirror.update_submitted_meal(meal).await;
                    return Ok(id);
                }
                Err(e @ DbError::MealNotFound(_)) => return Err(e),
                Err(e) => warn!(error = %e, "hosted meal update failed; updating mirror"),
            }
        }
        self.mirror.update_submitted_meal(meal).await
    }

    async fn delete_submitted_meal(&self, meal_id: &str) -> Result<bool, DbError> {
        if self.primary.is_available() {
            match self.primary.delete_submitted_meal(meal_id).await {
                Ok(deleted) => {
                    let _ = self.mirror.delete_submitted_meal(meal_id).await;
                    return Ok(deleted);
                }
                Err(e @ DbError::MealNotFound(_)) => return Err(e),
                Err(e) => warn!(error = %e, "hosted meal delete failed; deleting from mirror"),
            }
        }
        self.mirror.delete_submitted_meal(meal_id).await
    }

    async fn update_meals_with_food_item(
        &self,
        food_id: &str,
        updated: &FoodItem,
    ) -> Result<usize, DbError> {
        if self.primary.is_available() {
            match self.primary.update_meals_with_food_item(food_id, updated).await {
                Ok(count) => {
                    let _ = self.mirror.update_meals_with_food_item(food_id, updated).await;
                    return Ok(count);
                }
                Err(e) => warn!(error = %e, "hosted fan-out failed; updating mirror only"),
            }
        }
        self.mirror.update_meals_with_food_item(food_id, updated).await
    }

    async fn backup_data(&self) -> Result<BackupReport, DbError> {
        if self.primary.is_available() {
            match self.primary.backup_data().await {
                Ok(report) => return Ok(report),
                Err(e) => warn!(error = %e, "hosted backup failed; backing up mirror"),
            }
        }
        self.mirror.backup_data().await
    }

    async fn export_collections(&self) -> Result<ExportData, DbError> {
        if self.primary.is_available() {
            match self.primary.export_collections().await {
                Ok(data) if !data.food_items.is_empty() || !data.meals.is_empty() => {
                    return Ok(data)
                }
                Ok(_) => warn!("hosted export yielded nothing; exporting mirror"),
                Err(e) => warn!(error = %e, "hosted export failed; exporting mirror"),
            }
        }
        self.mirror.export_collections().await
    }

    fn is_available(&self) -> bool {
        self.primary.is_available()
    }

    async fn create_tags_collection(&self) -> Result<usize, DbError> {
        if self.primary.is_available() {
            match self.primary.create_tags_collection().await {
                Ok(created) => return Ok(created),
                Err(e) => warn!(error = %e, "hosted tag rebuild failed; rebuilding in mirror"),
            }
        }
        self.mirror.create_tags_collection().await
    }

    async fn get_tags(&self) -> Result<Vec<TagSummary>, DbError> {
        if self.primary.is_available() {
            match self.primary.get_tags().await {
                Ok(tags) => return Ok(tags),
                Err(e) => warn!(error = %e, "hosted tag read failed; serving mirror"),
            }
        }
        self.mirror.get_tags().await
    }

    async fn update_tag_counts(&self) -> Result<Vec<TagSummary>, DbError> {
        if self.primary.is_available() {
            match self.primary.update_tag_counts().await {
                Ok(tags) => return Ok(tags),
                Err(e) => warn!(error = %e, "hosted tag refresh failed; refreshing mirror"),
            }
        }
        self.mirror.update_tag_counts().await
    }

    async fn migrate_category_to_tags(&self) -> Result<MigrationReport, DbError> {
        if self.primary.is_available() {
            match self.primary.migrate_category_to_tags().await {
                Ok(report) => return Ok(report),
                Err(e) => warn!(error = %e, "hosted migration failed; migrating mirror"),
            }
        }
        self.mirror.migrate_category_to_tags().await
    }
}
