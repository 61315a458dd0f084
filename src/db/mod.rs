//! Persistence contract and its interchangeable backends.
//!
//! [`DatabaseService`] is the capability set every backend implements. Three
//! variants exist: [`MongoDatabaseService`] (hosted document store),
//! [`InMemoryDatabaseService`] (deterministic, for tests and local mode), and
//! [`FailoverDatabaseService`] (hosted-first with an in-process mirror). The
//! composition layer picks exactly one at startup.

mod failover;
mod memory;
mod mongo;

pub use failover::FailoverDatabaseService;
pub use memory::{InMemoryDatabaseService, SeedData, SeedSummary};
pub use mongo::MongoDatabaseService;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::models::{FoodItem, MealItem, SubmittedMeal, TagSummary};

pub(crate) const FOOD_ITEMS_COLLECTION: &str = "food-items";
pub(crate) const MEALS_COLLECTION: &str = "submitted-meals";
pub(crate) const TAGS_COLLECTION: &str = "tags";

/// Collection prefix for a backup taken on the given date, e.g.
/// `backup_2025-08-05_food-items`.
pub(crate) fn backup_prefix(date: NaiveDate) -> String {
    format!("backup_{}", date.format("%Y-%m-%d"))
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database backend is unavailable")]
    Unavailable,
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("meal not found: {0}")]
    MealNotFound(String),
    #[error("pagination cursor was issued by a different backend")]
    ForeignCursor,
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
    #[error("document encoding failed: {0}")]
    Encoding(#[from] mongodb::bson::ser::Error),
}

/// Opaque pagination token: the position of the last meal a page returned.
///
/// `Document` is the hosted store's native handle (sort-key values of the last
/// document); `Offset` is the in-memory backend's plain index. A cursor is
/// only meaningful to the backend that issued it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    Document {
        timestamp: DateTime<Utc>,
        id: String,
    },
    Offset(usize),
}

/// One page of submitted meals, newest first.
#[derive(Debug, Clone)]
pub struct MealPage {
    pub meals: Vec<SubmittedMeal>,
    /// Cursor for the next page; `None` when this page was empty.
    pub last_visible: Option<Cursor>,
    pub has_next_page: bool,
}

/// Outcome of copying the live collections into date-prefixed shadows.
/// A partial copy reports `success: false` with the counts that landed;
/// nothing is rolled back.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub success: bool,
    pub prefix: String,
    pub food_items_count: usize,
    pub meals_count: usize,
    pub error: Option<String>,
}

/// Full dump of both collections.
#[derive(Debug, Clone, Default)]
pub struct ExportData {
    pub food_items: Vec<FoodItem>,
    pub meals: Vec<SubmittedMeal>,
}

/// Outcome of the legacy-category batch migration. Per-document failures are
/// counted and skipped, never retried.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Items whose `category` was folded into `tags`.
    pub migrated: usize,
    /// Items that had no `category` to begin with.
    pub skipped: usize,
    pub failed: usize,
}

/// The capability contract every persistence backend fulfills.
///
/// Failure semantics are part of the contract and intentionally uneven:
/// deleting an unknown food id is a silent no-op while deleting an unknown
/// meal id is [`DbError::MealNotFound`]; updating a food item without an id
/// logs a warning and does nothing.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Returns the full food catalog. Order is not significant.
    async fn get_food_items(&self) -> Result<Vec<FoodItem>, DbError>;

    /// Saves a food item, assigning an id derived from its name when the
    /// caller did not supply one. Saving an existing id overwrites. Returns
    /// the assigned/confirmed id.
    async fn save_food_item(&self, item: FoodItem) -> Result<String, DbError>;

    /// Merge-updates an existing item. An empty `id` is a logged no-op.
    /// `None` optional fields are left as stored.
    async fn update_food_item(&self, item: FoodItem) -> Result<(), DbError>;

    /// Deletes a food item. Unknown ids succeed silently.
    async fn delete_food_item(&self, food_id: &str) -> Result<(), DbError>;

    /// Returns one page of submitted meals, newest first by `timestamp`.
    /// Pass `None` for the first page, then chain each response's
    /// `last_visible`.
    async fn get_submitted_meals_paginated(
        &self,
        page_size: usize,
        cursor: Option<Cursor>,
    ) -> Result<MealPage, DbError>;

    /// Logs a meal from item snapshots. `timestamp` is when the meal was
    /// eaten (`None` = now). Returns the generated meal id.
    async fn save_submitted_meal(
        &self,
        items: Vec<MealItem>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<String, DbError>;

    /// Replaces a meal's item list and stamps `last_updated`. Fails with
    /// [`DbError::MealNotFound`] when the id is unknown.
    async fn update_submitted_meal(&self, meal: &SubmittedMeal) -> Result<String, DbError>;

    /// Deletes a meal. Fails with [`DbError::MealNotFound`] when the id is
    /// unknown.
    async fn delete_submitted_meal(&self, meal_id: &str) -> Result<bool, DbError>;

    /// Fan-out: rewrites the snapshot of `food_id` inside every meal that
    /// references it, preserving each snapshot's own `amount`. Scans the full
    /// meal collection; returns the number of meals modified (best effort —
    /// individual write failures are logged and not retried).
    async fn update_meals_with_food_item(
        &self,
        food_id: &str,
        updated: &FoodItem,
    ) -> Result<usize, DbError>;

    /// Copies both collections into `backup_<date>_*` shadow collections.
    async fn backup_data(&self) -> Result<BackupReport, DbError>;

    /// Dumps both collections.
    async fn export_collections(&self) -> Result<ExportData, DbError>;

    /// Last known backend health; never a live probe.
    fn is_available(&self) -> bool;

    /// Rebuilds the tags collection from the food catalog. Returns the number
    /// of tags written.
    async fn create_tags_collection(&self) -> Result<usize, DbError>;

    /// Returns the tag aggregates, highest count first, ties by
    /// case-insensitive name.
    async fn get_tags(&self) -> Result<Vec<TagSummary>, DbError>;

    /// Recomputes tag counts from the food catalog, preserving `created_at`
    /// for tags that already existed. Returns the refreshed, ranked list.
    async fn update_tag_counts(&self) -> Result<Vec<TagSummary>, DbError>;

    /// Batch migration: folds the legacy `category` field of every food item
    /// into `tags` and strips it. Continues past per-document failures.
    async fn migrate_category_to_tags(&self) -> Result<MigrationReport, DbError>;
}
