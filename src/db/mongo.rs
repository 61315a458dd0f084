//! Hosted document-store backend.
//!
//! Every read is raced against a fixed timeout (3 s for unbounded reads, 5 s
//! for paginated reads); a timeout is a failure, not a partial result. The
//! constructor pings the deployment with exponential backoff and, when the
//! ceiling is reached, returns the instance in a degraded state that every
//! operation reports as [`DbError::Unavailable`] for the process lifetime.

use chrono::{SecondsFormat, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, to_document, Document};
use mongodb::{Client, Database};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use async_trait::async_trait;

use super::{
    backup_prefix, BackupReport, Cursor, DatabaseService, DbError, ExportData, MealPage,
    MigrationReport, FOOD_ITEMS_COLLECTION, MEALS_COLLECTION, TAGS_COLLECTION,
};
use crate::config::MongoSettings;
use crate::ids::generate_food_id;
use crate::models::{now_millis, tag, FoodItem, MealItem, SubmittedMeal, TagSummary};

/// Timeout for reads that return a whole collection.
const READ_TIMEOUT: Duration = Duration::from_secs(3);
/// Timeout for paginated reads.
const PAGE_TIMEOUT: Duration = Duration::from_secs(5);
/// Connection ping attempts before giving up for the process lifetime.
const MAX_CONNECT_ATTEMPTS: u32 = 3;

pub struct MongoDatabaseService {
    db: Option<Database>,
    available: AtomicBool,
}

impl MongoDatabaseService {
    /// Connects to the deployment. Never fails: when the ping still fails
    /// after the backoff ceiling, the returned instance is permanently
    /// degraded and [`DatabaseService::is_available`] stays `false`.
    pub async fn connect(settings: &MongoSettings) -> Self {
        let client = match Client::with_uri_str(&settings.uri).await {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "invalid connection string; running degraded");
                return Self {
                    db: None,
                    available: AtomicBool::new(false),
                };
            }
        };

        let db = client.database(&settings.database);
        let mut available = false;
        for attempt in 0..MAX_CONNECT_ATTEMPTS {
            match db.run_command(doc! { "ping": 1 }).await {
                Ok(_) => {
                    info!(database = %settings.database, "connected to document store");
                    available = true;
                    break;
                }
                Err(e) if attempt + 1 < MAX_CONNECT_ATTEMPTS => {
                    let backoff = Duration::from_secs(2u64.pow(attempt + 1));
                    warn!(error = %e, backoff_secs = backoff.as_secs(), "ping failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    error!(error = %e, "could not reach document store; running degraded");
                }
            }
        }

        Self {
            db: Some(db),
            available: AtomicBool::new(available),
        }
    }

    fn database(&self) -> Result<&Database, DbError> {
        match &self.db {
            Some(db) if self.available.load(Ordering::Relaxed) => Ok(db),
            _ => Err(DbError::Unavailable),
        }
    }

    fn foods(&self) -> Result<mongodb::Collection<FoodItem>, DbError> {
        Ok(self.database()?.collection(FOOD_ITEMS_COLLECTION))
    }

    fn meals(&self) -> Result<mongodb::Collection<SubmittedMeal>, DbError> {
        Ok(self.database()?.collection(MEALS_COLLECTION))
    }

    fn tags_collection(&self) -> Result<mongodb::Collection<TagSummary>, DbError> {
        Ok(self.database()?.collection(TAGS_COLLECTION))
    }

    async fn read_all_foods(&self) -> Result<Vec<FoodItem>, DbError> {
        let foods = self.foods()?;
        timed(READ_TIMEOUT, async move {
            let cursor = foods.find(doc! {}).await?;
            Ok(cursor.try_collect().await?)
        })
        .await
    }

    async fn read_all_meals(&self) -> Result<Vec<SubmittedMeal>, DbError> {
        let meals = self.meals()?;
        timed(READ_TIMEOUT, async move {
            let cursor = meals.find(doc! {}).await?;
            Ok(cursor.try_collect().await?)
        })
        .await
    }
}

/// Races `fut` against a timer; whichever settles first wins. On expiry the
/// driver future is dropped — work the server already accepted is not
/// cancelled at the transport level.
async fn timed<T, F>(limit: Duration, fut: F) -> Result<T, DbError>
where
    F: Future<Output = Result<T, DbError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DbError::Timeout(limit)),
    }
}

fn now_wire() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Filter selecting meals strictly after the cursor position in
/// newest-first order. Timestamps are fixed-precision RFC3339 strings, so
/// string comparison is chronological.
fn page_filter(cursor: Option<Cursor>) -> Result<Document, DbError> {
    match cursor {
        None => Ok(doc! {}),
        Some(Cursor::Document { timestamp, id }) => {
            let ts = timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
            Ok(doc! {
                "$or": [
                    { "timestamp": { "$lt": &ts } },
                    { "timestamp": &ts, "id": { "$lt": id } },
                ]
            })
        }
        Some(Cursor::Offset(_)) => Err(DbError::ForeignCursor),
    }
}

fn page_sort() -> Document {
    doc! { "timestamp": -1, "id": -1 }
}

#[async_trait]
impl DatabaseService for MongoDatabaseService {
    async fn get_food_items(&self) -> Result<Vec<FoodItem>, DbError> {
        let items = self.read_all_foods().await?;
        debug!(count = items.len(), "fetched food items");
        Ok(items)
    }

    async fn save_food_item(&self, mut item: FoodItem) -> Result<String, DbError> {
        if item.id.is_empty() {
            item.id = generate_food_id(&item.name);
        }
        item.updated_at = now_millis();

        let foods = self.foods()?;
        foods
            .replace_one(doc! { "id": &item.id }, &item)
            .upsert(true)
            .await?;

        debug!(id = %item.id, "saved food item");
        Ok(item.id)
    }

    async fn update_food_item(&self, mut item: FoodItem) -> Result<(), DbError> {
        if item.id.is_empty() {
            warn!("update_food_item called without an id; ignoring");
            return Ok(());
        }
        item.updated_at = now_millis();

        let fields = to_document(&item)?;
        let foods = self.foods()?;
        let result = foods
            .update_one(doc! { "id": &item.id }, doc! { "$set": fields })
            .await?;

        if result.matched_count == 0 {
            warn!(id = %item.id, "update_food_item: no such item");
        }
        Ok(())
    }

    async fn delete_food_item(&self, food_id: &str) -> Result<(), DbError> {
        let foods = self.foods()?;
        let result = foods.delete_one(doc! { "id": food_id }).await?;
        if result.deleted_count == 0 {
            debug!(id = %food_id, "delete_food_item: no such item");
        }
        Ok(())
    }

    async fn get_submitted_meals_paginated(
        &self,
        page_size: usize,
        cursor: Option<Cursor>,
    ) -> Result<MealPage, DbError> {
        let filter = page_filter(cursor)?;
        let meals_coll = self.meals()?;

        let meals: Vec<SubmittedMeal> = timed(PAGE_TIMEOUT, async move {
            let cursor = meals_coll
                .find(filter)
                .sort(page_sort())
                .limit(page_size as i64)
                .await?;
            Ok(cursor.try_collect().await?)
        })
        .await?;

        let last_visible = meals.last().map(|meal| Cursor::Document {
            timestamp: meal.timestamp,
            id: meal.id.clone(),
        });

        // Approximation: a full page is assumed to have a successor. Wrong by
        // exactly one (empty) page when the collection size is a multiple of
        // the page size.
        let has_next_page = meals.len() == page_size;

        Ok(MealPage {
            meals,
            last_visible,
            has_next_page,
        })
    }

    async fn save_submitted_meal(
        &self,
        items: Vec<MealItem>,
        timestamp: Option<chrono::DateTime<Utc>>,
    ) -> Result<String, DbError> {
        let meal = SubmittedMeal::new(items, timestamp);
        let meals = self.meals()?;
        meals.insert_one(&meal).await?;
        debug!(id = %meal.id, "saved submitted meal");
        Ok(meal.id)
    }

    async fn update_submitted_meal(&self, meal: &SubmittedMeal) -> Result<String, DbError> {
        let meals = self.meals()?;
        let result = meals
            .update_one(
                doc! { "id": &meal.id },
                doc! { "$set": {
                    "items": to_bson(&meal.items)?,
                    "lastUpdated": now_wire(),
                }},
            )
            .await?;

        if result.matched_count == 0 {
            return Err(DbError::MealNotFound(meal.id.clone()));
        }
        Ok(meal.id.clone())
    }

    async fn delete_submitted_meal(&self, meal_id: &str) -> Result<bool, DbError> {
        let meals = self.meals()?;
        let result = meals.delete_one(doc! { "id": meal_id }).await?;
        if result.deleted_count == 0 {
            return Err(DbError::MealNotFound(meal_id.to_string()));
        }
        Ok(true)
    }

    async fn update_meals_with_food_item(
        &self,
        food_id: &str,
        updated: &FoodItem,
    ) -> Result<usize, DbError> {
        let all_meals = self.read_all_meals().await?;
        let meals = self.meals()?;
        let mut updated_count = 0;

        for meal in all_meals {
            if !meal.contains_food(food_id) {
                continue;
            }
            let items: Vec<MealItem> = meal
                .items
                .iter()
                .map(|item| {
                    if item.id == food_id {
                        item.refreshed_from(updated)
                    } else {
                        item.clone()
                    }
                })
                .collect();

            let write = meals
                .update_one(
                    doc! { "id": &meal.id },
                    doc! { "$set": { "items": to_bson(&items)? } },
                )
                .await;
            match write {
                Ok(_) => updated_count += 1,
                // Best effort: one failed write does not stop the batch.
                Err(e) => error!(meal_id = %meal.id, error = %e, "fan-out write failed"),
            }
        }

        info!(food_id, updated_count, "fan-out update finished");
        Ok(updated_count)
    }

    async fn backup_data(&self) -> Result<BackupReport, DbError> {
        let prefix = backup_prefix(Utc::now().date_naive());
        let db = self.database()?;
        let mut report = BackupReport {
            success: false,
            prefix: prefix.clone(),
            food_items_count: 0,
            meals_count: 0,
            error: None,
        };

        let foods = match self.read_all_foods().await {
            Ok(foods) => foods,
            Err(e) => {
                report.error = Some(e.to_string());
                return Ok(report);
            }
        };
        if !foods.is_empty() {
            let shadow = db.collection::<FoodItem>(&format!("{prefix}_{FOOD_ITEMS_COLLECTION}"));
            if let Err(e) = shadow.insert_many(&foods).await {
                error!(error = %e, "backup of food items failed");
                report.error = Some(e.to_string());
                return Ok(report);
            }
        }
        report.food_items_count = foods.len();

        let meals = match self.read_all_meals().await {
            Ok(meals) => meals,
            Err(e) => {
                report.error = Some(e.to_string());
                return Ok(report);
            }
        };
        if !meals.is_empty() {
            let shadow = db.collection::<SubmittedMeal>(&format!("{prefix}_{MEALS_COLLECTION}"));
            if let Err(e) = shadow.insert_many(&meals).await {
                error!(error = %e, "backup of meals failed");
                report.error = Some(e.to_string());
                return Ok(report);
            }
        }
        report.meals_count = meals.len();

        report.success = true;
        info!(prefix = %report.prefix, "backup complete");
        Ok(report)
    }

    async fn export_collections(&self) -> Result<ExportData, DbError> {
        Ok(ExportData {
            food_items: self.read_all_foods().await?,
            meals: self.read_all_meals().await?,
        })
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    async fn create_tags_collection(&self) -> Result<usize, DbError> {
        let foods = self.read_all_foods().await?;
        let now = now_millis();
        let mut tags: Vec<TagSummary> = tag::count_tags(&foods)
            .into_iter()
            .map(|(name, count)| TagSummary::new(name, count, now))
            .collect();
        tag::rank(&mut tags);

        let collection = self.tags_collection()?;
        collection.delete_many(doc! {}).await?;
        if !tags.is_empty() {
            collection.insert_many(&tags).await?;
        }

        info!(tags_created = tags.len(), "rebuilt tags collection");
        Ok(tags.len())
    }

    async fn get_tags(&self) -> Result<Vec<TagSummary>, DbError> {
        let collection = self.tags_collection()?;
        let mut tags: Vec<TagSummary> = timed(READ_TIMEOUT, async move {
            let cursor = collection.find(doc! {}).await?;
            Ok(cursor.try_collect().await?)
        })
        .await?;
        tag::rank(&mut tags);
        Ok(tags)
    }

    async fn update_tag_counts(&self) -> Result<Vec<TagSummary>, DbError> {
        let foods = self.read_all_foods().await?;
        let existing = self.get_tags().await?;
        let now = now_millis();

        let mut refreshed: Vec<TagSummary> = tag::count_tags(&foods)
            .into_iter()
            .map(|(name, count)| {
                let created_at = existing
                    .iter()
                    .find(|t| t.name == name)
                    .map(|t| t.created_at)
                    .unwrap_or(now);
                TagSummary {
                    name,
                    count,
                    created_at,
                    last_updated: now,
                }
            })
            .collect();
        tag::rank(&mut refreshed);

        let collection = self.tags_collection()?;
        collection.delete_many(doc! {}).await?;
        if !refreshed.is_empty() {
            collection.insert_many(&refreshed).await?;
        }

        Ok(refreshed)
    }

    async fn migrate_category_to_tags(&self) -> Result<MigrationReport, DbError> {
        let foods = self.read_all_foods().await?;
        let collection = self.foods()?;
        let mut report = MigrationReport::default();

        for mut food in foods {
            if !food.absorb_category() {
                report.skipped += 1;
                continue;
            }

            let write = collection
                .update_one(
                    doc! { "id": &food.id },
                    doc! {
                        "$set": { "tags": to_bson(&food.tags)?, "updatedAt": now_wire() },
                        "$unset": { "category": "" },
                    },
                )
                .await;
            match write {
                Ok(_) => report.migrated += 1,
                Err(e) => {
                    error!(id = %food.id, error = %e, "category migration failed for item");
                    report.failed += 1;
                }
            }
        }

        info!(
            migrated = report.migrated,
            skipped = report.skipped,
            failed = report.failed,
            "category migration finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_page_filter_first_page_is_unfiltered() {
        let filter = page_filter(None).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_page_filter_resumes_strictly_after_cursor() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let filter = page_filter(Some(Cursor::Document {
            timestamp: ts,
            id: "meal-2025-01-01-0800-00-abc".into(),
        }))
        .unwrap();

        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
        let first = clauses[0].as_document().unwrap();
        assert_eq!(
            first
                .get_document("timestamp")
                .unwrap()
                .get_str("$lt")
                .unwrap(),
            "2025-01-01T08:00:00.000Z"
        );
    }

    #[test]
    fn test_page_filter_rejects_offset_cursor() {
        let err = page_filter(Some(Cursor::Offset(3))).unwrap_err();
        assert!(matches!(err, DbError::ForeignCursor));
    }

    #[test]
    fn test_page_sort_is_newest_first() {
        let sort = page_sort();
        assert_eq!(sort.get_i32("timestamp").unwrap(), -1);
        assert_eq!(sort.get_i32("id").unwrap(), -1);
    }
}
