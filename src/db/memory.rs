//! Pure in-memory backend: two ordered collections behind a lock.
//!
//! Used for deterministic tests, as the local-mode store, and as the mirror
//! inside [`FailoverDatabaseService`](super::FailoverDatabaseService). Can be
//! seeded with a fixture dataset and cleared.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    backup_prefix, BackupReport, Cursor, DatabaseService, DbError, ExportData, MealPage,
    MigrationReport,
};
use crate::ids::generate_food_id;
use crate::models::{now_millis, tag, FoodItem, MealItem, SubmittedMeal, TagSummary};

/// Fixture dataset for seeding test environments.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub food_items: Vec<FoodItem>,
    pub meals: Vec<SubmittedMeal>,
}

impl SeedData {
    /// The default fixture: three catalog entries and one logged meal.
    pub fn fixture() -> Self {
        let updated_at = "2025-01-01T12:00:00.000Z"
            .parse::<DateTime<Utc>>()
            .expect("fixture timestamp");

        let apple = FoodItem {
            id: "apple-test-123456".into(),
            name: "Apple".into(),
            tags: vec!["fruits".into()],
            default_amount: "100g".into(),
            calories: 52.0,
            image: None,
            category: None,
            updated_at,
        };
        let chicken = FoodItem {
            id: "chicken-breast-test-123457".into(),
            name: "Chicken Breast".into(),
            tags: vec!["meat".into()],
            default_amount: "100g".into(),
            calories: 165.0,
            image: None,
            category: None,
            updated_at,
        };
        let rice = FoodItem {
            id: "brown-rice-test-123458".into(),
            name: "Brown Rice".into(),
            tags: vec!["grains".into()],
            default_amount: "100g".into(),
            calories: 112.0,
            image: None,
            category: None,
            updated_at,
        };

        let meal = SubmittedMeal {
            id: "meal-test-1".into(),
            items: vec![
                MealItem::from_food(&apple, "1"),
                MealItem::from_food(&chicken, "100g"),
            ],
            timestamp: "2025-01-01T08:00:00.000Z".parse().expect("fixture timestamp"),
            submitted_at: "2025-01-01T08:05:00.000Z".parse().expect("fixture timestamp"),
            last_updated: None,
        };

        Self {
            food_items: vec![apple, chicken, rice],
            meals: vec![meal],
        }
    }
}

/// Counts reported by [`InMemoryDatabaseService::seed`] and
/// [`InMemoryDatabaseService::clear_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub food_items_count: usize,
    pub meals_count: usize,
}

#[derive(Default)]
struct MemoryState {
    food_items: Vec<FoodItem>,
    meals: Vec<SubmittedMeal>,
    tags: Vec<TagSummary>,
    backups: HashMap<String, ExportData>,
}

#[derive(Default)]
pub struct InMemoryDatabaseService {
    state: RwLock<MemoryState>,
}

impl InMemoryDatabaseService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces (or extends) the stored collections with the given dataset.
    pub async fn seed(&self, data: SeedData, clear_existing: bool) -> SeedSummary {
        let mut state = self.state.write().await;
        if clear_existing {
            state.food_items.clear();
            state.meals.clear();
        }
        state.food_items.extend(data.food_items);
        state.meals.extend(data.meals);

        let summary = SeedSummary {
            food_items_count: state.food_items.len(),
            meals_count: state.meals.len(),
        };
        debug!(
            food_items = summary.food_items_count,
            meals = summary.meals_count,
            "seeded in-memory database"
        );
        summary
    }

    /// Empties every collection, returning the counts that were dropped.
    pub async fn clear_all(&self) -> SeedSummary {
        let mut state = self.state.write().await;
        let summary = SeedSummary {
            food_items_count: state.food_items.len(),
            meals_count: state.meals.len(),
        };
        state.food_items.clear();
        state.meals.clear();
        state.tags.clear();
        debug!("cleared in-memory database");
        summary
    }

    /// Replaces the food catalog wholesale. Used by the failover backend to
    /// refresh its mirror from a successful hosted read.
    pub(crate) async fn replace_food_items(&self, items: Vec<FoodItem>) {
        self.state.write().await.food_items = items;
    }

    /// Upserts a fully-formed meal record, keeping the id the primary backend
    /// assigned. Used by the failover backend's write-through mirroring.
    pub(crate) async fn record_meal(&self, meal: SubmittedMeal) {
        let mut state = self.state.write().await;
        match state.meals.iter_mut().find(|m| m.id == meal.id) {
            Some(existing) => *existing = meal,
            None => state.meals.push(meal),
        }
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabaseService {
    async fn get_food_items(&self) -> Result<Vec<FoodItem>, DbError> {
        Ok(self.state.read().await.food_items.clone())
    }

    async fn save_food_item(&self, mut item: FoodItem) -> Result<String, DbError> {
        if item.id.is_empty() {
            item.id = generate_food_id(&item.name);
        }
        item.updated_at = now_millis();
        let id = item.id.clone();

        let mut state = self.state.write().await;
        match state.food_items.iter_mut().find(|f| f.id == id) {
            Some(existing) => *existing = item,
            None => state.food_items.push(item),
        }
        Ok(id)
    }

    async fn update_food_item(&self, item: FoodItem) -> Result<(), DbError> {
        if item.id.is_empty() {
            warn!("update_food_item called without an id; ignoring");
            return Ok(());
        }

        let mut state = self.state.write().await;
        match state.food_items.iter_mut().find(|f| f.id == item.id) {
            Some(existing) => {
                existing.name = item.name;
                existing.tags = item.tags;
                existing.default_amount = item.default_amount;
                existing.calories = item.calories;
                if item.image.is_some() {
                    existing.image = item.image;
                }
                if item.category.is_some() {
                    existing.category = item.category;
                }
                existing.updated_at = now_millis();
            }
            None => warn!(id = %item.id, "update_food_item: no such item"),
        }
        Ok(())
    }

    async fn delete_food_item(&self, food_id: &str) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        let before = state.food_items.len();
        state.food_items.retain(|f| f.id != food_id);
        if state.food_items.len() == before {
            debug!(id = %food_id, "delete_food_item: no such item");
        }
        Ok(())
    }

    async fn get_submitted_meals_paginated(
        &self,
        page_size: usize,
        cursor: Option<Cursor>,
    ) -> Result<MealPage, DbError> {
        let start = match cursor {
            None => 0,
            Some(Cursor::Offset(index)) => index + 1,
            Some(Cursor::Document { .. }) => return Err(DbError::ForeignCursor),
        };

        let state = self.state.read().await;
        let mut sorted: Vec<&SubmittedMeal> = state.meals.iter().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let end = (start + page_size).min(sorted.len());
        let meals: Vec<SubmittedMeal> = sorted
            .get(start..end)
            .unwrap_or(&[])
            .iter()
            .map(|m| (*m).clone())
            .collect();

        let last_visible = if meals.is_empty() {
            None
        } else {
            Some(Cursor::Offset(start + meals.len() - 1))
        };

        Ok(MealPage {
            last_visible,
            has_next_page: end < sorted.len(),
            meals,
        })
    }

    async fn save_submitted_meal(
        &self,
        items: Vec<MealItem>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<String, DbError> {
        let meal = SubmittedMeal::new(items, timestamp);
        let id = meal.id.clone();
        self.state.write().await.meals.push(meal);
        Ok(id)
    }

    async fn update_submitted_meal(&self, meal: &SubmittedMeal) -> Result<String, DbError> {
        let mut state = self.state.write().await;
        match state.meals.iter_mut().find(|m| m.id == meal.id) {
            Some(existing) => {
                existing.items = meal.items.clone();
                existing.last_updated = Some(now_millis());
                Ok(meal.id.clone())
            }
            None => Err(DbError::MealNotFound(meal.id.clone())),
        }
    }

    async fn delete_submitted_meal(&self, meal_id: &str) -> Result<bool, DbError> {
        let mut state = self.state.write().await;
        match state.meals.iter().position(|m| m.id == meal_id) {
            Some(index) => {
                state.meals.remove(index);
                Ok(true)
            }
            None => Err(DbError::MealNotFound(meal_id.to_string())),
        }
    }

    async fn update_meals_with_food_item(
        &self,
        food_id: &str,
        updated: &FoodItem,
    ) -> Result<usize, DbError> {
        let mut state = self.state.write().await;
        let mut updated_count = 0;

        for meal in &mut state.meals {
            if !meal.contains_food(food_id) {
                continue;
            }
            for item in &mut meal.items {
                if item.id == food_id {
                    *item = item.refreshed_from(updated);
                }
            }
            updated_count += 1;
        }

        Ok(updated_count)
    }

    async fn backup_data(&self) -> Result<BackupReport, DbError> {
        let mut state = self.state.write().await;
        let prefix = backup_prefix(Utc::now().date_naive());
        let snapshot = ExportData {
            food_items: state.food_items.clone(),
            meals: state.meals.clone(),
        };
        let report = BackupReport {
            success: true,
            prefix: prefix.clone(),
            food_items_count: snapshot.food_items.len(),
            meals_count: snapshot.meals.len(),
            error: None,
        };
        state.backups.insert(prefix, snapshot);
        Ok(report)
    }

    async fn export_collections(&self) -> Result<ExportData, DbError> {
        let state = self.state.read().await;
        Ok(ExportData {
            food_items: state.food_items.clone(),
            meals: state.meals.clone(),
        })
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn create_tags_collection(&self) -> Result<usize, DbError> {
        let mut state = self.state.write().await;
        let now = now_millis();
        let mut tags: Vec<TagSummary> = tag::count_tags(&state.food_items)
            .into_iter()
            .map(|(name, count)| TagSummary::new(name, count, now))
            .collect();
        tag::rank(&mut tags);

        let created = tags.len();
        state.tags = tags;
        Ok(created)
    }

    async fn get_tags(&self) -> Result<Vec<TagSummary>, DbError> {
        Ok(self.state.read().await.tags.clone())
    }

    async fn update_tag_counts(&self) -> Result<Vec<TagSummary>, DbError> {
        let mut state = self.state.write().await;
        let now = now_millis();

        let mut refreshed: Vec<TagSummary> = tag::count_tags(&state.food_items)
            .into_iter()
            .map(|(name, count)| {
                let created_at = state
                    .tags
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

        state.tags = refreshed.clone();
        Ok(refreshed)
    }

    async fn migrate_category_to_tags(&self) -> Result<MigrationReport, DbError> {
        let mut state = self.state.write().await;
        let mut report = MigrationReport::default();

        for food in &mut state.food_items {
            if food.absorb_category() {
                food.updated_at = now_millis();
                report.migrated += 1;
            } else {
                report.skipped += 1;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn apple() -> FoodItem {
        FoodItem::new("Apple")
            .with_tags(vec!["fruits".into()])
            .with_calories(52.0)
    }

    async fn db_with_meals(count: usize) -> InMemoryDatabaseService {
        let db = InMemoryDatabaseService::new();
        let food = apple().with_id("apple-123456");
        for i in 0..count {
            let ts = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
                + chrono::Duration::hours(i as i64);
            db.save_submitted_meal(vec![MealItem::from_food(&food, "1")], Some(ts))
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_save_without_id_assigns_stable_slug_id() {
        let db = InMemoryDatabaseService::new();
        let id = db.save_food_item(apple()).await.unwrap();

        assert!(id.starts_with("apple-"));
        let tail = id.rsplit('-').next().unwrap();
        assert_eq!(tail.len(), 6);
        assert!(tail.chars().all(|c| c.is_ascii_digit()));

        let items = db.get_food_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert!(items[0].tags.contains(&"fruits".to_string()));

        // Stable across reads.
        let again = db.get_food_items().await.unwrap();
        assert_eq!(again[0].id, id);
    }

    #[tokio::test]
    async fn test_resave_with_same_id_overwrites() {
        let db = InMemoryDatabaseService::new();
        let id = db.save_food_item(apple()).await.unwrap();

        let replacement = apple().with_id(id.clone()).with_calories(55.0);
        let confirmed = db.save_food_item(replacement).await.unwrap();
        assert_eq!(confirmed, id);

        let items = db.get_food_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].calories, 55.0);
    }

    #[tokio::test]
    async fn test_update_without_id_is_logged_noop() {
        let db = InMemoryDatabaseService::new();
        db.save_food_item(apple()).await.unwrap();

        db.update_food_item(FoodItem::new("Ghost")).await.unwrap();
        assert_eq!(db.get_food_items().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_image_when_absent() {
        let db = InMemoryDatabaseService::new();
        let id = db
            .save_food_item(apple().with_image("https://img.example/apple.jpg"))
            .await
            .unwrap();

        let patch = apple().with_id(id.clone()).with_calories(54.0);
        db.update_food_item(patch).await.unwrap();

        let items = db.get_food_items().await.unwrap();
        assert_eq!(items[0].calories, 54.0);
        assert_eq!(items[0].image.as_deref(), Some("https://img.example/apple.jpg"));
    }

    #[tokio::test]
    async fn test_delete_unknown_food_is_silent() {
        let db = InMemoryDatabaseService::new();
        db.delete_food_item("no-such-id").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_unknown_meal_fails() {
        let db = InMemoryDatabaseService::new();
        let err = db.delete_submitted_meal("no-such-meal").await.unwrap_err();
        assert!(matches!(err, DbError::MealNotFound(_)));
    }

    #[tokio::test]
    async fn test_pagination_chains_through_every_meal_once() {
        let db = db_with_meals(5).await;

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = db.get_submitted_meals_paginated(2, cursor).await.unwrap();
            for meal in &page.meals {
                assert!(!seen.contains(&meal.id), "duplicate meal {}", meal.id);
                seen.push(meal.id.clone());
            }
            if !page.has_next_page {
                break;
            }
            cursor = page.last_visible;
        }

        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn test_pagination_is_newest_first_and_exact_at_boundary() {
        let db = db_with_meals(4).await;

        let first = db.get_submitted_meals_paginated(2, None).await.unwrap();
        assert_eq!(first.meals.len(), 2);
        assert!(first.meals[0].timestamp > first.meals[1].timestamp);
        assert!(first.has_next_page);

        let second = db
            .get_submitted_meals_paginated(2, first.last_visible)
            .await
            .unwrap();
        assert_eq!(second.meals.len(), 2);
        // Collection size is an exact multiple of the page size; the
        // in-memory backend knows there is nothing after this page.
        assert!(!second.has_next_page);
    }

    #[tokio::test]
    async fn test_foreign_cursor_is_rejected() {
        let db = db_with_meals(2).await;
        let err = db
            .get_submitted_meals_paginated(
                2,
                Some(Cursor::Document {
                    timestamp: Utc::now(),
                    id: "meal-x".into(),
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignCursor));
    }

    #[tokio::test]
    async fn test_save_meal_id_shape_and_visibility() {
        let db = InMemoryDatabaseService::new();
        let food = apple().with_id("apple-123456");
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();

        let id = db
            .save_submitted_meal(vec![MealItem::from_food(&food, "1")], Some(ts))
            .await
            .unwrap();
        assert!(id.starts_with("meal-2025-01-01-0800-00-"));

        let page = db.get_submitted_meals_paginated(10, None).await.unwrap();
        assert!(page.meals.iter().any(|m| m.id == id));
    }

    #[tokio::test]
    async fn test_fanout_preserves_amounts_and_counts_meals() {
        let db = InMemoryDatabaseService::new();
        let food = apple().with_id("apple-123456");
        let other = FoodItem::new("Banana").with_id("banana-654321");

        db.save_submitted_meal(
            vec![
                MealItem::from_food(&food, "250g"),
                MealItem::from_food(&other, "1"),
            ],
            None,
        )
        .await
        .unwrap();
        db.save_submitted_meal(vec![MealItem::from_food(&food, "2")], None)
            .await
            .unwrap();
        db.save_submitted_meal(vec![MealItem::from_food(&other, "3")], None)
            .await
            .unwrap();

        let updated = food
            .clone()
            .with_tags(vec!["fruits".into(), "healthy".into()])
            .with_calories(54.0);
        let count = db
            .update_meals_with_food_item("apple-123456", &updated)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let export = db.export_collections().await.unwrap();
        let amounts: Vec<&str> = export
            .meals
            .iter()
            .flat_map(|m| &m.items)
            .filter(|i| i.id == "apple-123456")
            .map(|i| i.amount.as_str())
            .collect();
        assert_eq!(amounts, vec!["250g", "2"]);
        assert!(export
            .meals
            .iter()
            .flat_map(|m| &m.items)
            .filter(|i| i.id == "apple-123456")
            .all(|i| i.calories == 54.0));

        // The unrelated snapshot is untouched.
        assert!(export
            .meals
            .iter()
            .flat_map(|m| &m.items)
            .filter(|i| i.id == "banana-654321")
            .all(|i| i.calories == 0.0));
    }

    #[tokio::test]
    async fn test_deleting_food_does_not_cascade_into_meals() {
        let db = InMemoryDatabaseService::new();
        let food = apple().with_id("apple-123456");
        db.save_food_item(food.clone()).await.unwrap();
        db.save_submitted_meal(vec![MealItem::from_food(&food, "1")], None)
            .await
            .unwrap();

        db.delete_food_item("apple-123456").await.unwrap();

        assert!(db.get_food_items().await.unwrap().is_empty());
        let export = db.export_collections().await.unwrap();
        assert_eq!(export.meals[0].items[0].id, "apple-123456");
        assert_eq!(export.meals[0].items[0].name, "Apple");
    }

    #[tokio::test]
    async fn test_update_meal_replaces_items_and_stamps_last_updated() {
        let db = InMemoryDatabaseService::new();
        let food = apple().with_id("apple-123456");
        let id = db
            .save_submitted_meal(vec![MealItem::from_food(&food, "1")], None)
            .await
            .unwrap();

        let mut page = db.get_submitted_meals_paginated(10, None).await.unwrap();
        let mut meal = page.meals.remove(0);
        meal.items = vec![MealItem::from_food(&food, "2")];

        let confirmed = db.update_submitted_meal(&meal).await.unwrap();
        assert_eq!(confirmed, id);

        let export = db.export_collections().await.unwrap();
        assert_eq!(export.meals[0].items[0].amount, "2");
        assert!(export.meals[0].last_updated.is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_meal_fails() {
        let db = InMemoryDatabaseService::new();
        let meal = SubmittedMeal::new(vec![], None);
        let err = db.update_submitted_meal(&meal).await.unwrap_err();
        assert!(matches!(err, DbError::MealNotFound(_)));
    }

    #[tokio::test]
    async fn test_tag_aggregation_ranks_by_count() {
        let db = InMemoryDatabaseService::new();
        db.save_food_item(apple().with_tags(vec!["fruits".into(), "healthy".into()]))
            .await
            .unwrap();
        db.save_food_item(FoodItem::new("Banana").with_tags(vec!["fruits".into()]))
            .await
            .unwrap();

        let created = db.create_tags_collection().await.unwrap();
        assert_eq!(created, 2);

        let tags = db.update_tag_counts().await.unwrap();
        assert_eq!(tags[0].name, "fruits");
        assert_eq!(tags[0].count, 2);
        assert_eq!(tags[1].name, "healthy");
        assert_eq!(tags[1].count, 1);

        let listed = db.get_tags().await.unwrap();
        assert_eq!(listed, tags);
    }

    #[tokio::test]
    async fn test_update_tag_counts_preserves_created_at() {
        let db = InMemoryDatabaseService::new();
        db.save_food_item(apple()).await.unwrap();
        db.create_tags_collection().await.unwrap();
        let original = db.get_tags().await.unwrap();

        db.save_food_item(FoodItem::new("Banana").with_tags(vec!["fruits".into()]))
            .await
            .unwrap();
        let refreshed = db.update_tag_counts().await.unwrap();

        let fruits = refreshed.iter().find(|t| t.name == "fruits").unwrap();
        assert_eq!(fruits.count, 2);
        assert_eq!(fruits.created_at, original[0].created_at);
    }

    #[tokio::test]
    async fn test_migration_folds_category_into_tags() {
        let db = InMemoryDatabaseService::new();
        let mut legacy = FoodItem::new("Apple").with_id("apple-1");
        legacy.category = Some("fruits".into());
        db.seed(
            SeedData {
                food_items: vec![legacy, FoodItem::new("Banana").with_id("banana-1")],
                meals: vec![],
            },
            true,
        )
        .await;

        let report = db.migrate_category_to_tags().await.unwrap();
        assert_eq!(report.migrated, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);

        let items = db.get_food_items().await.unwrap();
        let apple = items.iter().find(|f| f.id == "apple-1").unwrap();
        assert!(apple.category.is_none());
        assert_eq!(apple.tags, vec!["fruits".to_string()]);
    }

    #[tokio::test]
    async fn test_seed_fixture_and_clear() {
        let db = InMemoryDatabaseService::new();
        let summary = db.seed(SeedData::fixture(), true).await;
        assert_eq!(summary.food_items_count, 3);
        assert_eq!(summary.meals_count, 1);

        let cleared = db.clear_all().await;
        assert_eq!(cleared.food_items_count, 3);
        assert!(db.get_food_items().await.unwrap().is_empty());
        assert!(db.get_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backup_reports_counts() {
        let db = InMemoryDatabaseService::new();
        db.seed(SeedData::fixture(), true).await;

        let report = db.backup_data().await.unwrap();
        assert!(report.success);
        assert!(report.prefix.starts_with("backup_"));
        assert_eq!(report.food_items_count, 3);
        assert_eq!(report.meals_count, 1);
    }
}
