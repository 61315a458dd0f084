use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::food_item::FoodItem;
use super::rfc3339_millis;
use crate::ids::generate_meal_id;

/// A denormalized copy of a [`FoodItem`] embedded in a meal, plus the amount
/// that was eaten. Meals own their snapshots: editing the catalog entry later
/// does not touch them unless an explicit fan-out update is run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub default_amount: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub amount: String,
}

impl MealItem {
    pub fn from_food(food: &FoodItem, amount: impl Into<String>) -> Self {
        Self {
            id: food.id.clone(),
            name: food.name.clone(),
            tags: food.tags.clone(),
            default_amount: food.default_amount.clone(),
            calories: food.calories,
            image: food.image.clone(),
            category: food.category.clone(),
            amount: amount.into(),
        }
    }

    /// Rebuilds the snapshot from an updated catalog entry, keeping this
    /// entry's own `amount`. Used by the fan-out update over meals.
    pub fn refreshed_from(&self, food: &FoodItem) -> Self {
        Self::from_food(food, self.amount.clone())
    }
}

/// A logged eating event: an ordered list of item snapshots plus when the
/// meal was eaten (`timestamp`) and when the record was created
/// (`submitted_at`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedMeal {
    pub id: String,
    pub items: Vec<MealItem>,
    #[serde(with = "rfc3339_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "rfc3339_millis")]
    pub submitted_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rfc3339_millis::opt"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl SubmittedMeal {
    /// Creates a meal record with a timestamp-derived id. `timestamp` is when
    /// the meal was eaten; omitting it means "now".
    pub fn new(items: Vec<MealItem>, timestamp: Option<DateTime<Utc>>) -> Self {
        let timestamp = timestamp.unwrap_or_else(super::now_millis);
        Self {
            id: generate_meal_id("meal", Some(timestamp)),
            items,
            timestamp,
            submitted_at: super::now_millis(),
            last_updated: None,
        }
    }

    /// True when any item snapshot references the given food id.
    pub fn contains_food(&self, food_id: &str) -> bool {
        self.items.iter().any(|item| item.id == food_id)
    }
}

impl fmt::Display for SubmittedMeal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Meal {} ({})", self.id, self.timestamp.to_rfc3339())?;
        for item in &self.items {
            writeln!(f, "  - {} x {}", item.name, item.amount)?;
        }
        Ok(())
    }
}
