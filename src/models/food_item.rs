use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::rfc3339_millis;

/// A catalog entry. The `id` is assigned at creation (caller-supplied or
/// derived from the name) and never changes; re-saving an item under the same
/// id overwrites the stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    #[serde(default)]
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
    /// Legacy single-category field superseded by `tags`. Only present on
    /// documents written before the migration; never set on new items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(with = "rfc3339_millis")]
    pub updated_at: DateTime<Utc>,
}

impl FoodItem {
    /// Creates an item with no id yet; `save_food_item` assigns one.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            tags: Vec::new(),
            default_amount: "100g".to_string(),
            calories: 0.0,
            image: None,
            category: None,
            updated_at: super::now_millis(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_calories(mut self, calories: f64) -> Self {
        self.calories = calories;
        self
    }

    pub fn with_default_amount(mut self, amount: impl Into<String>) -> Self {
        self.default_amount = amount.into();
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    /// Folds the legacy `category` value into `tags` and clears it.
    ///
    /// Returns `true` when the item carried a category (even one already
    /// covered by `tags` — stripping it still changes the document).
    pub fn absorb_category(&mut self) -> bool {
        let Some(category) = self.category.take() else {
            return false;
        };

        let category = category.trim().to_string();
        if !category.is_empty()
            && !self
                .tags
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&category))
        {
            self.tags.push(category);
        }
        true
    }
}

impl fmt::Display for FoodItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} kcal/100g)", self.name, self.calories)?;
        if !self.tags.is_empty() {
            write!(f, " [{}]", self.tags.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_food_item_new() {
        let item = FoodItem::new("Apple");
        assert_eq!(item.name, "Apple");
        assert!(item.id.is_empty());
        assert!(item.tags.is_empty());
        assert_eq!(item.default_amount, "100g");
        assert!(item.category.is_none());
    }

    #[test]
    fn test_food_item_builder() {
        let item = FoodItem::new("Chicken Breast")
            .with_id("chicken-breast-123456")
            .with_tags(vec!["meat".into(), "protein".into()])
            .with_calories(165.0)
            .with_image("https://example.com/chicken.jpg");

        assert_eq!(item.id, "chicken-breast-123456");
        assert_eq!(item.tags.len(), 2);
        assert_eq!(item.calories, 165.0);
        assert!(item.image.is_some());
    }

    #[test]
    fn test_absorb_category_moves_into_tags() {
        let mut item = FoodItem::new("Apple");
        item.category = Some("fruits".into());

        assert!(item.absorb_category());
        assert_eq!(item.tags, vec!["fruits".to_string()]);
        assert!(item.category.is_none());
    }

    #[test]
    fn test_absorb_category_skips_duplicate_tag() {
        let mut item = FoodItem::new("Apple").with_tags(vec!["Fruits".into()]);
        item.category = Some("fruits".into());

        assert!(item.absorb_category());
        assert_eq!(item.tags, vec!["Fruits".to_string()]);
    }

    #[test]
    fn test_absorb_category_without_category_is_noop() {
        let mut item = FoodItem::new("Apple").with_tags(vec!["fruits".into()]);
        assert!(!item.absorb_category());
        assert_eq!(item.tags, vec!["fruits".to_string()]);
    }

    #[test]
    fn test_json_shape_uses_camel_case() {
        let item = FoodItem::new("Apple").with_id("apple-123456");
        let json = serde_json::to_value(&item).unwrap();

        assert!(json.get("defaultAmount").is_some());
        assert!(json.get("updatedAt").is_some());
        // Absent optional fields stay out of the document entirely.
        assert!(json.get("image").is_none());
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_legacy_document_deserializes() {
        let json = r#"{
            "id": "apple-test-123456",
            "name": "Apple",
            "calories": 52,
            "category": "fruits",
            "defaultAmount": "100g",
            "updatedAt": "2025-01-01T12:00:00.000Z"
        }"#;

        let item: FoodItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.category.as_deref(), Some("fruits"));
        assert!(item.tags.is_empty());
    }
}
