use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::food_item::FoodItem;
use super::rfc3339_millis;

/// A derived aggregate over [`FoodItem::tags`]: how many catalog entries
/// currently carry a tag. Rebuildable from the food collection at any time;
/// not guaranteed fresh between rebuilds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    /// Normalized lowercase tag name.
    pub name: String,
    pub count: u32,
    #[serde(with = "rfc3339_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "rfc3339_millis")]
    pub last_updated: DateTime<Utc>,
}

impl TagSummary {
    pub fn new(name: impl Into<String>, count: u32, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            count,
            created_at: now,
            last_updated: now,
        }
    }
}

/// Counts how many food items carry each tag, normalizing names to trimmed
/// lowercase. A duplicate tag on the same item counts once.
pub fn count_tags(foods: &[FoodItem]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for food in foods {
        let mut seen = HashSet::new();
        for tag in &food.tags {
            let name = tag.trim().to_lowercase();
            if !name.is_empty() && seen.insert(name.clone()) {
                *counts.entry(name).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Orders tags for display: highest count first, ties broken by
/// case-insensitive name.
pub fn rank(tags: &mut [TagSummary]) {
    tags.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(name: &str, tags: &[&str]) -> FoodItem {
        FoodItem::new(name).with_tags(tags.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_count_tags_across_items() {
        let foods = vec![
            food("Apple", &["fruits", "healthy"]),
            food("Banana", &["fruits"]),
        ];

        let counts = count_tags(&foods);
        assert_eq!(counts.get("fruits"), Some(&2));
        assert_eq!(counts.get("healthy"), Some(&1));
    }

    #[test]
    fn test_count_tags_normalizes_case_and_whitespace() {
        let foods = vec![food("Apple", &["Fruits "]), food("Banana", &["fruits"])];
        let counts = count_tags(&foods);
        assert_eq!(counts.get("fruits"), Some(&2));
    }

    #[test]
    fn test_duplicate_tag_on_one_item_counts_once() {
        let foods = vec![food("Apple", &["fruits", "FRUITS"])];
        let counts = count_tags(&foods);
        assert_eq!(counts.get("fruits"), Some(&1));
    }

    #[test]
    fn test_rank_orders_by_count_then_name() {
        let now = Utc::now();
        let mut tags = vec![
            TagSummary::new("meat", 1, now),
            TagSummary::new("fruits", 2, now),
            TagSummary::new("grains", 1, now),
        ];

        rank(&mut tags);
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["fruits", "grains", "meat"]);
    }
}
