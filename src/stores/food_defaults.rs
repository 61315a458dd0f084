use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::watch;

/// Fallback amount when the user never set one for a food.
const FALLBACK_AMOUNT: &str = "100g";

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAmount {
    pub amount: String,
    pub last_used: DateTime<Utc>,
}

/// Remembers the amount last used per food so the amount dialog can
/// pre-fill it.
pub struct FoodDefaults {
    tx: watch::Sender<HashMap<String, DefaultAmount>>,
}

impl Default for FoodDefaults {
    fn default() -> Self {
        Self::new()
    }
}

impl FoodDefaults {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(HashMap::new());
        Self { tx }
    }

    pub fn set_default(&self, food_id: impl Into<String>, amount: impl Into<String>) {
        let food_id = food_id.into();
        let entry = DefaultAmount {
            amount: amount.into(),
            last_used: Utc::now(),
        };
        self.tx.send_modify(|defaults| {
            defaults.insert(food_id, entry);
        });
    }

    /// The remembered amount for a food, or `"100g"`.
    pub fn default_for(&self, food_id: &str) -> String {
        self.tx
            .borrow()
            .get(food_id)
            .map(|d| d.amount.clone())
            .unwrap_or_else(|| FALLBACK_AMOUNT.to_string())
    }

    pub fn subscribe(&self) -> watch::Receiver<HashMap<String, DefaultAmount>> {
        self.tx.subscribe()
    }
}
