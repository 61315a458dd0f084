//! Presentation-state containers: the basket being assembled, per-food
//! default amounts, and the UI language.
//!
//! Each store is an explicit value with subscribe/update operations (tokio
//! `watch` channels), owned by whoever composes the app. None of them
//! persists anything; the database service is injected where a store needs
//! to write through.

pub mod basket;
pub mod food_defaults;
pub mod language;

pub use basket::Basket;
pub use food_defaults::{DefaultAmount, FoodDefaults};
pub use language::{Language, LanguageStore};
