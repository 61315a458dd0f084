//! Mealbasket core library
//!
//! Meal logging over a hosted document store: a tag-organized food catalog,
//! a basket of item snapshots, and a history of submitted meals. Persistence
//! sits behind the [`db::DatabaseService`] contract with hosted, in-memory,
//! and failover backends; food imagery goes through thin vendor clients in
//! [`images`]; presentation state lives in the explicit containers under
//! [`stores`].

pub mod config;
pub mod container;
pub mod db;
pub mod ids;
pub mod images;
pub mod models;
pub mod stores;

pub use config::{BackendKind, Config, ConfigError};
pub use container::Container;
pub use db::{
    BackupReport, Cursor, DatabaseService, DbError, ExportData, FailoverDatabaseService,
    InMemoryDatabaseService, MealPage, MigrationReport, MongoDatabaseService, SeedData,
    SeedSummary,
};
pub use images::{
    CenterOptions, CloudinaryImageHosting, EnhanceOptions, ImageError, ImageHosting, ImageResult,
    ImageSearch, LocalImageHosting, MockImageSearch, OptimizeOptions, PixabayImageSearch,
    SearchOptions,
};
pub use models::{FoodItem, MealItem, SubmittedMeal, TagSummary};
pub use stores::{Basket, DefaultAmount, FoodDefaults, Language, LanguageStore};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
