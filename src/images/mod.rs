//! Vendor collaborators for food imagery: a hosting service that stores
//! blobs and derives transformed URLs, and a stock-photo search service.
//! Both are thin clients; all real image processing happens vendor-side.

mod cloudinary;
mod local;
mod mock;
mod pixabay;

pub use cloudinary::CloudinaryImageHosting;
pub use local::LocalImageHosting;
pub use mock::MockImageSearch;
pub use pixabay::PixabayImageSearch;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image API returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("image search API key is not configured")]
    MissingApiKey,
}

/// Parameters for thumbnail-style URL optimization.
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    pub width: u32,
    pub height: u32,
    pub crop: String,
    pub gravity: String,
    pub quality: String,
    pub format: String,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            width: 120,
            height: 120,
            crop: "fill".into(),
            gravity: "auto:subject".into(),
            quality: "auto".into(),
            format: "auto".into(),
        }
    }
}

/// Parameters for subject-centered crops.
#[derive(Debug, Clone)]
pub struct CenterOptions {
    pub width: u32,
    pub height: u32,
    pub crop: String,
    pub zoom: f32,
    pub remove_background: bool,
}

impl Default for CenterOptions {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            crop: "fill".into(),
            zoom: 1.0,
            remove_background: false,
        }
    }
}

/// Named enhancement effects applied vendor-side.
#[derive(Debug, Clone)]
pub struct EnhanceOptions {
    pub improve: bool,
    pub color: bool,
    pub redeye: bool,
    /// Brightening level, 0-100; 0 disables.
    pub brightening: u8,
    pub blur_faces: bool,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self {
            improve: true,
            color: false,
            redeye: false,
            brightening: 0,
            blur_faces: false,
        }
    }
}

/// Parameters for a stock-photo search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub per_page: u32,
    pub safesearch: bool,
    pub image_type: String,
    pub category: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            per_page: 12,
            safesearch: true,
            image_type: "photo".into(),
            category: "food".into(),
        }
    }
}

/// A search hit normalized to a vendor-independent shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub id: u64,
    pub thumbnail_url: String,
    pub small_image_url: String,
    pub large_image_url: String,
    pub width: u32,
    pub height: u32,
    /// Comma-separated vendor tags.
    pub tags: String,
    pub user: String,
    #[serde(default)]
    pub page_url: String,
}

/// Stores food images and derives transformed URLs. Transformations are pure
/// string rewrites; implementations without a transformation pipeline return
/// the URL unchanged.
#[async_trait]
pub trait ImageHosting: Send + Sync {
    /// Uploads a blob and returns its canonical URL.
    async fn upload_image(&self, image: Bytes, item_id: &str) -> Result<String, ImageError>;

    /// Deletes by URL. Returns `false` when the hosting vendor cannot delete
    /// from the client side.
    async fn delete_image(&self, image_url: &str) -> Result<bool, ImageError>;

    fn optimize_url(&self, url: &str, options: &OptimizeOptions) -> String;

    fn center_object(&self, url: &str, options: &CenterOptions) -> String;

    fn enhance_url(&self, url: &str, options: &EnhanceOptions) -> String;
}

/// Searches a stock-photo vendor and fetches images as bytes.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search_images(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ImageResult>, ImageError>;

    async fn fetch_image(&self, image_url: &str) -> Result<Bytes, ImageError>;
}
