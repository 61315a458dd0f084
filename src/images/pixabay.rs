//! Pixabay stock-photo search client.
//! API reference: <https://pixabay.com/api/docs/>

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ImageError, ImageResult, ImageSearch, SearchOptions};

const API_ENDPOINT: &str = "https://pixabay.com/api/";

pub struct PixabayImageSearch {
    api_key: String,
    client: reqwest::Client,
}

impl PixabayImageSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        if api_key.is_empty() {
            warn!("no Pixabay API key configured; image search will fail");
        }
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: u64,
    #[serde(rename = "previewURL")]
    preview_url: String,
    #[serde(rename = "webformatURL")]
    webformat_url: String,
    #[serde(rename = "largeImageURL")]
    large_image_url: String,
    #[serde(rename = "imageWidth")]
    image_width: u32,
    #[serde(rename = "imageHeight")]
    image_height: u32,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    user: String,
    #[serde(rename = "pageURL", default)]
    page_url: String,
}

impl From<Hit> for ImageResult {
    fn from(hit: Hit) -> Self {
        Self {
            id: hit.id,
            thumbnail_url: hit.preview_url,
            small_image_url: hit.webformat_url,
            large_image_url: hit.large_image_url,
            width: hit.image_width,
            height: hit.image_height,
            tags: hit.tags,
            user: hit.user,
            page_url: hit.page_url,
        }
    }
}

#[async_trait]
impl ImageSearch for PixabayImageSearch {
    async fn search_images(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ImageResult>, ImageError> {
        if self.api_key.is_empty() {
            return Err(ImageError::MissingApiKey);
        }

        let per_page = options.per_page.to_string();
        let safesearch = if options.safesearch { "true" } else { "false" };
        let params = [
            ("key", self.api_key.as_str()),
            ("q", query),
            ("image_type", options.image_type.as_str()),
            ("per_page", per_page.as_str()),
            ("safesearch", safesearch),
            ("category", options.category.as_str()),
        ];

        let response = self.client.get(API_ENDPOINT).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(ImageError::Status(response.status()));
        }

        let body: SearchResponse = response.json().await?;
        debug!(query, hits = body.hits.len(), "image search finished");
        Ok(body.hits.into_iter().map(ImageResult::from).collect())
    }

    async fn fetch_image(&self, image_url: &str) -> Result<Bytes, ImageError> {
        let response = self.client.get(image_url).send().await?;
        if !response.status().is_success() {
            return Err(ImageError::Status(response.status()));
        }
        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_without_api_key_fails() {
        let search = PixabayImageSearch::new("");
        let err = search
            .search_images("apple", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::MissingApiKey));
    }

    #[test]
    fn test_hit_maps_to_normalized_result() {
        let json = r#"{
            "id": 195893,
            "pageURL": "https://pixabay.com/photos/apple-195893/",
            "previewURL": "https://cdn.pixabay.com/photo/apple_150.jpg",
            "webformatURL": "https://cdn.pixabay.com/photo/apple_640.jpg",
            "largeImageURL": "https://cdn.pixabay.com/photo/apple_1280.jpg",
            "imageWidth": 4000,
            "imageHeight": 2250,
            "tags": "apple, fruit, red",
            "user": "Josch13"
        }"#;

        let hit: Hit = serde_json::from_str(json).unwrap();
        let result = ImageResult::from(hit);

        assert_eq!(result.id, 195893);
        assert_eq!(result.thumbnail_url, "https://cdn.pixabay.com/photo/apple_150.jpg");
        assert_eq!(result.small_image_url, "https://cdn.pixabay.com/photo/apple_640.jpg");
        assert_eq!(result.large_image_url, "https://cdn.pixabay.com/photo/apple_1280.jpg");
        assert_eq!(result.width, 4000);
        assert_eq!(result.tags, "apple, fruit, red");
        assert_eq!(result.page_url, "https://pixabay.com/photos/apple-195893/");
    }

    #[test]
    fn test_hit_tolerates_missing_optional_fields() {
        let json = r#"{
            "id": 1,
            "previewURL": "a",
            "webformatURL": "b",
            "largeImageURL": "c",
            "imageWidth": 10,
            "imageHeight": 10
        }"#;

        let hit: Hit = serde_json::from_str(json).unwrap();
        let result = ImageResult::from(hit);
        assert!(result.tags.is_empty());
        assert!(result.page_url.is_empty());
    }
}
