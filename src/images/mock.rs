//! Canned image search for tests and offline development.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{ImageError, ImageResult, ImageSearch, SearchOptions};

/// A valid 1x1 transparent PNG, returned by [`MockImageSearch::fetch_image`].
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

pub struct MockImageSearch {
    results: Vec<ImageResult>,
}

impl Default for MockImageSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl MockImageSearch {
    pub fn new() -> Self {
        let entries = [
            (1001, "Apple", "apple fruit healthy"),
            (1002, "Banana", "banana fruit tropical"),
            (1003, "Orange", "orange fruit citrus"),
            (1004, "Pizza", "pizza fast food italian"),
            (1005, "Salad", "salad healthy vegetable"),
            (1006, "Pasta", "pasta italian carbs"),
        ];

        let results = entries
            .into_iter()
            .map(|(id, name, tags)| ImageResult {
                id,
                thumbnail_url: format!("https://placeholder.local/150?text={name}"),
                small_image_url: format!("https://placeholder.local/300?text={name}"),
                large_image_url: format!("https://placeholder.local/800?text={name}"),
                width: 300,
                height: 300,
                tags: tags.to_string(),
                user: "mockuser".to_string(),
                page_url: String::new(),
            })
            .collect();

        Self { results }
    }
}

#[async_trait]
impl ImageSearch for MockImageSearch {
    async fn search_images(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ImageResult>, ImageError> {
        let query = query.to_lowercase();
        let results: Vec<ImageResult> = self
            .results
            .iter()
            .filter(|image| {
                image.tags.to_lowercase().contains(&query)
                    || image.small_image_url.to_lowercase().contains(&query)
            })
            .take(options.per_page as usize)
            .cloned()
            .collect();

        debug!(%query, hits = results.len(), "mock image search");
        Ok(results)
    }

    async fn fetch_image(&self, _image_url: &str) -> Result<Bytes, ImageError> {
        Ok(Bytes::from_static(PLACEHOLDER_PNG))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_filters_by_tags_case_insensitively() {
        let search = MockImageSearch::new();
        let results = search
            .search_images("FRUIT", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.tags.contains("fruit")));
    }

    #[tokio::test]
    async fn test_search_respects_per_page() {
        let search = MockImageSearch::new();
        let options = SearchOptions {
            per_page: 1,
            ..Default::default()
        };
        let results = search.search_images("fruit", &options).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_query_returns_empty() {
        let search = MockImageSearch::new();
        let results = search
            .search_images("submarine", &SearchOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_image_returns_valid_png_header() {
        let search = MockImageSearch::new();
        let bytes = search.fetch_image("anything").await.unwrap();
        assert_eq!(&bytes[..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
