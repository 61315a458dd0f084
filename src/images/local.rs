//! In-process image hosting for tests and local mode: blobs live in a map,
//! URLs are `local://` handles, and transformations are identity.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use super::{CenterOptions, EnhanceOptions, ImageError, ImageHosting, OptimizeOptions};

const URL_PREFIX: &str = "local://food-images/";

#[derive(Default)]
pub struct LocalImageHosting {
    store: Mutex<HashMap<String, Bytes>>,
}

impl LocalImageHosting {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored blob for an item, if one was uploaded.
    pub fn stored_image(&self, item_id: &str) -> Option<Bytes> {
        self.store
            .lock()
            .expect("image store lock poisoned")
            .get(item_id)
            .cloned()
    }

    pub fn image_count(&self) -> usize {
        self.store.lock().expect("image store lock poisoned").len()
    }
}

#[async_trait]
impl ImageHosting for LocalImageHosting {
    async fn upload_image(&self, image: Bytes, item_id: &str) -> Result<String, ImageError> {
        self.store
            .lock()
            .expect("image store lock poisoned")
            .insert(item_id.to_string(), image);
        let url = format!("{URL_PREFIX}{item_id}");
        debug!(%url, "stored local image");
        Ok(url)
    }

    async fn delete_image(&self, image_url: &str) -> Result<bool, ImageError> {
        let Some(item_id) = image_url.strip_prefix(URL_PREFIX) else {
            return Ok(false);
        };
        let removed = self
            .store
            .lock()
            .expect("image store lock poisoned")
            .remove(item_id)
            .is_some();
        Ok(removed)
    }

    fn optimize_url(&self, url: &str, _options: &OptimizeOptions) -> String {
        url.to_string()
    }

    fn center_object(&self, url: &str, _options: &CenterOptions) -> String {
        url.to_string()
    }

    fn enhance_url(&self, url: &str, _options: &EnhanceOptions) -> String {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_delete_roundtrip() {
        let hosting = LocalImageHosting::new();
        let url = hosting
            .upload_image(Bytes::from_static(b"jpeg bytes"), "apple-123456")
            .await
            .unwrap();
        assert_eq!(url, "local://food-images/apple-123456");
        assert_eq!(
            hosting.stored_image("apple-123456"),
            Some(Bytes::from_static(b"jpeg bytes"))
        );

        assert!(hosting.delete_image(&url).await.unwrap());
        assert!(hosting.stored_image("apple-123456").is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_url_returns_false() {
        let hosting = LocalImageHosting::new();
        assert!(!hosting.delete_image("local://food-images/ghost").await.unwrap());
        assert!(!hosting.delete_image("https://elsewhere/img.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_transforms_are_identity() {
        let hosting = LocalImageHosting::new();
        let url = "local://food-images/apple";
        assert_eq!(hosting.optimize_url(url, &OptimizeOptions::default()), url);
        assert_eq!(hosting.center_object(url, &CenterOptions::default()), url);
        assert_eq!(hosting.enhance_url(url, &EnhanceOptions::default()), url);
    }
}
