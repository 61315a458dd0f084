//! Cloudinary-backed image hosting.
//!
//! Uploads use an unsigned preset so no API secret lives in the client.
//! Transformations never re-upload anything: they splice a parameter segment
//! into the URL right after `/upload/` and let the CDN render on demand.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    CenterOptions, EnhanceOptions, ImageError, ImageHosting, OptimizeOptions,
};
use crate::config::CloudinarySettings;

const UPLOAD_FOLDER: &str = "food-images";
const UPLOAD_MARKER: &str = "/upload/";

pub struct CloudinaryImageHosting {
    cloud_name: String,
    upload_preset: String,
    client: reqwest::Client,
}

impl CloudinaryImageHosting {
    pub fn new(settings: &CloudinarySettings) -> Self {
        Self {
            cloud_name: settings.cloud_name.clone(),
            upload_preset: settings.upload_preset.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn upload_endpoint(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.cloud_name
        )
    }
}

/// Replaces characters that break URLs or vendor APIs with underscores and
/// collapses whitespace runs.
fn sanitize_filename(name: &str) -> String {
    const SPECIALS: &str = "&+/\\#,()$~%'\":*?<>{}";

    let mut out = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            if SPECIALS.contains(ch) {
                out.push('_');
            } else {
                out.push(ch);
            }
        }
    }
    out
}

fn is_cloudinary_url(url: &str) -> bool {
    url.contains("cloudinary.com")
}

fn splice_transformation(url: &str, transformation: &str) -> String {
    url.replacen(UPLOAD_MARKER, &format!("/upload/{}/", transformation), 1)
}

pub(super) fn optimize(url: &str, options: &OptimizeOptions) -> String {
    if !is_cloudinary_url(url) {
        return url.to_string();
    }
    let transformation = format!(
        "c_{},w_{},h_{},g_{},q_{},f_{}",
        options.crop, options.width, options.height, options.gravity, options.quality,
        options.format
    );
    splice_transformation(url, &transformation)
}

pub(super) fn center(url: &str, options: &CenterOptions) -> String {
    if !is_cloudinary_url(url) {
        return url.to_string();
    }

    let mut transformation = format!(
        "c_{},w_{},h_{},g_auto:subject",
        options.crop, options.width, options.height
    );
    if options.zoom != 1.0 {
        transformation.push_str(&format!(",z_{}", options.zoom));
    }
    if options.remove_background {
        transformation.push_str("/e_background_removal");
    }
    splice_transformation(url, &transformation)
}

pub(super) fn enhance(url: &str, options: &EnhanceOptions) -> String {
    if !is_cloudinary_url(url) {
        return url.to_string();
    }

    let mut effects = Vec::new();
    if options.improve {
        effects.push("e_improve".to_string());
    }
    if options.color {
        effects.push("e_improve:color".to_string());
    }
    if options.redeye {
        effects.push("e_redeye".to_string());
    }
    if options.brightening > 0 {
        effects.push(format!("e_brightness:{}", options.brightening));
    }
    if options.blur_faces {
        effects.push("e_pixelate_faces:15".to_string());
    }

    if effects.is_empty() {
        return url.to_string();
    }
    splice_transformation(url, &effects.join("/"))
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[async_trait]
impl ImageHosting for CloudinaryImageHosting {
    async fn upload_image(&self, image: Bytes, item_id: &str) -> Result<String, ImageError> {
        // A fresh public_id per upload forces the CDN to store a new asset
        // instead of returning the cached one when an item's image is edited.
        let public_id = format!(
            "{}-{}",
            sanitize_filename(item_id),
            Utc::now().timestamp_millis()
        );

        let part = reqwest::multipart::Part::bytes(image.to_vec()).file_name("image");
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", UPLOAD_FOLDER)
            .text("public_id", public_id);

        let response = self
            .client
            .post(self.upload_endpoint())
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ImageError::Status(response.status()));
        }

        let body: UploadResponse = response.json().await?;
        debug!(url = %body.secure_url, "uploaded image");
        Ok(body.secure_url)
    }

    async fn delete_image(&self, _image_url: &str) -> Result<bool, ImageError> {
        // Deletion needs a signed request with the account secret, which an
        // unsigned client deliberately does not hold.
        warn!("image deletion requires server-side credentials; skipping");
        Ok(false)
    }

    fn optimize_url(&self, url: &str, options: &OptimizeOptions) -> String {
        optimize(url, options)
    }

    fn center_object(&self, url: &str, options: &CenterOptions) -> String {
        center(url, options)
    }

    fn enhance_url(&self, url: &str, options: &EnhanceOptions) -> String {
        enhance(url, options)
    }
}
