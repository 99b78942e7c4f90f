use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{error::AppError, storage::MediaHost};

/// Image value stored on a record before its upload has completed.
pub const PLACEHOLDER_IMAGE: &str = "placeholder";

#[derive(Debug)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Recovers the media host's public id from a delivery URL such as
/// `https://res.cloudinary.com/<cloud>/image/upload/v1699999999/abc123xyz.jpg`.
///
/// The reference is the segment after the last `/v<digits>/` marker, up to the
/// extension. Any other shape yields `None`, meaning there is nothing to delete.
pub fn extract_reference(url: &str) -> Option<&str> {
    lazy_static! {
        static ref REFERENCE_RE: Regex = Regex::new(r"/v\d+/([^/]+)\.").unwrap();
    }
    REFERENCE_RE
        .captures_iter(url)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn is_supported_mime(ct: &str) -> bool {
    matches!(
        ct,
        "image/jpeg"
            | "image/jpg"
            | "image/png"
            | "image/webp"
            | "image/gif"
            | "image/heic"
            | "application/octet-stream"
    )
}

/// Rejects empty or non-image uploads before anything is stored.
pub fn check_upload(item: &UploadItem) -> Result<(), AppError> {
    if item.body.is_empty() {
        return Err(AppError::validation("image", "No file uploaded"));
    }
    if !is_supported_mime(&item.content_type) {
        return Err(AppError::validation(
            "image",
            format!("Unsupported image type {}", item.content_type),
        ));
    }
    Ok(())
}

pub async fn upload_image(media: &dyn MediaHost, item: UploadItem) -> Result<String, AppError> {
    check_upload(&item)?;
    let uploaded = media
        .upload(item.body, &item.content_type)
        .await
        .map_err(AppError::ExternalService)?;
    info!(reference = %uploaded.reference, "image uploaded");
    Ok(uploaded.url)
}

/// Best-effort removal of a superseded or orphaned image. Failures are logged
/// and never reach the caller.
pub async fn retire_image(media: &dyn MediaHost, url: &str) {
    let Some(reference) = extract_reference(url) else {
        info!(%url, "no media reference in image url; nothing to delete");
        return;
    };
    match media.delete(reference).await {
        Ok(()) => info!(%reference, "old image deleted from media host"),
        Err(e) => warn!(error = %e, %reference, "failed to delete image from media host"),
    }
}
