//! Listing image storage.
//!
//! Images are kept in an S3/MinIO-compatible bucket under a publicly
//! readable prefix. The store is optional: without credentials listings use
//! the placeholder image and uploads are refused.

mod s3_image_store;

pub use s3_image_store::S3ImageStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, Result};

/// Maximum accepted image size (5 MB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Accepted image MIME types and the extension stored objects get
pub const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
];

/// Reference to a stored image: where browsers load it from and the
/// identifier the store needs to delete it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub filename: String,
}

/// An uploaded image that passed type and size checks
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: String,
    extension: &'static str,
}

impl ImageUpload {
    pub fn new(data: Vec<u8>, content_type: &str) -> Result<Self> {
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded image is empty".to_string()));
        }

        if data.len() > MAX_IMAGE_SIZE {
            return Err(AppError::Validation(format!(
                "Image too large. Maximum size is {} MB",
                MAX_IMAGE_SIZE / 1024 / 1024
            )));
        }

        let content_type = content_type.trim().to_lowercase();
        let extension = ALLOWED_IMAGE_TYPES
            .iter()
            .find(|(mime, _)| *mime == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                AppError::Validation("Only PNG and JPEG images are allowed".to_string())
            })?;

        Ok(Self {
            data,
            content_type,
            extension,
        })
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store an image and return its public reference
    async fn store(&self, upload: ImageUpload) -> Result<ImageRef>;

    /// Remove a previously stored image
    async fn delete(&self, filename: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_accepts_png_and_jpeg() {
        let png = ImageUpload::new(vec![1, 2, 3], "image/png").unwrap();
        assert_eq!(png.extension(), "png");

        let jpeg = ImageUpload::new(vec![1, 2, 3], "IMAGE/JPEG").unwrap();
        assert_eq!(jpeg.extension(), "jpg");
        assert_eq!(jpeg.content_type, "image/jpeg");
    }

    #[test]
    fn test_upload_rejects_other_types() {
        let result = ImageUpload::new(vec![1, 2, 3], "image/gif");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_upload_rejects_empty_and_oversized() {
        assert!(ImageUpload::new(Vec::new(), "image/png").is_err());
        assert!(ImageUpload::new(vec![0; MAX_IMAGE_SIZE + 1], "image/png").is_err());
        assert!(ImageUpload::new(vec![0; MAX_IMAGE_SIZE], "image/png").is_ok());
    }
}
