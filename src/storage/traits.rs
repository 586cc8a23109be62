//! Collaborator traits consumed by the thumbnail pipeline.
//!
//! Implementations must be cheap to share across tasks; the pipeline holds
//! them behind `Arc<dyn ...>`.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::StorageError;
use super::types::{Picture, StoreLocation};
use crate::watermark::WatermarkSettings;

/// Loads and saves watermark settings per store.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Settings for `store_id`, falling back to shared defaults when the
    /// store has no override.
    async fn load(&self, store_id: i32) -> Result<WatermarkSettings, StorageError>;

    async fn save(&self, store_id: i32, settings: &WatermarkSettings) -> Result<(), StorageError>;
}

/// Which entities reference a picture.
#[async_trait]
pub trait PictureUsage: Send + Sync {
    async fn is_referenced_by_product(&self, picture_id: i32) -> Result<bool, StorageError>;

    async fn is_referenced_by_category(&self, picture_id: i32) -> Result<bool, StorageError>;

    async fn is_referenced_by_manufacturer(&self, picture_id: i32) -> Result<bool, StorageError>;
}

/// Source of picture binaries.
#[async_trait]
pub trait PictureRepository: PictureUsage {
    /// Binary of a stored picture; `None` when the id is unknown.
    async fn get_binary_by_id(&self, picture_id: i32) -> Result<Option<Bytes>, StorageError>;

    /// Persist a picture record, replacing the existing one with the same id.
    async fn update_record(&self, picture: &Picture) -> Result<(), StorageError>;
}

/// Storage for generated thumbnails.
#[async_trait]
pub trait ThumbnailCache: Send + Sync {
    /// Whether a thumbnail with this file name is stored. Always asks the
    /// backend; memoization is the pipeline's concern.
    async fn exists(&self, file_name: &str) -> Result<bool, StorageError>;

    /// Public URL of a thumbnail for the given store.
    fn url(&self, file_name: &str, store: &StoreLocation) -> String;

    async fn save(&self, file_name: &str, mime_type: &str, data: Bytes)
        -> Result<(), StorageError>;

    /// Remove every thumbnail generated from `picture_id`. Returns the number removed.
    async fn invalidate_picture(&self, picture_id: i32) -> Result<usize, StorageError>;

    /// Remove every thumbnail. Returns the number removed.
    async fn invalidate_all(&self) -> Result<usize, StorageError>;
}

/// Whether `file_name` is a thumbnail of `picture_id`: the zero-padded id
/// followed by `_` or `.`.
pub fn is_thumbnail_of(file_name: &str, picture_id: i32) -> bool {
    let prefix = format!("{:07}", picture_id);
    file_name
        .strip_prefix(&prefix)
        .map(|rest| rest.starts_with('_') || rest.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_thumbnail_of() {
        assert!(is_thumbnail_of("0000042.png", 42));
        assert!(is_thumbnail_of("0000042_shoe_250.png", 42));
        assert!(!is_thumbnail_of("00000420_shoe.png", 42));
        assert!(!is_thumbnail_of("0000043.png", 42));
        assert!(!is_thumbnail_of("0000042", 42));
        assert!(is_thumbnail_of("12345678_x.jpg", 12345678));
    }
}
