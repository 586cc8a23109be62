//! The watermark picture, decoded once per service instance.
//!
//! The asset is identified by the configured picture id. The first render that
//! needs it fetches and decodes the bytes; every later render shares the
//! decoded image. A failed fetch or decode is logged and not remembered, so
//! the next render tries again.

use super::WatermarkError;
use crate::storage::PictureRepository;
use image::RgbaImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Lazily decoded watermark picture for one picture id.
pub struct WatermarkAsset {
    picture_id: i32,
    image: OnceCell<Arc<RgbaImage>>,
}

impl WatermarkAsset {
    pub fn new(picture_id: i32) -> Self {
        Self {
            picture_id,
            image: OnceCell::new(),
        }
    }

    pub fn picture_id(&self) -> i32 {
        self.picture_id
    }

    pub fn is_loaded(&self) -> bool {
        self.image.initialized()
    }

    /// The decoded picture, loading it on first use.
    pub async fn load(
        &self,
        repository: &dyn PictureRepository,
    ) -> Result<Arc<RgbaImage>, WatermarkError> {
        let image = self
            .image
            .get_or_try_init(|| async {
                let bytes = repository
                    .get_binary_by_id(self.picture_id)
                    .await
                    .map_err(|e| WatermarkError::FetchError(e.to_string()))?
                    .ok_or_else(|| {
                        WatermarkError::FetchError(format!("picture {} not found", self.picture_id))
                    })?;

                let decoded = tokio::task::spawn_blocking(move || {
                    image::load_from_memory(&bytes)
                        .map(|img| img.into_rgba8())
                        .map_err(|e| WatermarkError::DecodeError(e.to_string()))
                })
                .await
                .map_err(|e| WatermarkError::DecodeError(format!("decode task failed: {}", e)))??;

                debug!(
                    picture_id = self.picture_id,
                    width = decoded.width(),
                    height = decoded.height(),
                    "Loaded watermark picture"
                );
                Ok::<_, WatermarkError>(Arc::new(decoded))
            })
            .await?;

        Ok(image.clone())
    }

    /// Like [`load`](Self::load), but a failure only skips the picture layer.
    pub async fn get(&self, repository: &dyn PictureRepository) -> Option<Arc<RgbaImage>> {
        match self.load(repository).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(
                    picture_id = self.picture_id,
                    error = %e,
                    "Skipping picture watermark"
                );
                None
            }
        }
    }
}

/// Decoded watermark pictures keyed by picture id.
///
/// Stores configured with different watermark pictures each keep their own
/// asset; asking for an id again returns the shared, possibly already decoded one.
#[derive(Default)]
pub struct WatermarkAssets {
    by_picture: Mutex<HashMap<i32, Arc<WatermarkAsset>>>,
}

impl WatermarkAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asset for `picture_id`, or `None` when no picture is configured (id 0).
    pub fn for_picture(&self, picture_id: i32) -> Option<Arc<WatermarkAsset>> {
        if picture_id == 0 {
            return None;
        }

        let asset = self
            .by_picture
            .lock()
            .entry(picture_id)
            .or_insert_with(|| Arc::new(WatermarkAsset::new(picture_id)))
            .clone();
        Some(asset)
    }

    /// Drop every asset so the next render decodes again.
    pub fn clear(&self) {
        self.by_picture.lock().clear();
    }

    /// Drop the asset decoded from `picture_id`, if any.
    pub fn forget(&self, picture_id: i32) {
        self.by_picture.lock().remove(&picture_id);
    }

    pub fn len(&self) -> usize {
        self.by_picture.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
