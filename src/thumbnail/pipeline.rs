//! Thumbnail resolution: picture in, thumbnail URL out.
//!
//! Every thumbnail is produced at most once per file name. Requests for the
//! same name serialize on a named lock; the first holder renders and saves,
//! later holders find the file on their re-check and return its URL.
//!
//! The produce step runs in its own task, so a caller that gives up waiting
//! does not abort a cache write that is already under way.

use bytes::Bytes;
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::codec::{
    calculate_dimensions, decode_image, effective_quality, encoder_for, resize_image,
};
use super::error::ThumbnailError;
use super::existence::ExistenceMemo;
use super::filename::{
    default_thumb_file_name, extension_from_mime, mime_from_extension, thumb_file_name,
};
use super::locks::NamedLocks;
use crate::storage::{Picture, PictureRepository, SettingsStore, StoreLocation, ThumbnailCache};
use crate::watermark::asset::WatermarkAssets;
use crate::watermark::eligibility::{self, Eligibility};
use crate::watermark::font::{resolve_with_fallback, FontResolver};
use crate::watermark::{WatermarkCompositor, WatermarkSettings};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_EXISTENCE_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_EXISTENCE_CAPACITY: u64 = 10_000;
pub const DEFAULT_PICTURE_NAME: &str = "default-image.png";

/// Placeholder served for missing pictures.
struct DefaultPicture {
    name: String,
    data: Option<Bytes>,
}

/// Everything the produce step needs, owned so it can move into a task.
struct RenderJob {
    file_name: String,
    mime_type: String,
    data: Bytes,
    target_size: u32,
    store: StoreLocation,
    /// Picture whose usage decides the watermark; `None` renders without one
    watermark_for: Option<i32>,
}

struct Inner {
    settings: Arc<dyn SettingsStore>,
    pictures: Arc<dyn PictureRepository>,
    cache: Arc<dyn ThumbnailCache>,
    compositor: WatermarkCompositor,
    assets: WatermarkAssets,
    locks: NamedLocks,
    existence: ExistenceMemo,
    default_image_quality: i32,
    lock_timeout: Duration,
    default_picture: DefaultPicture,
}

/// Resolves pictures to thumbnail URLs, producing missing thumbnails.
///
/// Cheap to clone; clones share caches, locks and the watermark asset.
#[derive(Clone)]
pub struct ThumbnailService {
    inner: Arc<Inner>,
}

impl ThumbnailService {
    pub fn builder(
        settings: Arc<dyn SettingsStore>,
        pictures: Arc<dyn PictureRepository>,
        cache: Arc<dyn ThumbnailCache>,
        fonts: Arc<dyn FontResolver>,
    ) -> ThumbnailServiceBuilder {
        ThumbnailServiceBuilder::new(settings, pictures, cache, fonts)
    }

    pub fn fonts(&self) -> &Arc<dyn FontResolver> {
        self.inner.compositor.fonts()
    }

    /// URL of the thumbnail of `picture` at `target_size` (0 keeps the
    /// original size), producing it if needed.
    ///
    /// A missing picture or empty payload yields the placeholder URL when
    /// `show_default_if_missing` is set, an empty string otherwise.
    pub async fn resolve(
        &self,
        picture: Option<&Picture>,
        target_size: u32,
        show_default_if_missing: bool,
        store: &StoreLocation,
    ) -> Result<String, ThumbnailError> {
        let Some(picture) = picture else {
            return self
                .missing_url(target_size, show_default_if_missing, store)
                .await;
        };

        let data = match &picture.binary {
            Some(data) => data.clone(),
            None => self
                .inner
                .pictures
                .get_binary_by_id(picture.id)
                .await?
                .unwrap_or_default(),
        };

        if data.is_empty() {
            debug!(picture_id = picture.id, "Picture has no binary");
            return self
                .missing_url(target_size, show_default_if_missing, store)
                .await;
        }

        if picture.is_new {
            self.persist_upload(picture, &data).await?;
        }

        let store_suffix = (!store.is_default()).then_some(store.store_id);
        let file_name = thumb_file_name(
            picture.id,
            picture.seo_filename.as_deref(),
            target_size,
            store_suffix,
            &extension_from_mime(&picture.mime_type),
        );
        let url = self.inner.cache.url(&file_name, store);

        self.ensure(RenderJob {
            file_name,
            mime_type: picture.mime_type.clone(),
            data,
            target_size,
            store: store.clone(),
            watermark_for: Some(picture.id),
        })
        .await?;

        Ok(url)
    }

    /// URL of the placeholder picture at `target_size`.
    ///
    /// When placeholder bytes are configured the sized copy is produced like
    /// any other thumbnail, without a watermark.
    pub async fn default_picture_url(
        &self,
        target_size: u32,
        store: &StoreLocation,
    ) -> Result<String, ThumbnailError> {
        let default = &self.inner.default_picture;
        let file_name = default_thumb_file_name(&default.name, target_size);
        let url = self.inner.cache.url(&file_name, store);

        let Some(data) = default.data.clone() else {
            return Ok(url);
        };

        let extension = default
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or_default();

        self.ensure(RenderJob {
            file_name,
            mime_type: mime_from_extension(extension).to_string(),
            data,
            target_size,
            store: store.clone(),
            watermark_for: None,
        })
        .await?;

        Ok(url)
    }

    /// Validate and persist watermark settings, then drop every thumbnail.
    ///
    /// Out-of-range values are rejected, never clamped. Returns the number of
    /// thumbnails removed.
    pub async fn save_settings(
        &self,
        store_id: i32,
        settings: &WatermarkSettings,
    ) -> Result<usize, ThumbnailError> {
        settings.validate().map_err(ThumbnailError::InvalidSettings)?;

        if settings.watermark_text_enable
            && resolve_with_fallback(self.fonts().as_ref(), &settings.font_name).is_none()
        {
            return Err(ThumbnailError::InvalidSettings(format!(
                "Font '{}' is not available and no fonts are installed",
                settings.font_name
            )));
        }

        self.inner.settings.save(store_id, settings).await?;
        info!(store_id, "Saved watermark settings");

        self.clear_thumbnails().await
    }

    /// Remove every thumbnail and forget everything memoized about them.
    pub async fn clear_thumbnails(&self) -> Result<usize, ThumbnailError> {
        let removed = self.inner.cache.invalidate_all().await?;
        self.inner.existence.invalidate_all();
        self.inner.assets.clear();

        info!(removed, "Cleared thumbnail cache");
        Ok(removed)
    }

    async fn missing_url(
        &self,
        target_size: u32,
        show_default_if_missing: bool,
        store: &StoreLocation,
    ) -> Result<String, ThumbnailError> {
        if show_default_if_missing {
            self.default_picture_url(target_size, store).await
        } else {
            Ok(String::new())
        }
    }

    /// Drop stale thumbnails of a fresh upload and store it as canonical.
    async fn persist_upload(&self, picture: &Picture, data: &Bytes) -> Result<(), ThumbnailError> {
        let removed = self.inner.cache.invalidate_picture(picture.id).await?;
        self.inner.existence.invalidate_picture(picture.id).await;
        self.inner.assets.forget(picture.id);

        let mut record = picture.clone();
        record.is_new = false;
        record.binary = Some(data.clone());
        self.inner.pictures.update_record(&record).await?;

        debug!(picture_id = picture.id, removed, "Persisted new upload");
        Ok(())
    }

    async fn ensure(&self, job: RenderJob) -> Result<(), ThumbnailError> {
        let inner = &self.inner;
        if inner.existence.exists(inner.cache.as_ref(), &job.file_name).await? {
            debug!(file_name = %job.file_name, "Thumbnail cache hit");
            return Ok(());
        }

        let inner = self.inner.clone();
        tokio::spawn(async move { inner.produce(job).await })
            .await
            .map_err(|e| ThumbnailError::Task(e.to_string()))?
    }
}

impl Inner {
    async fn produce(&self, job: RenderJob) -> Result<(), ThumbnailError> {
        let _guard = self.locks.acquire(&job.file_name, self.lock_timeout).await?;

        if self
            .existence
            .exists_uncached(self.cache.as_ref(), &job.file_name)
            .await?
        {
            debug!(file_name = %job.file_name, "Thumbnail produced while waiting");
            return Ok(());
        }

        let (settings, eligibility, asset) = match job.watermark_for {
            Some(picture_id) => {
                let settings = self.settings.load(job.store.store_id).await?;
                let eligibility =
                    eligibility::evaluate(self.pictures.as_ref(), picture_id, &settings).await?;
                let asset = self.watermark_asset(&settings, eligibility).await;
                (settings, eligibility, asset)
            }
            None => (WatermarkSettings::default(), Eligibility::not_required(), None),
        };

        let compositor = self.compositor.clone();
        let quality = effective_quality(self.default_image_quality);
        let data = job.data.clone();
        let target_size = job.target_size;

        let encoded = tokio::task::spawn_blocking(move || {
            render_thumbnail(
                &compositor,
                &data,
                target_size,
                &settings,
                eligibility,
                asset.as_deref(),
                quality,
            )
        })
        .await
        .map_err(|e| ThumbnailError::Task(e.to_string()))?
        .map_err(|e| {
            error!(file_name = %job.file_name, error = %e, "Failed to render thumbnail");
            e
        })?;

        let size = encoded.len();
        self.cache
            .save(&job.file_name, &job.mime_type, Bytes::from(encoded))
            .await?;
        self.existence.mark_present(&job.file_name).await;

        info!(
            file_name = %job.file_name,
            bytes = size,
            eligible = eligibility.required,
            "Thumbnail produced"
        );
        Ok(())
    }

    async fn watermark_asset(
        &self,
        settings: &WatermarkSettings,
        eligibility: Eligibility,
    ) -> Option<Arc<RgbaImage>> {
        if !eligibility.required || !settings.picture_layer_active() {
            return None;
        }
        let asset = self.assets.for_picture(settings.watermark_picture_id)?;
        asset.get(self.pictures.as_ref()).await
    }
}

/// Decode, resize, watermark and re-encode one picture. CPU bound.
///
/// The output keeps the source format; `target_size` 0 keeps the size.
pub fn render_thumbnail(
    compositor: &WatermarkCompositor,
    data: &[u8],
    target_size: u32,
    settings: &WatermarkSettings,
    eligibility: Eligibility,
    asset: Option<&RgbaImage>,
    quality: u8,
) -> Result<Vec<u8>, ThumbnailError> {
    let (image, format) = decode_image(data)?;

    let image = if target_size != 0 {
        let (width, height) = calculate_dimensions(image.width(), image.height(), target_size);
        resize_image(&image, width, height)?
    } else {
        image
    };

    let image = compositor.apply(image, settings, eligibility, asset)?;
    encoder_for(format).encode(&image, quality)
}

/// Builder for [`ThumbnailService`]
pub struct ThumbnailServiceBuilder {
    settings: Arc<dyn SettingsStore>,
    pictures: Arc<dyn PictureRepository>,
    cache: Arc<dyn ThumbnailCache>,
    fonts: Arc<dyn FontResolver>,
    default_image_quality: i32,
    lock_timeout: Duration,
    existence_ttl: Duration,
    existence_capacity: u64,
    default_picture: DefaultPicture,
}

impl ThumbnailServiceBuilder {
    /// Creates a new builder with the required collaborators
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        pictures: Arc<dyn PictureRepository>,
        cache: Arc<dyn ThumbnailCache>,
        fonts: Arc<dyn FontResolver>,
    ) -> Self {
        Self {
            settings,
            pictures,
            cache,
            fonts,
            default_image_quality: 0,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            existence_ttl: DEFAULT_EXISTENCE_TTL,
            existence_capacity: DEFAULT_EXISTENCE_CAPACITY,
            default_picture: DefaultPicture {
                name: DEFAULT_PICTURE_NAME.to_string(),
                data: None,
            },
        }
    }

    /// Encoder quality; 0 or less means the fallback of 80
    pub fn default_image_quality(mut self, quality: i32) -> Self {
        self.default_image_quality = quality;
        self
    }

    /// How long a request waits for another producer of the same thumbnail
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Lifetime and capacity of the memo of known thumbnails
    pub fn existence_cache(mut self, ttl: Duration, max_entries: u64) -> Self {
        self.existence_ttl = ttl;
        self.existence_capacity = max_entries;
        self
    }

    /// Placeholder file name and, if available, its bytes
    pub fn default_picture(mut self, name: impl Into<String>, data: Option<Bytes>) -> Self {
        self.default_picture = DefaultPicture {
            name: name.into(),
            data: data.filter(|d| !d.is_empty()),
        };
        self
    }

    pub fn build(self) -> ThumbnailService {
        ThumbnailService {
            inner: Arc::new(Inner {
                settings: self.settings,
                pictures: self.pictures,
                cache: self.cache,
                compositor: WatermarkCompositor::new(self.fonts),
                assets: WatermarkAssets::new(),
                locks: NamedLocks::new(),
                existence: ExistenceMemo::new(self.existence_ttl, self.existence_capacity),
                default_image_quality: self.default_image_quality,
                lock_timeout: self.lock_timeout,
                default_picture: self.default_picture,
            }),
        }
    }
}
