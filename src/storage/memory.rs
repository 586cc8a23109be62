//! In-memory collaborators (HashMap storage)
//!
//! Used by the CLI for one-off renders and by tests that need to observe how
//! often the pipeline touches its collaborators.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::error::StorageError;
use super::traits::{
    is_thumbnail_of, PictureRepository, PictureUsage, SettingsStore, ThumbnailCache,
};
use super::types::{Picture, StoreLocation};
use crate::watermark::WatermarkSettings;

/// Picture records plus the entity references used for eligibility.
#[derive(Default)]
pub struct InMemoryPictureRepository {
    pictures: RwLock<HashMap<i32, Picture>>,
    products: RwLock<HashSet<i32>>,
    categories: RwLock<HashSet<i32>>,
    manufacturers: RwLock<HashSet<i32>>,
    binary_reads: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryPictureRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, picture: Picture) {
        self.pictures.write().insert(picture.id, picture);
    }

    pub fn get(&self, picture_id: i32) -> Option<Picture> {
        self.pictures.read().get(&picture_id).cloned()
    }

    pub fn reference_by_product(&self, picture_id: i32) {
        self.products.write().insert(picture_id);
    }

    pub fn reference_by_category(&self, picture_id: i32) {
        self.categories.write().insert(picture_id);
    }

    pub fn reference_by_manufacturer(&self, picture_id: i32) {
        self.manufacturers.write().insert(picture_id);
    }

    /// Number of `get_binary_by_id` calls so far
    pub fn binary_reads(&self) -> usize {
        self.binary_reads.load(Ordering::SeqCst)
    }

    /// Number of `update_record` calls so far
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PictureUsage for InMemoryPictureRepository {
    async fn is_referenced_by_product(&self, picture_id: i32) -> Result<bool, StorageError> {
        Ok(self.products.read().contains(&picture_id))
    }

    async fn is_referenced_by_category(&self, picture_id: i32) -> Result<bool, StorageError> {
        Ok(self.categories.read().contains(&picture_id))
    }

    async fn is_referenced_by_manufacturer(&self, picture_id: i32) -> Result<bool, StorageError> {
        Ok(self.manufacturers.read().contains(&picture_id))
    }
}

#[async_trait]
impl PictureRepository for InMemoryPictureRepository {
    async fn get_binary_by_id(&self, picture_id: i32) -> Result<Option<Bytes>, StorageError> {
        self.binary_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .pictures
            .read()
            .get(&picture_id)
            .and_then(|p| p.binary.clone()))
    }

    async fn update_record(&self, picture: &Picture) -> Result<(), StorageError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.pictures.write().insert(picture.id, picture.clone());
        Ok(())
    }
}

/// Settings keyed by store id; store 0 holds the shared defaults.
#[derive(Default)]
pub struct InMemorySettingsStore {
    settings: RwLock<HashMap<i32, WatermarkSettings>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with shared settings for every store.
    pub fn with_defaults(settings: WatermarkSettings) -> Self {
        let store = Self::new();
        store.settings.write().insert(0, settings);
        store
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self, store_id: i32) -> Result<WatermarkSettings, StorageError> {
        let settings = self.settings.read();
        Ok(settings
            .get(&store_id)
            .or_else(|| settings.get(&0))
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, store_id: i32, settings: &WatermarkSettings) -> Result<(), StorageError> {
        self.settings.write().insert(store_id, settings.clone());
        Ok(())
    }
}

/// Thumbnails kept in a map, with call counters and failure injection.
#[derive(Clone)]
pub struct InMemoryThumbnailCache {
    files: Arc<RwLock<HashMap<String, Bytes>>>,
    url_base: String,
    exists_calls: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
}

impl InMemoryThumbnailCache {
    pub fn new(url_base: impl Into<String>) -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            url_base: url_base.into(),
            exists_calls: Arc::new(AtomicUsize::new(0)),
            saves: Arc::new(AtomicUsize::new(0)),
            fail_saves: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent save fail with `StorageFull`
    pub fn set_fail_saves(&self, enabled: bool) {
        self.fail_saves.store(enabled, Ordering::SeqCst);
    }

    pub fn get(&self, file_name: &str) -> Option<Bytes> {
        self.files.read().get(file_name).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThumbnailCache for InMemoryThumbnailCache {
    async fn exists(&self, file_name: &str) -> Result<bool, StorageError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.read().contains_key(file_name))
    }

    fn url(&self, file_name: &str, store: &StoreLocation) -> String {
        let base = store.url_base.as_deref().unwrap_or(&self.url_base);
        format!("{}/{}", base.trim_end_matches('/'), file_name)
    }

    async fn save(
        &self,
        file_name: &str,
        _mime_type: &str,
        data: Bytes,
    ) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::StorageFull(file_name.to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.files.write().insert(file_name.to_string(), data);
        Ok(())
    }

    async fn invalidate_picture(&self, picture_id: i32) -> Result<usize, StorageError> {
        let mut files = self.files.write();
        let before = files.len();
        files.retain(|name, _| !is_thumbnail_of(name, picture_id));
        Ok(before - files.len())
    }

    async fn invalidate_all(&self) -> Result<usize, StorageError> {
        let mut files = self.files.write();
        let removed = files.len();
        files.clear();
        Ok(removed)
    }
}
