//! Short-lived memo of thumbnails known to exist.
//!
//! Only positive answers are remembered: a thumbnail that was missing may be
//! produced by another task at any moment. Entries expire after a TTL so
//! external deletions are eventually noticed.

use moka::future::Cache;
use std::time::Duration;

use crate::storage::{is_thumbnail_of, StorageError, ThumbnailCache};

pub struct ExistenceMemo {
    known: Cache<String, ()>,
}

impl ExistenceMemo {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let known = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { known }
    }

    /// Memoized existence check; asks the backend on a miss.
    pub async fn exists(
        &self,
        cache: &dyn ThumbnailCache,
        file_name: &str,
    ) -> Result<bool, StorageError> {
        if self.known.get(file_name).await.is_some() {
            return Ok(true);
        }
        self.exists_uncached(cache, file_name).await
    }

    /// Existence check that always asks the backend, refreshing the memo.
    pub async fn exists_uncached(
        &self,
        cache: &dyn ThumbnailCache,
        file_name: &str,
    ) -> Result<bool, StorageError> {
        let exists = cache.exists(file_name).await?;
        if exists {
            self.mark_present(file_name).await;
        } else {
            self.known.invalidate(file_name).await;
        }
        Ok(exists)
    }

    pub async fn mark_present(&self, file_name: &str) {
        self.known.insert(file_name.to_string(), ()).await;
    }

    /// Forget every thumbnail of one picture.
    pub async fn invalidate_picture(&self, picture_id: i32) {
        let stale: Vec<_> = self
            .known
            .iter()
            .filter(|(name, _)| is_thumbnail_of(name, picture_id))
            .map(|(name, _)| name)
            .collect();

        for name in stale {
            self.known.invalidate(name.as_str()).await;
        }
    }

    pub fn invalidate_all(&self) {
        self.known.invalidate_all();
    }
}
