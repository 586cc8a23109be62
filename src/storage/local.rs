//! Thumbnail storage on the local filesystem using tokio::fs

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::StorageError;
use super::traits::{is_thumbnail_of, ThumbnailCache};
use super::types::StoreLocation;

/// Thumbnails stored as flat files in one directory and served under a URL base.
#[derive(Debug, Clone)]
pub struct LocalThumbnailStore {
    dir: PathBuf,
    url_base: String,
}

impl LocalThumbnailStore {
    pub fn new(dir: impl Into<PathBuf>, url_base: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_base: url_base.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, file_name: &str) -> Result<PathBuf, StorageError> {
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name.starts_with('.')
        {
            return Err(StorageError::InvalidFileName(file_name.to_string()));
        }
        Ok(self.dir.join(file_name))
    }

    /// Remove the regular files in the directory that match `filter`.
    async fn remove_matching(&self, filter: impl Fn(&str) -> bool) -> Result<usize, StorageError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if filter(name) {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    // Removed concurrently
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl ThumbnailCache for LocalThumbnailStore {
    async fn exists(&self, file_name: &str) -> Result<bool, StorageError> {
        let path = self.path_for(file_name)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
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
        let path = self.path_for(file_name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write to a hidden temp file, then rename so readers never see a partial file
        let temp_path = self.dir.join(format!(".{}.tmp", file_name));
        let written = match tokio::fs::write(&temp_path, &data).await {
            Ok(()) => tokio::fs::rename(&temp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(file = %file_name, bytes = data.len(), "Stored thumbnail");
        Ok(())
    }

    async fn invalidate_picture(&self, picture_id: i32) -> Result<usize, StorageError> {
        let removed = self
            .remove_matching(|name| is_thumbnail_of(name, picture_id))
            .await?;
        debug!(picture_id = picture_id, removed = removed, "Removed picture thumbnails");
        Ok(removed)
    }

    async fn invalidate_all(&self) -> Result<usize, StorageError> {
        let removed = self.remove_matching(|name| !name.starts_with('.')).await?;
        debug!(removed = removed, "Removed all thumbnails");
        Ok(removed)
    }
}
