//! Error types for thumbnail resolution

use std::time::Duration;
use thiserror::Error;

use crate::storage::StorageError;
use crate::watermark::WatermarkError;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Failed to decode picture: {0}")]
    Decode(String),

    #[error("Failed to resize picture: {0}")]
    Resize(String),

    #[error("Failed to encode {format} thumbnail: {message}")]
    Encode { format: String, message: String },

    #[error("Watermark error: {0}")]
    Watermark(#[from] WatermarkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Timed out after {waited:?} waiting for the lock on {file_name}")]
    LockTimeout { file_name: String, waited: Duration },

    #[error("Invalid watermark settings: {0}")]
    InvalidSettings(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

impl ThumbnailError {
    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from the storage backend rather than the picture itself.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
