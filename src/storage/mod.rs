//! Storage collaborators: settings, pictures and generated thumbnails.
//!
//! The pipeline depends only on the traits in [`traits`]. Two families of
//! implementations ship with the crate:
//! - **local**: thumbnails as files in a directory (tokio::fs)
//! - **memory**: HashMap-backed stores for tests and one-off CLI renders

pub mod error;
pub mod local;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use local::LocalThumbnailStore;
pub use memory::{InMemoryPictureRepository, InMemorySettingsStore, InMemoryThumbnailCache};
pub use traits::{is_thumbnail_of, PictureRepository, PictureUsage, SettingsStore, ThumbnailCache};
pub use types::{Picture, StoreLocation};
