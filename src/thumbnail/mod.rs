//! Thumbnail resolution pipeline.
//!
//! Turns a stored picture into the URL of a resized, optionally watermarked
//! thumbnail, producing each thumbnail file at most once.
//!
//! # Flow
//!
//! 1. Derive the canonical file name (`{id:07}[_{seo}][_{size}][_{store}].{ext}`)
//! 2. Return the URL right away if the thumbnail is known to exist
//! 3. Otherwise take the per-file-name lock and check the backend again
//! 4. Decode, resize, watermark and encode in the source format
//! 5. Save through the [`ThumbnailCache`](crate::storage::ThumbnailCache)

pub mod codec;
pub mod error;
pub mod existence;
pub mod filename;
pub mod locks;
pub mod pipeline;

pub use codec::{calculate_dimensions, effective_quality, ThumbnailEncoder};
pub use error::ThumbnailError;
pub use filename::{extension_from_mime, thumb_file_name};
pub use pipeline::{render_thumbnail, ThumbnailService, ThumbnailServiceBuilder};
