//! Watermark module for stamping text and picture watermarks onto images.
//!
//! Settings are stored per store. A picture is watermarked only when it is
//! referenced by an entity kind the settings enable, and only when it is
//! larger than the configured minimum size.
//!
//! # Features
//!
//! - **Text watermark**: largest font that fits the layer's bounding box,
//!   any rotation, hex color, layer opacity
//! - **Picture watermark**: a repository picture scaled down to fit its
//!   bounding box, decoded once per service
//! - **9 anchors** per layer, any subset, the same stamp at each
//!
//! # Settings Example
//!
//! ```yaml
//! watermark_text_enable: true
//! watermark_text: "(c) Example Shop"
//! font_name: "DejaVu Sans"
//! text_color: "#080347"
//! text_rotation_degrees: 45
//! text_layout:
//!   size_percent: 50
//!   opacity: 0.5
//!   positions: [center]
//! watermark_picture_enable: true
//! watermark_picture_id: 17
//! picture_layout:
//!   size_percent: 20
//!   opacity: 0.8
//!   positions: [top-left, bottom-right]
//! apply_on_product_pictures: true
//! min_width_for_watermark: 150
//! min_height_for_watermark: 150
//! ```

pub mod asset;
pub mod compositor;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod font;
pub mod position;
pub mod text_renderer;

// Re-export main types for convenience
pub use asset::{WatermarkAsset, WatermarkAssets};
pub use compositor::{blend_layer, scale_to_fit_bounds, WatermarkCompositor, WatermarkLayer};
pub use config::{CommonSettings, WatermarkPosition, WatermarkSettings};
pub use eligibility::{is_watermark_required, Eligibility};
pub use error::WatermarkError;
pub use font::{AbGlyphTypeface, DirectoryFontResolver, FontResolver, TextSize, Typeface};
pub use position::{calculate_position, ImageDimensions, PlacementPosition, WatermarkDimensions};
pub use text_renderer::{
    compute_max_font_size, parse_hex_color, render_text, rotated_rect_size, Color,
    TextRenderOptions,
};
