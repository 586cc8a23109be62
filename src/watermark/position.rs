//! Position calculation for watermark placement.
//!
//! Maps one of the nine anchors to the top-left corner where a watermark of a
//! given size is drawn. Centering uses `W/2 - w/2` (each half truncated on its
//! own), so an odd-sized watermark on an odd-sized image can land one pixel
//! left of the mathematical center. Coordinates may be negative when the
//! watermark is larger than the image; drawing clips.

use super::WatermarkPosition;

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the watermark to be placed.
#[derive(Debug, Clone, Copy)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// A single position where a watermark should be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Calculate the top-left corner for a watermark at `position`.
pub fn calculate_position(
    position: WatermarkPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
) -> PlacementPosition {
    let img_w = image.width as i32;
    let img_h = image.height as i32;
    let wm_w = watermark.width as i32;
    let wm_h = watermark.height as i32;

    let center_x = img_w / 2 - wm_w / 2;
    let center_y = img_h / 2 - wm_h / 2;

    match position {
        // Top row
        WatermarkPosition::TopLeft => PlacementPosition::new(0, 0),
        WatermarkPosition::TopCenter => PlacementPosition::new(center_x, 0),
        WatermarkPosition::TopRight => PlacementPosition::new(img_w - wm_w, 0),

        // Center row
        WatermarkPosition::CenterLeft => PlacementPosition::new(0, center_y),
        WatermarkPosition::Center => PlacementPosition::new(center_x, center_y),
        WatermarkPosition::CenterRight => PlacementPosition::new(img_w - wm_w, center_y),

        // Bottom row
        WatermarkPosition::BottomLeft => PlacementPosition::new(0, img_h - wm_h),
        WatermarkPosition::BottomCenter => PlacementPosition::new(center_x, img_h - wm_h),
        WatermarkPosition::BottomRight => PlacementPosition::new(img_w - wm_w, img_h - wm_h),
    }
}
