//! Watermark compositor for blending watermarks onto images.
//!
//! This module decides whether an image gets watermarked and stamps the text
//! and picture layers onto it.
//!
//! # Features
//!
//! - Straight alpha "over" blending with an extra layer opacity
//! - Text layer sized to the largest font that fits its bounding box
//! - Picture layer scaled down to fit its bounding box
//! - The same stamp repeated at every configured anchor, clipped at the edges
//!
//! Text is applied before the picture layer, so the picture ends up on top
//! where both overlap.

use super::eligibility::Eligibility;
use super::font::{resolve_with_fallback, FontResolver, Typeface};
use super::position::{calculate_position, ImageDimensions, PlacementPosition, WatermarkDimensions};
use super::text_renderer::{compute_max_font_size, render_text, TextRenderOptions};
use super::{CommonSettings, WatermarkError, WatermarkSettings};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// A watermark stamp placed at one position.
#[derive(Clone, Copy)]
pub struct WatermarkLayer<'a> {
    /// The watermark image (RGBA).
    pub image: &'a RgbaImage,
    /// Position where the watermark should be placed.
    pub position: PlacementPosition,
    /// Opacity to apply (0.0 to 1.0). Applied on top of image's alpha channel.
    pub opacity: f32,
}

impl std::fmt::Debug for WatermarkLayer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkLayer")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .finish()
    }
}

/// Applies the configured watermark layers to images.
#[derive(Clone)]
pub struct WatermarkCompositor {
    fonts: Arc<dyn FontResolver>,
}

impl WatermarkCompositor {
    pub fn new(fonts: Arc<dyn FontResolver>) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &Arc<dyn FontResolver> {
        &self.fonts
    }

    /// Apply the text and picture watermarks to `image`.
    ///
    /// Returns the input untouched when the picture is not eligible, is not
    /// larger than the configured minimum, or no layer would draw. Otherwise
    /// the result is an RGBA image. `asset` is the decoded watermark picture,
    /// if one is configured and could be loaded.
    pub fn apply(
        &self,
        image: DynamicImage,
        settings: &WatermarkSettings,
        eligibility: Eligibility,
        asset: Option<&RgbaImage>,
    ) -> Result<DynamicImage, WatermarkError> {
        if !eligibility.required || !settings.is_large_enough(image.width(), image.height()) {
            return Ok(image);
        }

        let draw_text = settings.text_layer_active();
        let picture = asset.filter(|_| {
            settings.watermark_picture_enable && !settings.picture_layout.positions.is_empty()
        });

        if !draw_text && picture.is_none() {
            return Ok(image);
        }

        // Resolve before converting so a font failure leaves no partial work
        let face = if draw_text {
            let face = resolve_with_fallback(self.fonts.as_ref(), &settings.font_name)
                .ok_or_else(|| {
                    WatermarkError::ConfigError(format!(
                        "Font '{}' is not available and no fallback fonts are installed",
                        settings.font_name
                    ))
                })?;
            Some(face)
        } else {
            None
        };

        let mut canvas = image.into_rgba8();

        if let Some(face) = face {
            place_text_watermark(&mut canvas, settings, face.as_ref())?;
        }

        if let Some(picture) = picture {
            place_image_watermark(&mut canvas, picture, &settings.picture_layout);
        }

        Ok(DynamicImage::ImageRgba8(canvas))
    }
}

/// Render the text watermark once and stamp it at every text position.
pub fn place_text_watermark(
    target: &mut RgbaImage,
    settings: &WatermarkSettings,
    face: &dyn Typeface,
) -> Result<(), WatermarkError> {
    let layout = &settings.text_layout;
    let max_box = layout.bounding_box(target.width(), target.height());
    if max_box.0 == 0 || max_box.1 == 0 {
        return Ok(());
    }

    let font_size = compute_max_font_size(
        face,
        &settings.watermark_text,
        settings.text_rotation_degrees,
        max_box,
    );

    let stamp = render_text(
        face,
        &TextRenderOptions {
            text: settings.watermark_text.clone(),
            font_size,
            color: settings.text_color,
            opacity: layout.clamped_opacity(),
            rotation_degrees: settings.text_rotation_degrees,
        },
    )?;

    debug!(
        font = %face.name(),
        font_size = font_size,
        width = stamp.width(),
        height = stamp.height(),
        "Rendered text watermark"
    );

    // Opacity is already baked into the stamp's alpha
    stamp_at_positions(target, &stamp, layout, 1.0);
    Ok(())
}

/// Scale the watermark picture into its bounding box and stamp it at every
/// picture position with the layout opacity.
pub fn place_image_watermark(
    target: &mut RgbaImage,
    picture: &RgbaImage,
    layout: &CommonSettings,
) {
    let bounds = layout.bounding_box(target.width(), target.height());
    let (width, height) = scale_to_fit_bounds(picture.dimensions(), bounds);
    if width == 0 || height == 0 {
        return;
    }

    let stamp: Cow<'_, RgbaImage> = if (width, height) == picture.dimensions() {
        Cow::Borrowed(picture)
    } else {
        Cow::Owned(image::imageops::resize(picture, width, height, FilterType::Lanczos3))
    };

    stamp_at_positions(target, &stamp, layout, layout.clamped_opacity());
}

fn stamp_at_positions(
    target: &mut RgbaImage,
    stamp: &RgbaImage,
    layout: &CommonSettings,
    opacity: f32,
) {
    let image_dims = ImageDimensions {
        width: target.width(),
        height: target.height(),
    };
    let wm_dims = WatermarkDimensions {
        width: stamp.width(),
        height: stamp.height(),
    };

    for &position in &layout.positions {
        let layer = WatermarkLayer {
            image: stamp,
            position: calculate_position(position, &image_dims, &wm_dims),
            opacity,
        };
        blend_layer(target, &layer);
    }
}

/// Size of `actual` after fitting it into `bounds`.
///
/// A picture strictly smaller than the bounds in both dimensions keeps its
/// natural size; a zero bound yields `(0, 0)`; otherwise both dimensions are
/// divided by the larger of the two ratios and truncated.
pub fn scale_to_fit_bounds(actual: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (aw, ah) = actual;
    let (bw, bh) = bounds;

    if aw < bw && ah < bh {
        return actual;
    }

    if bw == 0 || bh == 0 {
        return (0, 0);
    }

    let factor = (aw as f64 / bw as f64).max(ah as f64 / bh as f64);
    ((aw as f64 / factor) as u32, (ah as f64 / factor) as u32)
}

/// Blend a single watermark layer onto the target image.
pub fn blend_layer(target: &mut RgbaImage, layer: &WatermarkLayer<'_>) {
    let target_width = target.width() as i32;
    let target_height = target.height() as i32;

    let wm_width = layer.image.width() as i32;
    let wm_height = layer.image.height() as i32;

    // Calculate the visible region (clamp to target bounds)
    let x_start = layer.position.x.max(0);
    let y_start = layer.position.y.max(0);
    let x_end = (layer.position.x + wm_width).min(target_width);
    let y_end = (layer.position.y + wm_height).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wx = (tx - layer.position.x) as u32;
            let wy = (ty - layer.position.y) as u32;

            let wm_pixel = layer.image.get_pixel(wx, wy);
            if wm_pixel[3] == 0 {
                continue;
            }

            let target_pixel = target.get_pixel(tx as u32, ty as u32);
            let blended = blend_pixels(*target_pixel, *wm_pixel, layer.opacity);
            target.put_pixel(tx as u32, ty as u32, blended);
        }
    }
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    // Apply additional opacity to foreground alpha
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;

    // Porter-Duff "over" operator
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
