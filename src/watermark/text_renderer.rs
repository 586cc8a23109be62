//! Text watermark rendering.
//!
//! This module sizes and renders text watermarks to RGBA images that can be
//! composited onto target images.
//!
//! # Features
//!
//! - Hex color parsing (#RGB and #RRGGBB formats)
//! - Largest font size whose rotated box fits a bounding box
//! - Text rotation about the center for diagonal watermarks
//!
//! Rotation is clockwise in image coordinates (y axis pointing down). The
//! rendered canvas is exactly the truncated rotated bounding box of the
//! measured text, with the text centered in it.

use super::font::Typeface;
use super::WatermarkError;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Font size search ceiling for boxes whose longer side is below it, in pixels.
pub const MAX_FONT_SIZE: u32 = 2048;

/// Smallest font size the search tries before giving up with size 1.
const MIN_FONT_SIZE: u32 = 2;

/// RGB color, written as `#RRGGBB` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_hex_color(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
///
/// # Examples
///
/// ```ignore
/// let white = parse_hex_color("#FFF").unwrap();
/// assert_eq!(white, Color::new(255, 255, 255));
///
/// let red = parse_hex_color("#FF0000").unwrap();
/// assert_eq!(red, Color::new(255, 0, 0));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let hex = hex
        .trim()
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::ConfigError("Color must start with '#'".to_string()))?;

    let digit = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| WatermarkError::ConfigError(format!("Invalid hex digits '{}'", s)))
    };

    if !hex.is_ascii() {
        return Err(WatermarkError::ConfigError(
            "Color must contain only hex digits".to_string(),
        ));
    }

    match hex.len() {
        3 => {
            // Double each component: 0xF -> 0xFF, 0xA -> 0xAA
            let r = digit(&hex[0..1])?;
            let g = digit(&hex[1..2])?;
            let b = digit(&hex[2..3])?;
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => Ok(Color::new(
            digit(&hex[0..2])?,
            digit(&hex[2..4])?,
            digit(&hex[4..6])?,
        )),
        _ => Err(WatermarkError::ConfigError(format!(
            "Color must be #RGB or #RRGGBB format, got {} characters",
            hex.len()
        ))),
    }
}

/// Bounding box of a `width` x `height` rectangle rotated by `degrees`.
///
/// `rw = h*|sin| + w*|cos|`, `rh = h*|cos| + w*|sin|`. Only the angle modulo
/// 360 matters.
pub fn rotated_rect_size(width: f64, height: f64, degrees: i32) -> (f64, f64) {
    let radians = (degrees.rem_euclid(360) as f64).to_radians();
    let sin = radians.sin().abs();
    let cos = radians.cos().abs();

    (height * sin + width * cos, height * cos + width * sin)
}

fn rotated_text_fits(
    face: &dyn Typeface,
    text: &str,
    font_size: u32,
    degrees: i32,
    max_box: (u32, u32),
) -> bool {
    let size = face.measure(text, font_size as f32);
    let (rw, rh) = rotated_rect_size(size.width as f64, size.height as f64, degrees);

    (rw as i64) <= max_box.0 as i64 && (rh as i64) <= max_box.1 as i64
}

/// Largest integer font size whose rotated text box fits `max_box`.
///
/// Equivalent to scanning sizes 2, 3, ... and returning one less than the
/// first size that overflows, so a box too small even for size 2 yields 1.
/// Sizes are probed with an exponential then a binary search, up to the larger
/// of [`MAX_FONT_SIZE`] and the longer side of `max_box`. A face whose line
/// height is at least its font size never fits beyond that, so the ceiling
/// does not change the result for real fonts.
pub fn compute_max_font_size(
    face: &dyn Typeface,
    text: &str,
    degrees: i32,
    max_box: (u32, u32),
) -> u32 {
    let fits = |size: u32| rotated_text_fits(face, text, size, degrees, max_box);
    let ceiling = MAX_FONT_SIZE.max(max_box.0.max(max_box.1));

    if !fits(MIN_FONT_SIZE) {
        return MIN_FONT_SIZE - 1;
    }

    // lo always fits, hi never does
    let mut lo = MIN_FONT_SIZE;
    let mut hi = MIN_FONT_SIZE * 2;
    loop {
        if hi >= ceiling {
            if fits(ceiling) {
                return ceiling;
            }
            hi = ceiling;
            break;
        }
        if !fits(hi) {
            break;
        }
        lo = hi;
        hi = hi.saturating_mul(2);
    }

    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    lo
}

/// Options for rendering a text watermark.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// The text to render.
    pub text: String,
    /// Font size in pixels.
    pub font_size: u32,
    /// Text color (RGB).
    pub color: Color,
    /// Opacity (0.0 to 1.0).
    pub opacity: f32,
    /// Clockwise rotation in degrees.
    pub rotation_degrees: i32,
}

/// Glyph coverage of the unrotated text, one float per pixel.
struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl CoverageMask {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    fn add(&mut self, x: i32, y: i32, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = (self.data[idx] + coverage).min(1.0);
    }

    fn get(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0.0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Bilinear sample with pixel centers at integer coordinates; outside is empty.
    fn sample(&self, sx: f64, sy: f64) -> f32 {
        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = (sx - x0) as f32;
        let fy = (sy - y0) as f32;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let v00 = self.get(x0, y0);
        let v10 = self.get(x0 + 1, y0);
        let v01 = self.get(x0, y0 + 1);
        let v11 = self.get(x0 + 1, y0 + 1);

        v00 * (1.0 - fx) * (1.0 - fy)
            + v10 * fx * (1.0 - fy)
            + v01 * (1.0 - fx) * fy
            + v11 * fx * fy
    }
}

/// Render rotated text to an RGBA image.
///
/// The canvas is the truncated rotated bounding box of the measured text.
/// Every pixel carries the text color; alpha is `trunc(opacity * 255)`
/// scaled by glyph coverage.
pub fn render_text(
    face: &dyn Typeface,
    options: &TextRenderOptions,
) -> Result<RgbaImage, WatermarkError> {
    if options.text.is_empty() {
        return Err(WatermarkError::RenderError(
            "Cannot render empty text".to_string(),
        ));
    }

    let size = face.measure(&options.text, options.font_size as f32);
    if !size.width.is_finite() || !size.height.is_finite() {
        return Err(WatermarkError::RenderError(format!(
            "Font '{}' produced an invalid text extent",
            face.name()
        )));
    }

    let (rw, rh) = rotated_rect_size(
        size.width as f64,
        size.height as f64,
        options.rotation_degrees,
    );
    let canvas_width = (rw as u32).max(1);
    let canvas_height = (rh as u32).max(1);

    // Unrotated text, clipped to its measured box
    let mut mask = CoverageMask::new((size.width as u32).max(1), (size.height as u32).max(1));
    face.rasterize(
        &options.text,
        options.font_size as f32,
        (0.0, 0.0),
        &mut |x, y, coverage| mask.add(x, y, coverage),
    );

    let alpha = (options.opacity.clamp(0.0, 1.0) * 255.0) as u8;
    let color = options.color;

    let radians = (options.rotation_degrees.rem_euclid(360) as f64).to_radians();
    let (sin, cos) = radians.sin_cos();

    let src_cx = mask.width as f64 / 2.0;
    let src_cy = mask.height as f64 / 2.0;
    let dst_cx = canvas_width as f64 / 2.0;
    let dst_cy = canvas_height as f64 / 2.0;

    let mut image = RgbaImage::new(canvas_width, canvas_height);

    for dy in 0..canvas_height {
        for dx in 0..canvas_width {
            // Destination pixel center relative to the canvas center
            let rx = dx as f64 + 0.5 - dst_cx;
            let ry = dy as f64 + 0.5 - dst_cy;

            // Inverse of the clockwise rotation
            let ux = rx * cos + ry * sin;
            let uy = -rx * sin + ry * cos;

            let coverage = mask.sample(ux + src_cx - 0.5, uy + src_cy - 0.5);
            let pixel_alpha = (coverage * alpha as f32) as u8;
            if pixel_alpha > 0 {
                image.put_pixel(dx, dy, Rgba([color.r, color.g, color.b, pixel_alpha]));
            }
        }
    }

    Ok(image)
}
