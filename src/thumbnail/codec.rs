//! Thumbnail codec: decode → resize → encode
//!
//! Thumbnails keep the format of their source picture. Resizing scales the
//! longest side to the target size and may upscale.

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage, ImageFormat};
use std::borrow::Cow;
use std::io::Cursor;
use std::num::NonZeroU32;

use super::error::ThumbnailError;

/// Quality used when the configured default is unset or not positive.
pub const FALLBACK_QUALITY: u8 = 80;

/// Map a configured quality to the encoder's 1-100 range.
pub fn effective_quality(configured: i32) -> u8 {
    if configured <= 0 {
        FALLBACK_QUALITY
    } else {
        configured.min(100) as u8
    }
}

/// Decode picture bytes, returning the image and the detected format.
pub fn decode_image(data: &[u8]) -> Result<(DynamicImage, ImageFormat), ThumbnailError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| ThumbnailError::Decode("unrecognized image format".to_string()))?;

    let image = reader
        .decode()
        .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

    Ok((image, format))
}

/// Dimensions after scaling the longest side to `target_size`.
///
/// Portrait images get height `target_size`; landscape and square images get
/// width `target_size`. The other side keeps the aspect ratio, truncated, and
/// never drops below 1.
pub fn calculate_dimensions(src_width: u32, src_height: u32, target_size: u32) -> (u32, u32) {
    if src_width == 0 || src_height == 0 {
        return (target_size.max(1), target_size.max(1));
    }

    let target = target_size as f64;
    let (width, height) = if src_height > src_width {
        ((src_width as f64 * (target / src_height as f64)) as u32, target_size)
    } else {
        (target_size, (src_height as f64 * (target / src_width as f64)) as u32)
    };

    (width.max(1), height.max(1))
}

/// Resize image using fast-image-resize with Lanczos3 filter
pub fn resize_image(
    img: &DynamicImage,
    target_w: u32,
    target_h: u32,
) -> Result<DynamicImage, ThumbnailError> {
    let src_w = img.width();
    let src_h = img.height();

    if (src_w, src_h) == (target_w, target_h) {
        return Ok(img.clone());
    }

    let src_width = NonZeroU32::new(src_w)
        .ok_or_else(|| ThumbnailError::Resize("Source width is 0".to_string()))?;
    let src_height = NonZeroU32::new(src_h)
        .ok_or_else(|| ThumbnailError::Resize("Source height is 0".to_string()))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| ThumbnailError::Resize("Target width is 0".to_string()))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| ThumbnailError::Resize("Target height is 0".to_string()))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ThumbnailError::Resize(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ThumbnailError::Resize(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ThumbnailError::Resize("Failed to create output image buffer".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}

/// Trait for thumbnail encoders
pub trait ThumbnailEncoder: Send + Sync {
    /// The format this encoder produces
    fn format(&self) -> ImageFormat;

    /// Encode an image; `quality` is 1-100 and ignored by lossless formats
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ThumbnailError>;
}

/// JPEG encoder using the image crate
pub struct JpegEncoder;

impl ThumbnailEncoder for JpegEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ThumbnailError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;

        // JPEG doesn't support alpha
        let rgb = image.to_rgb8();

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, quality);

        encoder
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| ThumbnailError::encode_failed("jpeg", e.to_string()))?;

        Ok(output.into_inner())
    }
}

/// PNG encoder using the image crate; keeps 8/16-bit gray and color layouts
pub struct PngEncoder;

impl ThumbnailEncoder for PngEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Vec<u8>, ThumbnailError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;

        let image: Cow<'_, DynamicImage> = match image.color() {
            ColorType::Rgb32F | ColorType::Rgba32F => {
                Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
            }
            _ => Cow::Borrowed(image),
        };

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);

        encoder
            .write_image(image.as_bytes(), image.width(), image.height(), image.color())
            .map_err(|e| ThumbnailError::encode_failed("png", e.to_string()))?;

        Ok(output.into_inner())
    }
}

/// WebP encoder using the image crate
///
/// Note: The `image` crate only supports lossless WebP encoding.
pub struct WebPEncoder;

impl ThumbnailEncoder for WebPEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::WebP
    }

    fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Vec<u8>, ThumbnailError> {
        use image::codecs::webp::WebPEncoder as ImageWebPEncoder;
        use image::ImageEncoder as _;

        let rgba = image.to_rgba8();

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageWebPEncoder::new_lossless(&mut output);

        encoder
            .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
            .map_err(|e| ThumbnailError::encode_failed("webp", e.to_string()))?;

        Ok(output.into_inner())
    }
}

/// GIF encoder using the image crate (single frame)
pub struct GifEncoder;

impl ThumbnailEncoder for GifEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Gif
    }

    fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Vec<u8>, ThumbnailError> {
        use image::codecs::gif::GifEncoder as ImageGifEncoder;

        let rgba = image.to_rgba8();

        let mut output = Vec::new();
        {
            let mut encoder = ImageGifEncoder::new(&mut output);
            encoder
                .encode(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
                .map_err(|e| ThumbnailError::encode_failed("gif", e.to_string()))?;
        }

        Ok(output)
    }
}

/// Encoder for a source format. Formats without an encoder fall back to PNG.
pub fn encoder_for(format: ImageFormat) -> Box<dyn ThumbnailEncoder> {
    match format {
        ImageFormat::Jpeg => Box::new(JpegEncoder),
        ImageFormat::WebP => Box::new(WebPEncoder),
        ImageFormat::Gif => Box::new(GifEncoder),
        _ => Box::new(PngEncoder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use rstest::rstest;

    fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        JpegEncoder
            .encode(&DynamicImage::ImageRgb8(img), 90)
            .unwrap()
    }

    #[rstest]
    #[case(0, 80)]
    #[case(-5, 80)]
    #[case(75, 75)]
    #[case(250, 100)]
    fn test_effective_quality(#[case] configured: i32, #[case] expected: u8) {
        assert_eq!(effective_quality(configured), expected);
    }

    #[rstest]
    #[case((800, 600), 100, (100, 75))]
    #[case((600, 800), 100, (75, 100))]
    #[case((500, 500), 100, (100, 100))]
    #[case((50, 25), 200, (200, 100))]
    #[case((1000, 1), 100, (100, 1))]
    #[case((333, 1000), 100, (33, 100))]
    fn test_calculate_dimensions(
        #[case] src: (u32, u32),
        #[case] target: u32,
        #[case] expected: (u32, u32),
    ) {
        assert_eq!(calculate_dimensions(src.0, src.1, target), expected);
    }

    #[test]
    fn test_decode_image() {
        let (img, format) = decode_image(&create_test_jpeg(100, 100)).unwrap();
        assert_eq!(img.width(), 100);
        assert_eq!(img.height(), 100);
        assert_eq!(format, ImageFormat::Jpeg);
    }

    #[test]
    fn test_decode_invalid_data() {
        let result = decode_image(b"not an image");
        assert!(matches!(result, Err(ThumbnailError::Decode(_))));
    }

    #[test]
    fn test_resize_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(80, 40, Rgba([1, 2, 3, 255])));
        let resized = resize_image(&img, 20, 10).unwrap();
        assert_eq!((resized.width(), resized.height()), (20, 10));
    }

    #[test]
    fn test_resize_rejects_zero_target() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(10, 10));
        assert!(matches!(resize_image(&img, 0, 5), Err(ThumbnailError::Resize(_))));
    }

    #[rstest]
    #[case(ImageFormat::Jpeg)]
    #[case(ImageFormat::Png)]
    #[case(ImageFormat::WebP)]
    #[case(ImageFormat::Gif)]
    fn test_encoders_keep_source_format(#[case] format: ImageFormat) {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 8, Rgba([10, 20, 30, 255])));
        let encoder = encoder_for(format);
        assert_eq!(encoder.format(), format);

        let bytes = encoder.encode(&img, 80).unwrap();
        let (decoded, detected) = decode_image(&bytes).unwrap();
        assert_eq!(detected, format);
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_png_keeps_gray_layout() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(4, 4, image::Luma([9])));
        let bytes = PngEncoder.encode(&img, 80).unwrap();
        let (decoded, _) = decode_image(&bytes).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_unknown_format_falls_back_to_png() {
        assert_eq!(encoder_for(ImageFormat::Bmp).format(), ImageFormat::Png);
    }
}
