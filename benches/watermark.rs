use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use thumbmark::thumbnail::render_thumbnail;
use thumbmark::watermark::{
    compute_max_font_size, Eligibility, FontResolver, TextSize, Typeface, WatermarkCompositor,
    WatermarkPosition, WatermarkSettings,
};

/// Solid-block glyphs, so the numbers do not depend on installed fonts
struct BlockFace;

impl Typeface for BlockFace {
    fn name(&self) -> &str {
        "Block"
    }

    fn measure(&self, text: &str, px: f32) -> TextSize {
        TextSize {
            width: 0.6 * px * text.chars().count() as f32,
            height: px,
        }
    }

    fn rasterize(
        &self,
        text: &str,
        px: f32,
        origin: (f32, f32),
        plot: &mut dyn FnMut(i32, i32, f32),
    ) {
        let advance = 0.6 * px;
        for i in 0..text.chars().count() {
            let left = (origin.0 + i as f32 * advance + 0.1 * px) as i32;
            let right = (origin.0 + i as f32 * advance + 0.5 * px) as i32;
            for y in (origin.1 + 0.2 * px) as i32..(origin.1 + 0.8 * px) as i32 {
                for x in left..right {
                    plot(x, y, 1.0);
                }
            }
        }
    }
}

struct BlockFonts;

impl FontResolver for BlockFonts {
    fn resolve(&self, _name: &str) -> Option<Arc<dyn Typeface>> {
        Some(Arc::new(BlockFace))
    }

    fn list_available(&self) -> Vec<String> {
        vec!["Block".to_string()]
    }
}

fn create_bench_image(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbaImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255]);
    }
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn watermark_settings() -> WatermarkSettings {
    let mut settings = WatermarkSettings::default();
    settings.watermark_text_enable = true;
    settings.text_rotation_degrees = 45;
    settings.text_layout.positions = [WatermarkPosition::Center, WatermarkPosition::BottomRight]
        .into_iter()
        .collect();
    settings
}

fn bench_font_size_search(c: &mut Criterion) {
    c.bench_function("font_size_search_rotated", |b| {
        b.iter(|| {
            compute_max_font_size(
                black_box(&BlockFace),
                black_box("(c) Example Shop 2024"),
                black_box(30),
                black_box((960, 540)),
            )
        })
    });
}

fn bench_render_thumbnail(c: &mut Criterion) {
    let input_data = create_bench_image(1920, 1080);
    let compositor = WatermarkCompositor::new(Arc::new(BlockFonts));
    let settings = watermark_settings();

    let mut group = c.benchmark_group("render_thumbnail");
    group.sample_size(10); // Image ops are slow, reduce sample size

    group.bench_function("1080p_to_400_plain", |b| {
        b.iter(|| {
            render_thumbnail(
                &compositor,
                black_box(&input_data),
                400,
                &settings,
                Eligibility::not_required(),
                None,
                80,
            )
            .unwrap()
        })
    });

    group.bench_function("1080p_to_400_watermarked", |b| {
        b.iter(|| {
            render_thumbnail(
                &compositor,
                black_box(&input_data),
                400,
                &settings,
                Eligibility::required(),
                None,
                80,
            )
            .unwrap()
        })
    });

    group.bench_function("1080p_original_size_watermarked", |b| {
        b.iter(|| {
            render_thumbnail(
                &compositor,
                black_box(&input_data),
                0,
                &settings,
                Eligibility::required(),
                None,
                80,
            )
            .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_font_size_search, bench_render_thumbnail);
criterion_main!(benches);
