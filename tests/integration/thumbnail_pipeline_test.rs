// Thumbnail pipeline integration tests
//
// Full resolve path with the filesystem store:
// - Concurrent requests for one thumbnail write exactly one file
// - Picture watermarks are decoded from the repository and stamped
// - Saving settings and new uploads remove stale files from disk

use bytes::Bytes;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use thumbmark::storage::{
    InMemoryPictureRepository, InMemorySettingsStore, LocalThumbnailStore, Picture, StoreLocation,
};
use thumbmark::thumbnail::ThumbnailService;
use thumbmark::watermark::{DirectoryFontResolver, WatermarkPosition, WatermarkSettings};
use tokio::task::JoinSet;

const URL_BASE: &str = "https://cdn.example.com/thumbs";

fn png(width: u32, height: u32, color: [u8; 4]) -> Bytes {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    Bytes::from(buf.into_inner())
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|name| !name.starts_with('.'))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn picture_watermark() -> WatermarkSettings {
    let mut settings = WatermarkSettings::default();
    settings.watermark_picture_enable = true;
    settings.watermark_picture_id = 5;
    settings.picture_layout.opacity = 1.0;
    settings
        .picture_layout
        .positions
        .insert(WatermarkPosition::Center);
    settings
}

struct Harness {
    _temp: TempDir,
    thumbs_dir: PathBuf,
    pictures: Arc<InMemoryPictureRepository>,
    service: ThumbnailService,
}

fn harness(settings: WatermarkSettings) -> Harness {
    let temp = TempDir::new().unwrap();
    let thumbs_dir = temp.path().join("thumbs");
    let fonts = DirectoryFontResolver::new(temp.path().join("fonts")).unwrap();

    let pictures = Arc::new(InMemoryPictureRepository::new());
    pictures.insert(Picture::new(5, "image/png").with_binary(png(20, 20, [255, 0, 0, 255])));

    let service = ThumbnailService::builder(
        Arc::new(InMemorySettingsStore::with_defaults(settings)),
        pictures.clone(),
        Arc::new(LocalThumbnailStore::new(&thumbs_dir, URL_BASE)),
        Arc::new(fonts),
    )
    .default_image_quality(90)
    .build();

    Harness {
        _temp: temp,
        thumbs_dir,
        pictures,
        service,
    }
}

fn shoe() -> Picture {
    Picture::new(42, "image/png")
        .with_seo_filename("shoe")
        .with_binary(png(400, 400, [255, 255, 255, 255]))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_write_one_file() {
    let h = harness(WatermarkSettings::default());

    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let service = h.service.clone();
        tasks.spawn(async move {
            service
                .resolve(Some(&shoe()), 250, false, &StoreLocation::new(3))
                .await
        });
    }

    let mut urls = Vec::new();
    while let Some(result) = tasks.join_next().await {
        urls.push(result.unwrap().unwrap());
    }

    assert_eq!(urls.len(), 32);
    assert!(urls
        .iter()
        .all(|u| u == "https://cdn.example.com/thumbs/0000042_shoe_250_3.png"));
    assert_eq!(files_in(&h.thumbs_dir), vec!["0000042_shoe_250_3.png"]);
}

#[tokio::test]
async fn test_picture_watermark_is_stamped_in_the_center() {
    let h = harness(picture_watermark());
    h.pictures.reference_by_product(42);

    h.service
        .resolve(Some(&shoe()), 0, false, &StoreLocation::default())
        .await
        .unwrap();

    let saved = image::open(h.thumbs_dir.join("0000042_shoe.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(saved.dimensions(), (400, 400));

    // 20x20 stays unscaled inside the 200x200 box, placed at (190, 190)
    assert_eq!(saved.get_pixel(200, 200), &Rgba([255, 0, 0, 255]));
    assert_eq!(saved.get_pixel(150, 150), &Rgba([255, 255, 255, 255]));
}

#[tokio::test]
async fn test_unreferenced_picture_is_left_alone() {
    let h = harness(picture_watermark());

    h.service
        .resolve(Some(&shoe()), 0, false, &StoreLocation::default())
        .await
        .unwrap();

    let saved = image::open(h.thumbs_dir.join("0000042_shoe.png"))
        .unwrap()
        .to_rgba8();
    assert!(saved.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
}

#[tokio::test]
async fn test_saving_settings_removes_files() {
    let h = harness(WatermarkSettings::default());
    let store = StoreLocation::default();

    h.service
        .resolve(Some(&shoe()), 100, false, &store)
        .await
        .unwrap();
    h.service
        .resolve(Some(&shoe()), 200, false, &store)
        .await
        .unwrap();
    assert_eq!(files_in(&h.thumbs_dir).len(), 2);

    let removed = h
        .service
        .save_settings(0, &picture_watermark())
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert!(files_in(&h.thumbs_dir).is_empty());

    h.service
        .resolve(Some(&shoe()), 100, false, &store)
        .await
        .unwrap();
    assert_eq!(files_in(&h.thumbs_dir), vec!["0000042_shoe_100.png"]);
}

#[tokio::test]
async fn test_new_upload_replaces_only_its_own_thumbnails() {
    let h = harness(WatermarkSettings::default());
    let store = StoreLocation::default();

    let other = Picture::new(43, "image/png").with_binary(png(10, 10, [0, 0, 0, 255]));
    h.service
        .resolve(Some(&other), 50, false, &store)
        .await
        .unwrap();
    h.service
        .resolve(Some(&shoe()), 50, false, &store)
        .await
        .unwrap();
    h.service
        .resolve(Some(&shoe()), 80, false, &store)
        .await
        .unwrap();

    let upload = Picture::new(42, "image/png")
        .with_seo_filename("shoe")
        .with_binary(png(100, 50, [0, 0, 255, 255]))
        .new_upload();
    h.service
        .resolve(Some(&upload), 50, false, &store)
        .await
        .unwrap();

    assert_eq!(
        files_in(&h.thumbs_dir),
        vec!["0000042_shoe_50.png", "0000043_50.png"]
    );
    let replaced = image::open(h.thumbs_dir.join("0000042_shoe_50.png")).unwrap();
    assert_eq!((replaced.width(), replaced.height()), (50, 25));
    assert!(!h.pictures.get(42).unwrap().is_new);
}
