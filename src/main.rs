use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thumbmark::config::Config;
use thumbmark::logging::LogFormat;
use thumbmark::storage::{
    InMemoryPictureRepository, InMemorySettingsStore, LocalThumbnailStore, Picture, StoreLocation,
};
use thumbmark::thumbnail::filename::mime_from_extension;
use thumbmark::thumbnail::ThumbnailService;
use thumbmark::watermark::font::resolve_with_fallback;
use thumbmark::watermark::{DirectoryFontResolver, FontResolver};

/// Thumbmark - watermarked thumbnails, produced once per file name
#[derive(Parser, Debug)]
#[command(name = "thumbmark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "thumbmark.yaml")]
    config: PathBuf,

    /// Override the configured log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the thumbnail of an image file and print its URL
    Render {
        /// Source image
        file: PathBuf,

        /// Longest side in pixels; 0 keeps the original size
        #[arg(long, default_value_t = 0)]
        size: u32,

        #[arg(long, default_value_t = 1)]
        picture_id: i32,

        /// SEO part of the file name
        #[arg(long)]
        seo: Option<String>,

        /// Store id; 0 is the default store
        #[arg(long, default_value_t = 0)]
        store: i32,

        /// Treat the picture as not used by any product
        #[arg(long)]
        unreferenced: bool,
    },

    /// List the font families available to text watermarks
    Fonts,

    /// Check the configuration and watermark settings, then exit
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    thumbmark::logging::init_subscriber(args.log_format.unwrap_or(config.logging.format))
        .map_err(|e| anyhow!(e))?;

    tracing::info!(
        config_file = %args.config.display(),
        thumbs_dir = %config.thumbs.dir.display(),
        fonts_dir = %config.fonts.dir.display(),
        "Configuration loaded successfully"
    );

    match args.command {
        Command::Render {
            file,
            size,
            picture_id,
            seo,
            store,
            unreferenced,
        } => {
            let url = render(&config, &file, size, picture_id, seo, store, unreferenced).await?;
            println!("{}", url);
        }
        Command::Fonts => {
            let fonts = font_resolver(&config)?;
            for family in fonts.list_available() {
                println!("{}", family);
            }
        }
        Command::Validate => {
            validate(&config)?;
            println!("Configuration OK");
        }
    }

    Ok(())
}

fn font_resolver(config: &Config) -> Result<DirectoryFontResolver> {
    DirectoryFontResolver::new(&config.fonts.dir).with_context(|| {
        format!(
            "Failed to read font directory {}",
            config.fonts.dir.display()
        )
    })
}

fn validate(config: &Config) -> Result<()> {
    config.validate().map_err(|e| anyhow!(e))?;

    if let Some(watermark) = config
        .watermark
        .as_ref()
        .filter(|w| w.watermark_text_enable)
    {
        let fonts = font_resolver(config)?;
        if resolve_with_fallback(&fonts, &watermark.font_name).is_none() {
            return Err(anyhow!(
                "Font '{}' is not available and {} contains no fonts",
                watermark.font_name,
                config.fonts.dir.display()
            ));
        }
    }

    Ok(())
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    mime_from_extension(extension)
}

async fn render(
    config: &Config,
    file: &Path,
    size: u32,
    picture_id: i32,
    seo: Option<String>,
    store_id: i32,
    unreferenced: bool,
) -> Result<String> {
    validate(config)?;

    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut picture = Picture::new(picture_id, mime_for(file)).with_binary(data);
    if let Some(seo) = seo {
        picture = picture.with_seo_filename(seo);
    }

    let pictures = Arc::new(InMemoryPictureRepository::new());
    pictures.insert(picture.clone());
    if !unreferenced {
        pictures.reference_by_product(picture_id);
    }

    let default_picture = match &config.media.default_picture_path {
        Some(path) => Some(Bytes::from(tokio::fs::read(path).await.with_context(|| {
            format!("Failed to read default picture {}", path.display())
        })?)),
        None => None,
    };

    let service = ThumbnailService::builder(
        Arc::new(InMemorySettingsStore::with_defaults(
            config.watermark.clone().unwrap_or_default(),
        )),
        pictures,
        Arc::new(LocalThumbnailStore::new(
            &config.thumbs.dir,
            config.thumbs.url_base.clone(),
        )),
        Arc::new(font_resolver(config)?),
    )
    .default_image_quality(config.media.default_image_quality)
    .lock_timeout(config.locks.timeout())
    .existence_cache(
        config.existence_cache.ttl(),
        config.existence_cache.max_entries,
    )
    .default_picture(config.media.default_picture_name.clone(), default_picture)
    .build();

    let url = service
        .resolve(Some(&picture), size, true, &StoreLocation::new(store_id))
        .await?;

    Ok(url)
}
