// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::LogFormat;
use crate::watermark::WatermarkSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub thumbs: ThumbsConfig,
    #[serde(default)]
    pub fonts: FontsConfig,
    #[serde(default)]
    pub locks: LockConfig,
    #[serde(default)]
    pub existence_cache: ExistenceCacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Initial watermark settings shared by every store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<WatermarkSettings>,
}

fn default_image_quality() -> i32 {
    80
}

fn default_picture_name() -> String {
    "default-image.png".to_string()
}

fn default_thumbs_dir() -> PathBuf {
    PathBuf::from("thumbs")
}

fn default_url_base() -> String {
    "/images/thumbs".to_string()
}

fn default_fonts_dir() -> PathBuf {
    PathBuf::from("fonts")
}

/// Default lock wait (30s)
fn default_lock_timeout_secs() -> u64 {
    30
}

/// Default TTL of the existence memo (60s)
fn default_existence_ttl_secs() -> u64 {
    60
}

fn default_existence_max_entries() -> u64 {
    10_000
}

/// Picture encoding and the placeholder picture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Encoder quality (1-100); 0 falls back to 80
    #[serde(default = "default_image_quality")]
    pub default_image_quality: i32,

    /// File name the placeholder thumbnails are derived from
    #[serde(default = "default_picture_name")]
    pub default_picture_name: String,

    /// Placeholder picture on disk; without it placeholder URLs are not backed by a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_picture_path: Option<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            default_image_quality: default_image_quality(),
            default_picture_name: default_picture_name(),
            default_picture_path: None,
        }
    }
}

/// Where thumbnails are written and served from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbsConfig {
    #[serde(default = "default_thumbs_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_url_base")]
    pub url_base: String,
}

impl Default for ThumbsConfig {
    fn default() -> Self {
        Self {
            dir: default_thumbs_dir(),
            url_base: default_url_base(),
        }
    }
}

/// Directory of .ttf/.otf files available to text watermarks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontsConfig {
    #[serde(default = "default_fonts_dir")]
    pub dir: PathBuf,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            dir: default_fonts_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long a request waits for another producer of the same thumbnail
    #[serde(default = "default_lock_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Memo of thumbnails known to exist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistenceCacheConfig {
    #[serde(default = "default_existence_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_existence_max_entries")]
    pub max_entries: u64,
}

impl Default for ExistenceCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_existence_ttl_secs(),
            max_entries: default_existence_max_entries(),
        }
    }
}

impl ExistenceCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0..=100).contains(&self.media.default_image_quality) {
            return Err(format!(
                "media.default_image_quality must be between 0 and 100, got {}",
                self.media.default_image_quality
            ));
        }

        let name = &self.media.default_picture_name;
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(format!(
                "media.default_picture_name '{}' is not a plain file name",
                name
            ));
        }

        if self.thumbs.url_base.is_empty() {
            return Err("thumbs.url_base cannot be empty".to_string());
        }

        if self.locks.timeout_secs == 0 {
            return Err("locks.timeout_secs must be greater than 0".to_string());
        }

        if self.existence_cache.max_entries == 0 {
            return Err("existence_cache.max_entries must be greater than 0".to_string());
        }

        if let Some(watermark) = &self.watermark {
            watermark
                .validate()
                .map_err(|e| format!("watermark: {}", e))?;
        }

        Ok(())
    }
}
