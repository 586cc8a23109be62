//! Font resolution for text watermarks.
//!
//! A [`FontResolver`] turns a configured font family name into a renderable
//! [`Typeface`]. The bundled [`DirectoryFontResolver`] indexes `*.ttf` and
//! `*.otf` files in a directory, prefers bold variants of a family and keeps
//! loaded faces in memory for the lifetime of the resolver.

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Unrotated extent of a line of text, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSize {
    pub width: f32,
    pub height: f32,
}

/// A face that can measure and rasterize a single line of text.
pub trait Typeface: Send + Sync {
    /// Family name the face was registered under.
    fn name(&self) -> &str;

    /// Measure `text` at `px` pixels.
    fn measure(&self, text: &str, px: f32) -> TextSize;

    /// Rasterize `text` with the top-left corner of its measured box at
    /// `origin`. `plot` receives integer pixel coordinates and glyph coverage
    /// in `[0, 1]`; coordinates may fall outside the measured box.
    fn rasterize(
        &self,
        text: &str,
        px: f32,
        origin: (f32, f32),
        plot: &mut dyn FnMut(i32, i32, f32),
    );
}

/// Resolves font family names to typefaces.
pub trait FontResolver: Send + Sync {
    /// Resolve a family name, preferring a bold face. `None` when unknown.
    fn resolve(&self, name: &str) -> Option<Arc<dyn Typeface>>;

    /// Names of all families this resolver can produce, sorted.
    fn list_available(&self) -> Vec<String>;
}

/// Typeface backed by an `ab_glyph` font.
pub struct AbGlyphTypeface {
    name: String,
    font: FontArc,
}

impl AbGlyphTypeface {
    pub fn new(name: impl Into<String>, font: FontArc) -> Self {
        Self {
            name: name.into(),
            font,
        }
    }

    /// Parse a TrueType/OpenType font from raw bytes.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self, String> {
        let font = FontArc::try_from_vec(data).map_err(|e| e.to_string())?;
        Ok(Self::new(name, font))
    }

    fn advance_width(&self, text: &str, scale: PxScale) -> f32 {
        let scaled_font = self.font.as_scaled(scale);

        let mut width = 0.0f32;
        let mut prev_glyph: Option<GlyphId> = None;

        for c in text.chars() {
            let glyph_id = scaled_font.glyph_id(c);
            if let Some(prev) = prev_glyph {
                width += scaled_font.kern(prev, glyph_id);
            }
            width += scaled_font.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }

        width
    }
}

impl Typeface for AbGlyphTypeface {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(&self, text: &str, px: f32) -> TextSize {
        let scale = PxScale::from(px);
        TextSize {
            width: self.advance_width(text, scale),
            height: self.font.as_scaled(scale).height(),
        }
    }

    fn rasterize(
        &self,
        text: &str,
        px: f32,
        origin: (f32, f32),
        plot: &mut dyn FnMut(i32, i32, f32),
    ) {
        let scale = PxScale::from(px);
        let scaled_font = self.font.as_scaled(scale);
        let baseline_y = origin.1 + scaled_font.ascent();

        let mut cursor_x = origin.0;
        let mut prev_glyph: Option<GlyphId> = None;

        for c in text.chars() {
            let glyph_id = scaled_font.glyph_id(c);

            if let Some(prev) = prev_glyph {
                cursor_x += scaled_font.kern(prev, glyph_id);
            }

            let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, baseline_y));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    plot(
                        gx as i32 + bounds.min.x as i32,
                        gy as i32 + bounds.min.y as i32,
                        coverage,
                    );
                });
            }

            cursor_x += scaled_font.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }
    }
}

const BOLD_SUFFIXES: [&str; 2] = ["bold", "bd"];

/// Lowercase and drop separators so "DejaVu Sans-Bold" matches "dejavusansbold".
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf"))
        .unwrap_or(false)
}

/// Resolver over a directory of font files.
///
/// Family names are file stems; `Arial.ttf`, `Arial-Bold.ttf` and `arialbd.ttf`
/// all belong to the `Arial` family and the bold file wins when present.
pub struct DirectoryFontResolver {
    /// normalized stem -> (display stem, path)
    files: BTreeMap<String, (String, PathBuf)>,
    loaded: RwLock<HashMap<String, Arc<dyn Typeface>>>,
}

impl DirectoryFontResolver {
    /// Index the font files in `dir`. A missing directory yields an empty resolver.
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref();
        let mut files = BTreeMap::new();

        if dir.is_dir() {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if !is_font_file(&path) {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    files.insert(normalize(stem), (stem.to_string(), path.clone()));
                }
            }
        } else {
            warn!(dir = %dir.display(), "Font directory does not exist");
        }

        debug!(dir = %dir.display(), count = files.len(), "Indexed font files");

        Ok(Self {
            files,
            loaded: RwLock::new(HashMap::new()),
        })
    }

    /// Candidate file keys for a family, bold variants first.
    fn candidates(&self, name: &str) -> Vec<String> {
        let base = normalize(name);
        let mut keys: Vec<String> = BOLD_SUFFIXES
            .iter()
            .map(|suffix| format!("{}{}", base, suffix))
            .collect();
        keys.push(base);
        keys
    }

    fn load(&self, key: &str) -> Option<Arc<dyn Typeface>> {
        if let Some(face) = self.loaded.read().get(key) {
            return Some(face.clone());
        }

        let (stem, path) = self.files.get(key)?;
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read font file");
                return None;
            }
        };

        let face: Arc<dyn Typeface> = match AbGlyphTypeface::from_bytes(stem.clone(), data) {
            Ok(face) => Arc::new(face),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse font file");
                return None;
            }
        };

        Some(
            self.loaded
                .write()
                .entry(key.to_string())
                .or_insert(face)
                .clone(),
        )
    }

    /// Strip a bold suffix from a display stem to get the family name.
    fn family_of(stem: &str) -> String {
        let trimmed = stem.trim_end();
        for suffix in ["-Bold", " Bold", "_Bold", "Bold", "bd"] {
            if let Some(base) = trimmed.strip_suffix(suffix) {
                if !base.is_empty() {
                    return base.trim_end_matches([' ', '-', '_']).to_string();
                }
            }
        }
        trimmed.to_string()
    }
}

impl FontResolver for DirectoryFontResolver {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Typeface>> {
        if name.trim().is_empty() {
            return None;
        }
        self.candidates(name)
            .iter()
            .find_map(|key| self.load(key))
    }

    fn list_available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .values()
            .map(|(stem, _)| Self::family_of(stem))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Resolve `name`, falling back to the first available family.
///
/// Returns `None` only when the resolver has no usable font at all.
pub fn resolve_with_fallback(fonts: &dyn FontResolver, name: &str) -> Option<Arc<dyn Typeface>> {
    if let Some(face) = fonts.resolve(name) {
        return Some(face);
    }

    let fallback = fonts
        .list_available()
        .into_iter()
        .find_map(|candidate| fonts.resolve(&candidate))?;

    warn!(
        requested = %name,
        fallback = %fallback.name(),
        "Font not available, falling back"
    );
    Some(fallback)
}
