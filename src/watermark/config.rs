//! Watermark settings types.
//!
//! This module defines the per-store watermark configuration:
//! - Text watermark (text, font, color, rotation, layout)
//! - Picture watermark (picture id, layout)
//! - Eligibility switches (product/category/manufacturer pictures, minimum size)
//!
//! Settings are validated when saved and clamped again at render time, so a
//! bad value that slipped into the store never takes down unrelated requests.

use super::text_renderer::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// Default values
fn default_size_percent() -> i32 {
    50
}

fn default_opacity() -> f64 {
    0.5
}

fn default_watermark_text() -> String {
    "watermark text".to_string()
}

fn default_font_name() -> String {
    "Arial".to_string()
}

fn default_text_color() -> Color {
    Color::new(8, 3, 71)
}

fn default_apply_on_product_pictures() -> bool {
    true
}

fn default_min_dimension() -> i32 {
    150
}

/// Anchor on the target image where a watermark layer is stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl WatermarkPosition {
    /// All nine anchors in reading order.
    pub const ALL: [WatermarkPosition; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];
}

/// Layout shared by the text and picture watermark layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonSettings {
    /// Bounding box as a percentage of the target image (0-100)
    #[serde(default = "default_size_percent")]
    pub size_percent: i32,

    /// Anchors where the layer is stamped; empty means nothing is drawn
    #[serde(default)]
    pub positions: BTreeSet<WatermarkPosition>,

    /// Opacity from 0.0 (transparent) to 1.0 (opaque)
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            size_percent: default_size_percent(),
            positions: BTreeSet::new(),
            opacity: default_opacity(),
        }
    }
}

impl CommonSettings {
    /// Create a layout stamped at the given anchors.
    pub fn at(
        size_percent: i32,
        opacity: f64,
        positions: impl IntoIterator<Item = WatermarkPosition>,
    ) -> Self {
        Self {
            size_percent,
            positions: positions.into_iter().collect(),
            opacity,
        }
    }

    /// Validate ranges. Called on save; never clamps.
    pub fn validate(&self, layer: &str) -> Result<(), String> {
        if !(0..=100).contains(&self.size_percent) {
            return Err(format!(
                "{} watermark size must be between 0 and 100, got {}",
                layer, self.size_percent
            ));
        }

        // Check for NaN/Infinity and valid range
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(format!(
                "{} watermark opacity must be a finite value between 0.0 and 1.0, got {}",
                layer, self.opacity
            ));
        }

        Ok(())
    }

    /// Size percent clamped to `[0, 100]`.
    pub fn clamped_size_percent(&self) -> u32 {
        self.size_percent.clamp(0, 100) as u32
    }

    /// Opacity clamped to `[0, 1]`; non-finite values count as transparent.
    pub fn clamped_opacity(&self) -> f32 {
        if self.opacity.is_finite() {
            self.opacity.clamp(0.0, 1.0) as f32
        } else {
            0.0
        }
    }

    /// Bounding box for this layer on an image of the given size.
    pub fn bounding_box(&self, width: u32, height: u32) -> (u32, u32) {
        let factor = self.clamped_size_percent() as f64 / 100.0;
        (
            (width as f64 * factor) as u32,
            (height as f64 * factor) as u32,
        )
    }
}

/// Watermark settings for one store scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSettings {
    #[serde(default)]
    pub watermark_text_enable: bool,

    #[serde(default = "default_watermark_text")]
    pub watermark_text: String,

    /// Font family name, resolved through the font resolver
    #[serde(default = "default_font_name")]
    pub font_name: String,

    /// Text color as hex string (e.g. "#080347")
    #[serde(default = "default_text_color")]
    pub text_color: Color,

    /// Rotation in degrees; any integer, only its trigonometric value matters
    #[serde(default)]
    pub text_rotation_degrees: i32,

    #[serde(default)]
    pub text_layout: CommonSettings,

    #[serde(default)]
    pub watermark_picture_enable: bool,

    /// Repository id of the watermark picture (0 = unset)
    #[serde(default)]
    pub watermark_picture_id: i32,

    #[serde(default)]
    pub picture_layout: CommonSettings,

    #[serde(default = "default_apply_on_product_pictures")]
    pub apply_on_product_pictures: bool,

    #[serde(default)]
    pub apply_on_category_pictures: bool,

    #[serde(default)]
    pub apply_on_manufacturer_pictures: bool,

    #[serde(default = "default_min_dimension")]
    pub min_width_for_watermark: i32,

    #[serde(default = "default_min_dimension")]
    pub min_height_for_watermark: i32,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            watermark_text_enable: false,
            watermark_text: default_watermark_text(),
            font_name: default_font_name(),
            text_color: default_text_color(),
            text_rotation_degrees: 0,
            text_layout: CommonSettings::default(),
            watermark_picture_enable: false,
            watermark_picture_id: 0,
            picture_layout: CommonSettings::default(),
            apply_on_product_pictures: default_apply_on_product_pictures(),
            apply_on_category_pictures: false,
            apply_on_manufacturer_pictures: false,
            min_width_for_watermark: default_min_dimension(),
            min_height_for_watermark: default_min_dimension(),
        }
    }
}

impl WatermarkSettings {
    /// Validate the settings before they are saved.
    ///
    /// Font availability is checked separately against a font resolver.
    pub fn validate(&self) -> Result<(), String> {
        self.text_layout.validate("Text")?;
        self.picture_layout.validate("Picture")?;

        if self.min_width_for_watermark < 0 {
            return Err(format!(
                "Minimum image width for watermark cannot be negative, got {}",
                self.min_width_for_watermark
            ));
        }

        if self.min_height_for_watermark < 0 {
            return Err(format!(
                "Minimum image height for watermark cannot be negative, got {}",
                self.min_height_for_watermark
            ));
        }

        if self.watermark_picture_id < 0 {
            return Err(format!(
                "Watermark picture id cannot be negative, got {}",
                self.watermark_picture_id
            ));
        }

        Ok(())
    }

    /// Whether an image of this size is large enough to carry a watermark.
    ///
    /// Exceeding either minimum qualifies; a minimum of 0 always qualifies.
    pub fn is_large_enough(&self, width: u32, height: u32) -> bool {
        (height as i64) > self.min_height_for_watermark as i64
            || (width as i64) > self.min_width_for_watermark as i64
    }

    /// Whether any usage switch is enabled at all.
    pub fn applies_anywhere(&self) -> bool {
        self.apply_on_product_pictures
            || self.apply_on_category_pictures
            || self.apply_on_manufacturer_pictures
    }

    pub fn text_layer_active(&self) -> bool {
        self.watermark_text_enable
            && !self.watermark_text.is_empty()
            && !self.text_layout.positions.is_empty()
    }

    pub fn picture_layer_active(&self) -> bool {
        self.watermark_picture_enable
            && self.watermark_picture_id != 0
            && !self.picture_layout.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_position_deserialize() {
        let positions = [
            ("top-left", WatermarkPosition::TopLeft),
            ("top-center", WatermarkPosition::TopCenter),
            ("top-right", WatermarkPosition::TopRight),
            ("center-left", WatermarkPosition::CenterLeft),
            ("center", WatermarkPosition::Center),
            ("center-right", WatermarkPosition::CenterRight),
            ("bottom-left", WatermarkPosition::BottomLeft),
            ("bottom-center", WatermarkPosition::BottomCenter),
            ("bottom-right", WatermarkPosition::BottomRight),
        ];

        for (yaml_val, expected) in positions {
            let yaml = format!("\"{}\"", yaml_val);
            let pos: WatermarkPosition = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(pos, expected, "Failed for {}", yaml_val);
        }
    }

    #[test]
    fn test_defaults_match_install_values() {
        let settings = WatermarkSettings::default();
        assert!(!settings.watermark_text_enable);
        assert_eq!(settings.watermark_text, "watermark text");
        assert_eq!(settings.font_name, "Arial");
        assert_eq!(settings.text_color, Color::new(8, 3, 71));
        assert_eq!(settings.text_layout.size_percent, 50);
        assert_eq!(settings.text_layout.opacity, 0.5);
        assert!(settings.text_layout.positions.is_empty());
        assert!(settings.apply_on_product_pictures);
        assert!(!settings.apply_on_category_pictures);
        assert!(!settings.apply_on_manufacturer_pictures);
        assert_eq!(settings.min_width_for_watermark, 150);
        assert_eq!(settings.min_height_for_watermark, 150);
    }

    #[test]
    fn test_settings_deserialize() {
        let yaml = r##"
watermark_text_enable: true
watermark_text: "(c) Shop"
font_name: "DejaVu Sans"
text_color: "#FF0000"
text_rotation_degrees: -45
text_layout:
  size_percent: 30
  positions: [center, bottom-right, center]
  opacity: 0.7
watermark_picture_enable: true
watermark_picture_id: 17
picture_layout:
  size_percent: 20
  positions: [top-left]
min_width_for_watermark: 0
min_height_for_watermark: 0
"##;
        let settings: WatermarkSettings = serde_yaml::from_str(yaml).unwrap();

        assert!(settings.watermark_text_enable);
        assert_eq!(settings.text_color, Color::new(255, 0, 0));
        assert_eq!(settings.text_rotation_degrees, -45);
        // Duplicate anchors collapse
        assert_eq!(settings.text_layout.positions.len(), 2);
        assert_eq!(settings.picture_layout.opacity, 0.5); // default
        assert_eq!(settings.watermark_picture_id, 17);
        assert!(settings.apply_on_product_pictures); // default
    }

    #[test]
    fn test_validate_rejects_out_of_range_size() {
        let mut settings = WatermarkSettings::default();
        settings.text_layout.size_percent = 101;
        let err = settings.validate().unwrap_err();
        assert!(err.contains("Text watermark size"));

        let mut settings = WatermarkSettings::default();
        settings.picture_layout.size_percent = -1;
        let err = settings.validate().unwrap_err();
        assert!(err.contains("Picture watermark size"));
    }

    #[test]
    fn test_validate_rejects_bad_opacity() {
        let mut settings = WatermarkSettings::default();
        settings.text_layout.opacity = 1.5;
        assert!(settings.validate().is_err());

        settings.text_layout.opacity = f64::NAN;
        assert!(settings.validate().is_err());

        settings.text_layout.opacity = 1.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_minimums() {
        let mut settings = WatermarkSettings::default();
        settings.min_height_for_watermark = -5;
        assert!(settings.validate().unwrap_err().contains("height"));
    }

    #[test]
    fn test_clamping_at_render_time() {
        let layout = CommonSettings {
            size_percent: 250,
            positions: BTreeSet::new(),
            opacity: -3.0,
        };
        assert_eq!(layout.clamped_size_percent(), 100);
        assert_eq!(layout.clamped_opacity(), 0.0);

        let layout = CommonSettings {
            opacity: f64::INFINITY,
            ..CommonSettings::default()
        };
        assert_eq!(layout.clamped_opacity(), 0.0);
    }

    #[test]
    fn test_bounding_box_truncates() {
        let layout = CommonSettings::at(33, 1.0, []);
        // 101 * 0.33 = 33.33, 10 * 0.33 = 3.3
        assert_eq!(layout.bounding_box(101, 10), (33, 3));
    }

    #[test]
    fn test_is_large_enough_uses_either_dimension() {
        let settings = WatermarkSettings::default(); // 150 x 150
        assert!(!settings.is_large_enough(150, 150));
        assert!(!settings.is_large_enough(100, 120));
        assert!(settings.is_large_enough(151, 10));
        assert!(settings.is_large_enough(10, 151));

        let settings = WatermarkSettings {
            min_width_for_watermark: 0,
            min_height_for_watermark: 0,
            ..WatermarkSettings::default()
        };
        assert!(settings.is_large_enough(1, 1));
    }

    #[test]
    fn test_layer_activity() {
        let mut settings = WatermarkSettings::default();
        assert!(!settings.text_layer_active());

        settings.watermark_text_enable = true;
        assert!(!settings.text_layer_active()); // no positions

        settings.text_layout.positions.insert(WatermarkPosition::Center);
        assert!(settings.text_layer_active());

        settings.watermark_text.clear();
        assert!(!settings.text_layer_active());

        settings.watermark_picture_enable = true;
        settings.picture_layout.positions.insert(WatermarkPosition::TopLeft);
        assert!(!settings.picture_layer_active()); // picture id unset

        settings.watermark_picture_id = 3;
        assert!(settings.picture_layer_active());
    }
}
