//! Watermark error types.
//!
//! Defines errors that can occur while composing watermarks onto an image.

use std::fmt;

/// Errors that can occur during watermark processing.
#[derive(Debug, Clone)]
pub enum WatermarkError {
    /// Watermark picture bytes could not be decoded
    DecodeError(String),

    /// Failed to render the text watermark
    RenderError(String),

    /// Invalid configuration (missing font, no fonts installed, bad color)
    ConfigError(String),

    /// The watermark picture could not be fetched from the repository
    FetchError(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError(msg) => write!(f, "Failed to decode watermark image: {}", msg),
            Self::RenderError(msg) => write!(f, "Failed to render text watermark: {}", msg),
            Self::ConfigError(msg) => write!(f, "Watermark configuration error: {}", msg),
            Self::FetchError(msg) => write!(f, "Failed to fetch watermark picture: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatermarkError::DecodeError("invalid PNG".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to decode watermark image: invalid PNG"
        );

        let err = WatermarkError::RenderError("glyph overflow".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to render text watermark: glyph overflow"
        );

        let err = WatermarkError::ConfigError("no fonts available".to_string());
        assert_eq!(
            err.to_string(),
            "Watermark configuration error: no fonts available"
        );

        let err = WatermarkError::FetchError("repository offline".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to fetch watermark picture: repository offline"
        );
    }

    #[test]
    fn test_error_debug() {
        let err = WatermarkError::ConfigError("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("ConfigError"));
        assert!(debug_str.contains("test"));
    }
}
