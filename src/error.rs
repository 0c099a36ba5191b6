//! Structured error types for the Folio engine.
//!
//! Layout never fails: missing targets and degenerate geometry resolve to
//! unchanged or defaulted output. The variants here cover the places a host
//! can hand us something unusable: JSON page state, image sources and
//! undecodable bitmaps. The signature entry points catch these and fall back,
//! so only the `*_json` helpers surface them.

use thiserror::Error;

/// The unified error type returned by fallible Folio functions.
#[derive(Debug, Error)]
pub enum FolioError {
    /// JSON input failed to parse as pages, elements or a patch.
    #[error("Failed to parse page state: {source}{}", hint_suffix(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },
    /// An image source string could not be resolved to bytes.
    #[error("Image source error: {0}")]
    Source(String),
    /// Bitmap decoding or encoding failed.
    #[error("Image error: {0}")]
    Image(String),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the page/element schema. Check field names and the element `type` tag.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input; is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FolioError::Parse { source: e, hint }
    }
}

impl From<image::ImageError> for FolioError {
    fn from(e: image::ImageError) -> Self {
        FolioError::Image(e.to_string())
    }
}
