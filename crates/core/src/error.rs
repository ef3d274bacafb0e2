//! Error types for slide layout conversion.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding, rendering, transpiling or editing.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read an input file, or to write an extracted asset.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The presentation container cannot be decoded at all.
    #[error("Decode error: {0}")]
    Decode(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// An embedded asset of a single shape could not be extracted.
    #[error("Asset error on slide {slide}, shape {shape}: {message}")]
    Asset {
        slide: usize,
        shape: usize,
        message: String,
    },

    /// Markup input is not parseable.
    #[error("Markup error at byte {offset}: {message}")]
    Markup { offset: usize, message: String },

    /// Layout IR (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a markup error at the given byte offset.
    pub fn markup(offset: usize, message: impl Into<String>) -> Self {
        Self::Markup {
            offset,
            message: message.into(),
        }
    }
}
