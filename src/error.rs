use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a whole compression run
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("File not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to load PDF {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("Failed to save PDF {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF backend unavailable: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors confined to a single image; the run always continues past them
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Object is not an image stream")]
    NotAnImage,

    #[error("Image is missing a valid /{0}")]
    MissingDimension(&'static str),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Unsupported color space: {0}")]
    UnsupportedColorSpace(String),

    #[error("Unsupported bits per component: {0}")]
    UnsupportedBitDepth(i64),

    #[error("Image data truncated: expected {expected} bytes, got {actual}")]
    TruncatedData { expected: usize, actual: usize },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode JPEG: {0}")]
    Encode(String),

    #[error("Failed to replace image: {0}")]
    Replace(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid garbage level: {0} (expected 0-4)")]
    InvalidGarbageLevel(u8),
}
