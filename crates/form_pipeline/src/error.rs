//! Error types for the form pipeline
//!
//! Every failure here is local to one image or one store access; callers
//! report it and carry on.

use std::path::PathBuf;
use thiserror::Error;

/// Raised when a source image cannot be turned into a binary image
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("could not decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("could not read image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raised when the OCR engine cannot process an image
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("tesseract is not available ({0})")]
    EngineUnavailable(String),

    #[error("tesseract failed: {0}")]
    Failed(String),

    #[error("failed to encode image for tesseract: {0}")]
    Encode(#[from] image::ImageError),

    #[error("tesseract I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised by the record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store not found at {}", path.display())]
    Missing { path: PathBuf },

    #[error("could not read record store {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("could not write record store {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("record store {} has no worksheet", path.display())]
    Malformed { path: PathBuf },

    #[error("record store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
