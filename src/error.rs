//! Error types for artifact-eval operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for artifact-eval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during distortion analysis.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Image dimensions don't match between reference and distorted inputs.
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// Expected dimensions (width, height).
        expected: (usize, usize),
        /// Actual dimensions (width, height).
        actual: (usize, usize),
    },

    /// An input image or field has zero pixels.
    #[error("Empty input: {0}")]
    EmptyImage(String),

    /// Wrong number of channel planes supplied.
    #[error("Channel mismatch: expected {expected}, got {actual}")]
    ChannelMismatch {
        /// Expected channel count (or upper bound).
        expected: usize,
        /// Channel count actually supplied.
        actual: usize,
    },

    /// A configuration value is out of its valid range.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Failed to load an image file.
    #[error("Image load failed: {path}: {reason}")]
    ImageLoad {
        /// Path to the image that failed to load.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Error from an image decoder or encoder.
    #[error("Codec error ({codec}): {message}")]
    Codec {
        /// Codec identifier.
        codec: String,
        /// Error message from the codec.
        message: String,
    },

    /// Reference / distorted directory pairing failed.
    #[error("Pairing error: {0}")]
    Pairing(String),

    /// Unsupported image format.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
