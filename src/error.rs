//! Crate-wide error type.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are
//! surfaced to the caller unchanged; there is no retry or recovery at this
//! level.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the crate can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// An input path does not exist or could not be opened.
    #[error("input not found or unreadable: {path}")]
    NotFound {
        /// The offending path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Axis lengths or dimensionality disagree among the three inputs.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A gradient table contains non-numeric or ragged text.
    #[error("malformed gradient table: {0}")]
    Format(String),

    /// File does not start with a recognized NIfTI-1 magic.
    #[error("invalid NIfTI magic: {0:?}")]
    InvalidMagic([u8; 4]),

    /// NIfTI datatype code this crate cannot size.
    #[error("unsupported data type code: {0}")]
    UnsupportedDataType(i16),

    /// Header dimension fields are inconsistent or out of range.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Structurally valid file that the crate does not handle.
    #[error("invalid file format: {0}")]
    InvalidFileFormat(String),

    /// Gzip stream could not be decoded.
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
