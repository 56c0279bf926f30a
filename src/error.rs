//! Crate-wide error type.
//!
//! Most of these never reach the user: mask-data problems degrade the session
//! to "masks unavailable" and export preconditions make the export a no-op.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The mask service could not be reached or answered with a bad status.
    #[error("mask service request failed: {0}")]
    Request(String),
    /// The response body was not the expected JSON.
    #[error("mask service returned malformed data: {0}")]
    Decode(String),
    /// The service answered `null`: it found no masks in the image.
    #[error("mask service found no masks for this image")]
    NoMasks,
    /// Structurally valid JSON whose contents are inconsistent.
    #[error("invalid mask info: {0}")]
    InvalidMaskInfo(String),
    #[error("mask shape {mask_width}x{mask_height} does not match image {image_width}x{image_height}")]
    ShapeMismatch {
        mask_width: u32,
        mask_height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("no mask info file for '{0}'")]
    MissingMaskFile(PathBuf),
    #[error("no image loaded")]
    NoImage,
    #[error("no overlay to export")]
    NoOverlay,
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the export preconditions that make an export request a no-op.
    pub fn is_export_precondition(&self) -> bool {
        matches!(self, Error::NoImage | Error::NoOverlay)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
