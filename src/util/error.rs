//! Error types for symmatch.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for symmatch operations.
pub type SymMatchResult<T> = std::result::Result<T, SymMatchError>;

/// Errors that can occur while loading templates or scanning documents.
///
/// Template and configuration errors are fatal to a scan. Document and image
/// errors are recoverable: the scanner records or skips them and moves on.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SymMatchError {
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Template does not fit inside the candidate image.
    #[error(
        "template {tpl_width}x{tpl_height} does not fit in image {img_width}x{img_height}"
    )]
    TemplateTooLarge {
        tpl_width: usize,
        tpl_height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// A template file could not be turned into a usable raster.
    #[error("failed to load template {}: {reason}", .path.display())]
    TemplateLoad { path: PathBuf, reason: String },
    /// More templates were supplied than the configured cap.
    #[error("too many templates: {count} given, at most {max} allowed")]
    TooManyTemplates { count: usize, max: usize },
    /// A scan was requested without any template.
    #[error("no templates to match against")]
    NoTemplates,
    /// Threshold is not a finite value in `[0, 1]`.
    #[error("threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),
    /// A PDF document could not be opened or parsed.
    #[error("failed to open document {document}: {reason}")]
    DocumentOpen { document: String, reason: String },
    /// Raw bytes of an embedded image could not be extracted.
    #[error("failed to extract image: {reason}")]
    ImageExtract { reason: String },
    /// Extracted bytes could not be decoded to a grayscale raster.
    #[error("failed to decode image: {reason}")]
    ImageDecode { reason: String },
    /// Filesystem access failed.
    #[error("i/o error on {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}
