//! PDF collaborator interface.
//!
//! The scanner never talks to a PDF library directly. It opens documents
//! through a [`DocumentSource`] and walks pages and embedded images through
//! the resulting [`PdfDocument`]. Closing a document is dropping it, so every
//! exit path releases the handle.
//!
//! [`file::FileSource`] is the `lopdf`-backed implementation used for files on
//! disk.

use crate::util::{fs::list_files_with_extensions, SymMatchResult};
use std::path::{Path, PathBuf};

pub mod file;

/// Opens documents identified by a caller-chosen handle type.
pub trait DocumentSource {
    /// Handle naming one document (for files, its path).
    type Handle;
    /// Open document type; dropped to close it.
    type Document: PdfDocument;

    /// Opens the document, failing with `DocumentOpen`.
    fn open(&self, handle: &Self::Handle) -> SymMatchResult<Self::Document>;

    /// Returns the identifier reported in match records.
    fn document_id(&self, handle: &Self::Handle) -> String;
}

/// One opened document.
pub trait PdfDocument {
    /// Opaque reference to an embedded image object.
    type ImageRef;

    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Embedded raster images on page `page` (0-based), in library order.
    fn page_images(&self, page: usize) -> SymMatchResult<Vec<Self::ImageRef>>;

    /// Extracts the payload of one image, or `None` if it cannot be read.
    fn extract_image(&self, image: &Self::ImageRef) -> Option<EmbeddedImage>;
}

/// Payload of an embedded image as stored in the document.
#[derive(Clone, Debug, PartialEq)]
pub enum EmbeddedImage {
    /// A self-describing encoded stream (JPEG, JPEG 2000, PNG, ...).
    Encoded(Vec<u8>),
    /// Unencoded samples described by the image dictionary.
    Raw(RawImage),
}

/// Unencoded raster samples with the dictionary entries needed to read them.
#[derive(Clone, Debug, PartialEq)]
pub struct RawImage {
    pub width: usize,
    pub height: usize,
    /// Bits per color component: 1, 2, 4 or 8.
    pub bits_per_component: u8,
    pub color: RawColor,
    /// `Decode` array maps samples inversely (`[1 0]`).
    pub invert: bool,
    /// Row-major samples; each row is padded to a whole byte.
    pub samples: Vec<u8>,
}

/// Color spaces understood by the raw sample decoder.
#[derive(Clone, Debug, PartialEq)]
pub enum RawColor {
    Gray,
    Rgb,
    Cmyk,
    /// Palette lookup; `palette` holds 8-bit entries in the base space.
    Indexed {
        base: Box<RawColor>,
        palette: Vec<u8>,
    },
}

impl RawColor {
    /// Number of components per sample.
    pub fn components(&self) -> usize {
        match self {
            RawColor::Gray | RawColor::Indexed { .. } => 1,
            RawColor::Rgb => 3,
            RawColor::Cmyk => 4,
        }
    }
}

/// Lists the PDF files to scan for `path`.
///
/// A file path is returned as-is. A directory yields its `*.pdf` files
/// (case-insensitive, non-recursive) sorted by path.
pub fn collect_pdf_paths(path: &Path) -> SymMatchResult<Vec<PathBuf>> {
    if path.is_dir() {
        list_files_with_extensions(path, &["pdf"])
    } else {
        Ok(vec![path.to_path_buf()])
    }
}
