//! symmatch finds reference symbols (hazard pictograms, stamps, logos) among
//! the raster images embedded in PDF documents.
//!
//! Embedded images are extracted with `lopdf`, decoded to grayscale and
//! compared against up to nine templates with translation-only ZNCC (the
//! normalized correlation OpenCV calls `TM_CCOEFF_NORMED`). Every score above
//! the threshold becomes a [`MatchRecord`]. Parallel scanning is available via
//! the `rayon` feature and instrumentation via the `tracing` feature.
//!
//! ```no_run
//! use symmatch::{MatchScanner, ScanConfig};
//!
//! let scanner = MatchScanner::from_template_paths(&["ex_mark.png"], ScanConfig::default())?;
//! let result = scanner.scan_paths(&["hydrogen_peroxide.pdf"]);
//! for entry in result.documents() {
//!     for m in &entry.matches {
//!         println!("{}: page {} image {} ({})", m.document, m.page, m.image_index, m.template_name);
//!     }
//! }
//! # Ok::<(), symmatch::SymMatchError>(())
//! ```

mod candidate;
pub mod image;
pub mod kernel;
pub mod pdf;
pub mod scanner;
pub mod template;
mod trace;
pub mod util;

pub use candidate::peak::Peak;
pub use crate::image::{ImageView, OwnedImage};
pub use kernel::{Kernel, ScanParams};
pub use pdf::file::{FileSource, LoadedPdf};
pub use pdf::{collect_pdf_paths, DocumentSource, EmbeddedImage, PdfDocument, RawColor, RawImage};
pub use scanner::finder::{contains_symbol, SymbolFinder};
pub use scanner::{
    DocumentMatches, MatchRecord, MatchScanner, ScanConfig, ScanResult, DEFAULT_THRESHOLD,
};
pub use template::{
    collect_template_paths, load_templates, Template, TemplatePlan, TemplateSet,
    DEFAULT_MAX_TEMPLATES,
};
pub use util::{SymMatchError, SymMatchResult};
