//! Multi-template scanning of PDF documents.
//!
//! [`MatchScanner`] walks documents → pages → embedded images → templates and
//! records every best-alignment score strictly above the threshold. Document
//! and image failures are contained: an unopenable document still gets an
//! entry (carrying its error), and images that cannot be extracted or decoded
//! are skipped. Only template loading and configuration errors are fatal.

use crate::candidate::peak::Peak;
use crate::image::decode::decode_grayscale;
use crate::image::OwnedImage;
use crate::kernel::fft::CandidateSpectrum;
use crate::kernel::ScanParams;
use crate::pdf::file::FileSource;
use crate::pdf::{DocumentSource, PdfDocument};
use crate::template::{load_templates, TemplatePlan, TemplateSet, DEFAULT_MAX_TEMPLATES};
use crate::trace::{trace_debug, trace_event, trace_span, trace_warn};
use crate::util::{SymMatchError, SymMatchResult};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

pub mod finder;

/// Default similarity threshold (exclusive).
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// Scan configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanConfig {
    /// Minimum score, exclusive, for a match to be recorded. Must lie in `[0, 1]`.
    pub threshold: f32,
    /// Upper bound on the number of templates.
    pub max_templates: usize,
    /// Scan documents and kernel rows in parallel (requires the `rayon`
    /// feature; ignored otherwise).
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_templates: DEFAULT_MAX_TEMPLATES,
            parallel: false,
        }
    }
}

/// One template matching one embedded image.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchRecord {
    /// Document identifier as reported by the document source.
    pub document: String,
    /// 1-based page number.
    pub page: usize,
    /// 0-based index of the image within the page.
    pub image_index: usize,
    /// Index of the template in the template set.
    pub template_index: usize,
    pub template_name: String,
    /// Best-alignment ZNCC score.
    pub score: f32,
}

/// Scan outcome for one document.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentMatches {
    pub document: String,
    /// Embedded image references enumerated across all pages.
    pub images_seen: usize,
    /// Matches in discovery order: page, then image index, then template index.
    pub matches: Vec<MatchRecord>,
    /// Set when the document could not be opened.
    pub error: Option<SymMatchError>,
}

/// Per-document results, one entry per scanned document in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanResult {
    documents: Vec<DocumentMatches>,
}

impl ScanResult {
    /// Returns all document entries in input order.
    pub fn documents(&self) -> &[DocumentMatches] {
        &self.documents
    }

    /// Returns the first entry for `document`.
    pub fn get(&self, document: &str) -> Option<&DocumentMatches> {
        self.documents.iter().find(|entry| entry.document == document)
    }

    /// Returns the matches recorded for `document`.
    pub fn matches(&self, document: &str) -> Option<&[MatchRecord]> {
        self.get(document).map(|entry| entry.matches.as_slice())
    }

    /// Number of document entries.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if no document was scanned.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Total number of match records across documents.
    pub fn total_matches(&self) -> usize {
        self.documents.iter().map(|entry| entry.matches.len()).sum()
    }

    /// Consumes the result, returning the document entries.
    pub fn into_documents(self) -> Vec<DocumentMatches> {
        self.documents
    }
}

/// Matches a frozen template set against PDF documents.
pub struct MatchScanner {
    templates: TemplateSet,
    config: ScanConfig,
}

impl MatchScanner {
    /// Creates a scanner after validating the threshold and template count.
    pub fn new(templates: TemplateSet, config: ScanConfig) -> SymMatchResult<Self> {
        validate_threshold(config.threshold)?;
        if templates.is_empty() {
            return Err(SymMatchError::NoTemplates);
        }
        if templates.len() > config.max_templates {
            return Err(SymMatchError::TooManyTemplates {
                count: templates.len(),
                max: config.max_templates,
            });
        }
        Ok(Self { templates, config })
    }

    /// Loads templates from image files and creates a scanner.
    pub fn from_template_paths<P: AsRef<Path>>(
        paths: &[P],
        config: ScanConfig,
    ) -> SymMatchResult<Self> {
        validate_threshold(config.threshold)?;
        let templates = load_templates(paths, config.max_templates)?;
        Self::new(templates, config)
    }

    /// Returns the template set.
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Returns the scan configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scans PDF files on disk.
    pub fn scan_paths<P: AsRef<Path>>(&self, paths: &[P]) -> ScanResult {
        let handles: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        self.scan(&FileSource, &handles)
    }

    /// Scans every document, returning exactly one entry per input handle.
    pub fn scan<S>(&self, source: &S, documents: &[S::Handle]) -> ScanResult
    where
        S: DocumentSource + Sync,
        S::Handle: Sync,
    {
        let _span = trace_span!(
            "scan",
            documents = documents.len(),
            templates = self.templates.len()
        )
        .entered();

        let documents = if self.config.parallel {
            self.scan_parallel(source, documents)
        } else {
            documents
                .iter()
                .map(|handle| self.scan_document(source, handle))
                .collect()
        };
        ScanResult { documents }
    }

    #[cfg(feature = "rayon")]
    fn scan_parallel<S>(&self, source: &S, documents: &[S::Handle]) -> Vec<DocumentMatches>
    where
        S: DocumentSource + Sync,
        S::Handle: Sync,
    {
        use rayon::prelude::*;
        documents
            .par_iter()
            .map(|handle| self.scan_document(source, handle))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn scan_parallel<S>(&self, source: &S, documents: &[S::Handle]) -> Vec<DocumentMatches>
    where
        S: DocumentSource + Sync,
        S::Handle: Sync,
    {
        documents
            .iter()
            .map(|handle| self.scan_document(source, handle))
            .collect()
    }

    fn scan_document<S: DocumentSource>(&self, source: &S, handle: &S::Handle) -> DocumentMatches {
        let document = source.document_id(handle);
        let _span = trace_span!("scan_document", document = document.as_str()).entered();

        let doc = match source.open(handle) {
            Ok(doc) => doc,
            Err(err) => {
                let reason = err.to_string();
                trace_warn!(
                    "document_open_failed",
                    document = document.as_str(),
                    error = reason.as_str()
                );
                return DocumentMatches {
                    document,
                    images_seen: 0,
                    matches: Vec::new(),
                    error: Some(err),
                };
            }
        };

        let mut matches = Vec::new();
        let (images_seen, _) = walk_candidates(&doc, |page, image_index, candidate| {
            if !self.templates.iter().any(|tpl| fits(candidate, tpl.plan())) {
                trace_debug!(
                    "candidate_too_small",
                    page = page,
                    image = image_index,
                    width = candidate.width(),
                    height = candidate.height()
                );
                return ControlFlow::Continue(());
            }
            let spectrum = CandidateSpectrum::new(candidate.view(), self.config.parallel);
            for (template_index, tpl) in self.templates.iter().enumerate() {
                let Some(peak) = best_peak(&spectrum, tpl.plan()) else {
                    continue;
                };
                if peak.score > self.config.threshold {
                    matches.push(MatchRecord {
                        document: document.clone(),
                        page: page + 1,
                        image_index,
                        template_index,
                        template_name: tpl.name().to_owned(),
                        score: peak.score,
                    });
                }
            }
            ControlFlow::Continue(())
        });
        drop(doc);

        trace_event!(
            "document_scanned",
            document = document.as_str(),
            images = images_seen,
            matches = matches.len()
        );
        DocumentMatches {
            document,
            images_seen,
            matches,
            error: None,
        }
    }
}

/// Fails unless `threshold` is a finite value in `[0, 1]`.
pub(crate) fn validate_threshold(threshold: f32) -> SymMatchResult<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(SymMatchError::InvalidThreshold(threshold));
    }
    Ok(())
}

/// Visits every decodable embedded image of `doc` in page/image order.
///
/// Images that fail to extract or decode are skipped. Returns the number of
/// image references enumerated and whether the visitor stopped early.
pub(crate) fn walk_candidates<D, F>(doc: &D, mut visit: F) -> (usize, ControlFlow<()>)
where
    D: PdfDocument,
    F: FnMut(usize, usize, &OwnedImage) -> ControlFlow<()>,
{
    let mut images_seen = 0;
    for page in 0..doc.page_count() {
        let images = match doc.page_images(page) {
            Ok(images) => images,
            Err(err) => {
                let reason = err.to_string();
                trace_debug!("page_images_unreadable", page = page, error = reason.as_str());
                continue;
            }
        };
        images_seen += images.len();

        for (image_index, image) in images.iter().enumerate() {
            let Some(payload) = doc.extract_image(image) else {
                continue;
            };
            let candidate = match decode_grayscale(&payload) {
                Ok(candidate) => candidate,
                Err(err) => {
                    let reason = err.to_string();
                    trace_debug!(
                        "image_decode_skipped",
                        page = page,
                        image = image_index,
                        error = reason.as_str()
                    );
                    continue;
                }
            };
            if visit(page, image_index, &candidate).is_break() {
                return (images_seen, ControlFlow::Break(()));
            }
        }
    }
    (images_seen, ControlFlow::Continue(()))
}

/// Returns true if `plan` fits inside `candidate`.
pub(crate) fn fits(candidate: &OwnedImage, plan: &TemplatePlan) -> bool {
    plan.width() <= candidate.width() && plan.height() <= candidate.height()
}

/// Best-alignment peak of `plan` over a transformed candidate; `None` when
/// the template does not fit or no window can be normalized.
pub(crate) fn best_peak(spectrum: &CandidateSpectrum, plan: &TemplatePlan) -> Option<Peak> {
    match spectrum.best_match(plan, ScanParams::default()) {
        Ok(peak) => peak,
        Err(err) => {
            let reason = err.to_string();
            trace_debug!("template_pair_skipped", error = reason.as_str());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_threshold, MatchScanner, ScanConfig};
    use crate::template::{Template, TemplateSet};
    use crate::SymMatchError;

    fn one_template() -> TemplateSet {
        let tpl = Template::new("t", vec![0, 50, 100, 150], 2, 2).unwrap();
        TemplateSet::new(vec![tpl], 9).unwrap()
    }

    #[test]
    fn threshold_must_be_in_unit_range() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert_eq!(
            validate_threshold(1.5).unwrap_err(),
            SymMatchError::InvalidThreshold(1.5)
        );
        assert!(validate_threshold(f32::NAN).is_err());
        assert!(validate_threshold(-0.1).is_err());
    }

    #[test]
    fn scanner_rejects_empty_template_set() {
        let empty = TemplateSet::new(Vec::new(), 9).unwrap();
        let err = MatchScanner::new(empty, ScanConfig::default()).err().unwrap();
        assert_eq!(err, SymMatchError::NoTemplates);
    }

    #[test]
    fn scanner_enforces_its_own_cap() {
        let config = ScanConfig {
            max_templates: 0,
            ..ScanConfig::default()
        };
        let err = MatchScanner::new(one_template(), config).err().unwrap();
        assert_eq!(err, SymMatchError::TooManyTemplates { count: 1, max: 0 });
    }

    #[test]
    fn scanning_nothing_yields_empty_result() {
        let scanner = MatchScanner::new(one_template(), ScanConfig::default()).unwrap();
        let empty: [&str; 0] = [];
        let result = scanner.scan_paths(&empty);
        assert!(result.is_empty());
        assert_eq!(result.total_matches(), 0);
    }
}
