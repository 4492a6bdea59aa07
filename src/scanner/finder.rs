//! Single-template search that stops at the first match.

use crate::kernel::fft::CandidateSpectrum;
use crate::pdf::file::LoadedPdf;
use crate::pdf::{DocumentSource, PdfDocument};
use crate::scanner::{best_peak, fits, validate_threshold, walk_candidates, MatchRecord};
use crate::template::Template;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::SymMatchResult;
use std::ops::ControlFlow;
use std::path::Path;

/// Looks for one symbol and returns as soon as any embedded image matches.
///
/// Unlike [`MatchScanner`](crate::MatchScanner), no further image, page or
/// document is examined once a score exceeds the threshold.
pub struct SymbolFinder {
    template: Template,
    threshold: f32,
    parallel: bool,
}

impl SymbolFinder {
    /// Creates a finder; `threshold` must be a finite value in `[0, 1]`.
    pub fn new(template: Template, threshold: f32) -> SymMatchResult<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            template,
            threshold,
            parallel: false,
        })
    }

    /// Enables row-parallel scoring (requires the `rayon` feature).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the template being searched for.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Returns the first match across `documents`, in order.
    ///
    /// Documents that fail to open are logged and skipped.
    pub fn first_match<S: DocumentSource>(
        &self,
        source: &S,
        documents: &[S::Handle],
    ) -> Option<MatchRecord> {
        let _span = trace_span!("find_symbol", template = self.template.name()).entered();
        documents.iter().find_map(|handle| {
            let document = source.document_id(handle);
            match source.open(handle) {
                Ok(doc) => self.first_match_in(&document, &doc),
                Err(err) => {
                    let reason = err.to_string();
                    trace_warn!(
                        "document_open_failed",
                        document = document.as_str(),
                        error = reason.as_str()
                    );
                    None
                }
            }
        })
    }

    /// Returns true if any of `documents` contains the symbol.
    pub fn contains<S: DocumentSource>(&self, source: &S, documents: &[S::Handle]) -> bool {
        self.first_match(source, documents).is_some()
    }

    /// Returns the first match within one opened document.
    pub fn first_match_in<D: PdfDocument>(&self, document: &str, doc: &D) -> Option<MatchRecord> {
        let mut found = None;
        let plan = self.template.plan();
        walk_candidates(doc, |page, image_index, candidate| {
            if !fits(candidate, plan) {
                return ControlFlow::Continue(());
            }
            let spectrum = CandidateSpectrum::new(candidate.view(), self.parallel);
            match best_peak(&spectrum, plan) {
                Some(peak) if peak.score > self.threshold => {
                    trace_event!(
                        "symbol_found",
                        page = page + 1,
                        image = image_index,
                        score = peak.score
                    );
                    found = Some(MatchRecord {
                        document: document.to_owned(),
                        page: page + 1,
                        image_index,
                        template_index: 0,
                        template_name: self.template.name().to_owned(),
                        score: peak.score,
                    });
                    ControlFlow::Break(())
                }
                _ => ControlFlow::Continue(()),
            }
        });
        found
    }
}

/// Checks one PDF for one symbol image.
///
/// Unlike [`SymbolFinder::first_match`], failures are returned: a template
/// that cannot be loaded yields `TemplateLoad` and a PDF that cannot be opened
/// yields `DocumentOpen`.
pub fn contains_symbol<P, T>(pdf_path: P, template_path: T, threshold: f32) -> SymMatchResult<bool>
where
    P: AsRef<Path>,
    T: AsRef<Path>,
{
    let finder = SymbolFinder::new(Template::load(template_path)?, threshold)?;
    let pdf_path = pdf_path.as_ref();
    let doc = LoadedPdf::open(pdf_path)?;
    Ok(finder
        .first_match_in(&pdf_path.display().to_string(), &doc)
        .is_some())
}
