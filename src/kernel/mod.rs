//! Correlation kernel implementations.
//!
//! Every kernel reports the best-alignment ZNCC score of a template slid over
//! all placements that keep it fully inside the image. This is the same
//! quantity as OpenCV's `TM_CCOEFF_NORMED` maximum.
//!
//! [`fft::ZnccFft`] is the kernel used for scanning. [`scalar::ZnccScalar`]
//! evaluates every window directly and serves as the reference.

use crate::candidate::peak::Peak;
use crate::template::TemplatePlan;
use crate::util::{SymMatchError, SymMatchResult};
use crate::ImageView;

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Minimum variance threshold for the image window; flatter windows are
    /// skipped because ZNCC is undefined on them.
    pub min_var_i: f64,
    /// Minimum score threshold (discard below this value).
    pub min_score: f32,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            min_var_i: 1e-8,
            min_score: f32::NEG_INFINITY,
        }
    }
}

/// Kernel trait for scoring and scan operations.
pub trait Kernel {
    type Plan;

    /// Computes the score at a single placement (top-left coordinates).
    ///
    /// Returns `f32::NEG_INFINITY` for placements outside the image or
    /// windows that are too flat to normalize.
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f64,
    ) -> f32;

    /// Scans the full valid placement range and returns the best peak.
    ///
    /// Fails with `TemplateTooLarge` when the template does not fit.
    fn best_match(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        params: ScanParams,
    ) -> SymMatchResult<Option<Peak>>;
}

/// Returns the last valid placement `(max_x, max_y)` or `TemplateTooLarge`.
pub(crate) fn placement_range(
    img_width: usize,
    img_height: usize,
    tpl: &TemplatePlan,
) -> SymMatchResult<(usize, usize)> {
    let tpl_width = tpl.width();
    let tpl_height = tpl.height();
    if img_width < tpl_width || img_height < tpl_height {
        return Err(SymMatchError::TemplateTooLarge {
            tpl_width,
            tpl_height,
            img_width,
            img_height,
        });
    }
    Ok((img_width - tpl_width, img_height - tpl_height))
}

/// Turns a window's cross term and integer intensity sums into a ZNCC score.
///
/// Returns `None` for windows at or below `min_var_i` and for flat templates.
#[inline]
pub(crate) fn normalized_score(
    dot: f64,
    var_t: f64,
    count: u64,
    sum_i: u64,
    sum_i2: u64,
    min_var_i: f64,
) -> Option<f32> {
    let n = count as u128;
    let numer = n * sum_i2 as u128 - (sum_i as u128) * (sum_i as u128);
    let var_i = numer as f64 / n as f64;
    if var_i <= min_var_i {
        return None;
    }
    let score = (dot / (var_t * var_i).sqrt()) as f32;
    score.is_finite().then(|| score.clamp(-1.0, 1.0))
}

/// ZNCC score of the window at `(x, y)`; the caller guarantees it fits.
///
/// Window sums are accumulated as integers so flat windows yield an exact
/// zero variance instead of rounding noise.
#[inline]
pub(crate) fn zncc_window(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    x: usize,
    y: usize,
    min_var_i: f64,
) -> Option<f32> {
    let tpl_width = tpl.width();
    let zero_mean = tpl.zero_mean();

    let mut dot = 0.0f64;
    let mut sum_i = 0u64;
    let mut sum_i2 = 0u64;
    for ty in 0..tpl.height() {
        let img_row = &image.row(y + ty)?[x..x + tpl_width];
        let tpl_row = &zero_mean[ty * tpl_width..(ty + 1) * tpl_width];
        for (&value, &t) in img_row.iter().zip(tpl_row) {
            let v = value as u64;
            dot += t as f64 * value as f64;
            sum_i += v;
            sum_i2 += v * v;
        }
    }

    let count = (tpl_width * tpl.height()) as u64;
    normalized_score(dot, tpl.var_t(), count, sum_i, sum_i2, min_var_i)
}

pub mod fft;
pub(crate) mod integral;
pub mod scalar;

#[cfg(feature = "rayon")]
pub(crate) mod rayon;
