//! FFT-accelerated ZNCC (J. P. Lewis, "Fast Normalized Cross-Correlation").
//!
//! The template/image cross term of every placement comes from one product in
//! the frequency domain and the window statistics come from summed-area
//! tables, so a full scan costs O(W·H·log(W·H)) instead of O(W·H·w·h).
//! A [`CandidateSpectrum`] is computed once per image and reused for every
//! template matched against it.
//!
//! Transforms use the image size itself: for placements that keep the
//! template inside the image the circular correlation never wraps.

use crate::candidate::peak::{keep_best, Peak};
use crate::kernel::integral::IntegralImage;
use crate::kernel::scalar::ZnccScalar;
use crate::kernel::{normalized_score, placement_range, Kernel, ScanParams};
use crate::template::TemplatePlan;
use crate::util::SymMatchResult;
use crate::ImageView;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Row/column 2D transform over a `width x height` row-major buffer.
struct Fft2d {
    width: usize,
    height: usize,
    rows: Arc<dyn Fft<f64>>,
    cols: Arc<dyn Fft<f64>>,
    rows_inv: Arc<dyn Fft<f64>>,
    cols_inv: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            width,
            height,
            rows: planner.plan_fft_forward(width),
            cols: planner.plan_fft_forward(height),
            rows_inv: planner.plan_fft_inverse(width),
            cols_inv: planner.plan_fft_inverse(height),
        }
    }

    fn forward(&self, data: &mut [Complex<f64>], parallel: bool) {
        self.run(data, self.rows.as_ref(), self.cols.as_ref(), parallel);
    }

    /// Unnormalized inverse; callers divide by `width * height`.
    fn inverse(&self, data: &mut [Complex<f64>], parallel: bool) {
        self.run(data, self.rows_inv.as_ref(), self.cols_inv.as_ref(), parallel);
    }

    fn run(
        &self,
        data: &mut [Complex<f64>],
        rows: &dyn Fft<f64>,
        cols: &dyn Fft<f64>,
        parallel: bool,
    ) {
        process_rows(rows, data, self.width, parallel);
        let mut transposed = vec![Complex::default(); data.len()];
        transpose(data, &mut transposed, self.width, self.height);
        process_rows(cols, &mut transposed, self.height, parallel);
        transpose(&transposed, data, self.height, self.width);
    }
}

#[cfg(feature = "rayon")]
fn process_rows(fft: &dyn Fft<f64>, data: &mut [Complex<f64>], len: usize, parallel: bool) {
    if parallel {
        crate::kernel::rayon::process_rows_par(fft, data, len);
    } else {
        fft.process(data);
    }
}

#[cfg(not(feature = "rayon"))]
fn process_rows(fft: &dyn Fft<f64>, data: &mut [Complex<f64>], _len: usize, _parallel: bool) {
    fft.process(data);
}

#[cfg(feature = "rayon")]
fn best_over_rows<F>(rows: usize, row_best: F, parallel: bool) -> Option<Peak>
where
    F: Fn(usize) -> Option<Peak> + Sync + Send,
{
    if parallel {
        crate::kernel::rayon::best_over_rows_par(rows, row_best)
    } else {
        best_over_rows_seq(rows, row_best)
    }
}

#[cfg(not(feature = "rayon"))]
fn best_over_rows<F>(rows: usize, row_best: F, _parallel: bool) -> Option<Peak>
where
    F: Fn(usize) -> Option<Peak> + Sync + Send,
{
    best_over_rows_seq(rows, row_best)
}

fn best_over_rows_seq<F: Fn(usize) -> Option<Peak>>(rows: usize, row_best: F) -> Option<Peak> {
    let mut best = None;
    for peak in (0..rows).filter_map(row_best) {
        keep_best(&mut best, peak);
    }
    best
}

/// Writes the `width x height` matrix `src` transposed into `dst`.
fn transpose(src: &[Complex<f64>], dst: &mut [Complex<f64>], width: usize, height: usize) {
    for (y, row) in src.chunks_exact(width).enumerate().take(height) {
        for (x, &value) in row.iter().enumerate() {
            dst[x * height + y] = value;
        }
    }
}

/// Frequency-domain form of one candidate image plus its window statistics.
pub struct CandidateSpectrum {
    width: usize,
    height: usize,
    fft: Fft2d,
    spectrum: Vec<Complex<f64>>,
    integral: IntegralImage,
    parallel: bool,
}

impl CandidateSpectrum {
    /// Transforms `image`; `parallel` spreads row transforms and the peak
    /// search over the rayon pool when that feature is enabled.
    pub fn new(image: ImageView<'_, u8>, parallel: bool) -> Self {
        let width = image.width();
        let height = image.height();
        let integral = IntegralImage::new(image);

        // Centering the image keeps the spectrum's DC term small; the cross
        // term is unchanged because template samples sum to zero.
        let (total, _) = integral.window(0, 0, width, height);
        let mean = total as f64 / (width * height) as f64;
        let mut spectrum = Vec::with_capacity(width * height);
        for y in 0..height {
            if let Some(row) = image.row(y) {
                spectrum.extend(row.iter().map(|&v| Complex::new(v as f64 - mean, 0.0)));
            }
        }

        let fft = Fft2d::new(width, height);
        fft.forward(&mut spectrum, parallel);
        Self {
            width,
            height,
            fft,
            spectrum,
            integral,
            parallel,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Best placement of `plan` over this image.
    ///
    /// Fails with `TemplateTooLarge` when the template does not fit; returns
    /// `Ok(None)` for flat templates or when no window passes `params`.
    pub fn best_match(
        &self,
        plan: &TemplatePlan,
        params: ScanParams,
    ) -> SymMatchResult<Option<Peak>> {
        let (max_x, max_y) = placement_range(self.width, self.height, plan)?;
        if plan.is_flat() {
            return Ok(None);
        }

        let tpl_width = plan.width();
        let tpl_height = plan.height();
        let mut cross = vec![Complex::default(); self.width * self.height];
        for (ty, row) in plan.zero_mean().chunks_exact(tpl_width).enumerate() {
            let base = ty * self.width;
            for (slot, &t) in cross[base..base + tpl_width].iter_mut().zip(row) {
                *slot = Complex::new(t as f64, 0.0);
            }
        }
        self.fft.forward(&mut cross, self.parallel);
        for (c, &s) in cross.iter_mut().zip(&self.spectrum) {
            *c = c.conj() * s;
        }
        self.fft.inverse(&mut cross, self.parallel);

        let scale = 1.0 / (self.width * self.height) as f64;
        let count = (tpl_width * tpl_height) as u64;
        let var_t = plan.var_t();
        let row_best = |y: usize| {
            let mut best = None;
            let row = &cross[y * self.width..y * self.width + max_x + 1];
            for (x, c) in row.iter().enumerate() {
                let (sum, sum_sq) = self.integral.window(x, y, tpl_width, tpl_height);
                let Some(score) =
                    normalized_score(c.re * scale, var_t, count, sum, sum_sq, params.min_var_i)
                else {
                    continue;
                };
                if score >= params.min_score {
                    keep_best(&mut best, Peak { x, y, score });
                }
            }
            best
        };
        Ok(best_over_rows(max_y + 1, row_best, self.parallel))
    }
}

/// ZNCC kernel backed by [`CandidateSpectrum`].
pub struct ZnccFft;

impl Kernel for ZnccFft {
    type Plan = TemplatePlan;

    fn score_at(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f64,
    ) -> f32 {
        ZnccScalar::score_at(image, tpl, x, y, min_var_i)
    }

    fn best_match(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        params: ScanParams,
    ) -> SymMatchResult<Option<Peak>> {
        placement_range(image.width(), image.height(), tpl)?;
        CandidateSpectrum::new(image, false).best_match(tpl, params)
    }
}

#[cfg(test)]
mod tests {
    use super::{CandidateSpectrum, ZnccFft};
    use crate::kernel::scalar::ZnccScalar;
    use crate::kernel::{Kernel, ScanParams};
    use crate::template::TemplatePlan;
    use crate::{ImageView, SymMatchError};

    fn pattern(width: usize, height: usize, a: usize, b: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(((x * a + y * b + x * y * 3) % 251) as u8);
            }
        }
        data
    }

    #[test]
    fn fft_scan_matches_direct_scan() {
        let image = pattern(37, 29, 17, 9);
        let tpl = pattern(6, 5, 5, 11);
        let image_view = ImageView::from_slice(&image, 37, 29).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 6, 5).unwrap()).unwrap();

        let direct = ZnccScalar::best_match(image_view, &plan, ScanParams::default())
            .unwrap()
            .unwrap();
        let fast = ZnccFft::best_match(image_view, &plan, ScanParams::default())
            .unwrap()
            .unwrap();
        assert!((fast.score - direct.score).abs() < 1e-5);
        let at = ZnccScalar::score_at(image_view, &plan, fast.x, fast.y, 1e-8);
        assert!((at - direct.score).abs() < 1e-5);
    }

    #[test]
    fn exact_crop_is_found_at_its_offset() {
        let image = pattern(40, 33, 13, 7);
        let image_view = ImageView::from_slice(&image, 40, 33).unwrap();
        let crop = crate::OwnedImage::from_view(image_view.roi(21, 14, 9, 8).unwrap());
        let plan = TemplatePlan::from_view(crop.view()).unwrap();

        let spectrum = CandidateSpectrum::new(image_view, false);
        let peak = spectrum
            .best_match(&plan, ScanParams::default())
            .unwrap()
            .unwrap();
        assert_eq!((peak.x, peak.y), (21, 14));
        assert!((peak.score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn flat_template_and_flat_image_have_no_peak() {
        let image = pattern(16, 16, 3, 5);
        let image_view = ImageView::from_slice(&image, 16, 16).unwrap();
        let flat = TemplatePlan::from_view(ImageView::from_slice(&[255u8; 16], 4, 4).unwrap())
            .unwrap();
        assert!(ZnccFft::best_match(image_view, &flat, ScanParams::default())
            .unwrap()
            .is_none());

        let blank = vec![200u8; 64];
        let blank_view = ImageView::from_slice(&blank, 8, 8).unwrap();
        let tpl: Vec<u8> = (0u8..9).collect();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 3).unwrap()).unwrap();
        assert!(ZnccFft::best_match(blank_view, &plan, ScanParams::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn oversized_template_is_rejected() {
        let image = vec![0u8; 4 * 4];
        let tpl: Vec<u8> = (0u8..25).collect();
        let image_view = ImageView::from_slice(&image, 4, 4).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 5, 5).unwrap()).unwrap();

        let err = CandidateSpectrum::new(image_view, false)
            .best_match(&plan, ScanParams::default())
            .unwrap_err();
        assert!(matches!(err, SymMatchError::TemplateTooLarge { .. }));
    }
}
