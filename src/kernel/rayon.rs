//! Rayon-parallel building blocks for the FFT kernel (feature-gated).
//!
//! Row transforms are independent and per-row winners are merged in row
//! order with the same deterministic tie-breaking, so parallel results are
//! bit-identical to the sequential ones.

use crate::candidate::peak::{keep_best, Peak};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::Fft;

/// Runs `fft` over every `len`-sized row of `data` in parallel.
pub(crate) fn process_rows_par(fft: &dyn Fft<f64>, data: &mut [Complex<f64>], len: usize) {
    data.par_chunks_mut(len).for_each(|row| fft.process(row));
}

/// Best peak over `rows` rows, each scored by `row_best`.
pub(crate) fn best_over_rows_par<F>(rows: usize, row_best: F) -> Option<Peak>
where
    F: Fn(usize) -> Option<Peak> + Sync + Send,
{
    let per_row: Vec<Option<Peak>> = (0..rows).into_par_iter().map(row_best).collect();
    let mut best = None;
    for peak in per_row.into_iter().flatten() {
        keep_best(&mut best, peak);
    }
    best
}
