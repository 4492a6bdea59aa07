//! Direct-evaluation reference kernel.

use crate::candidate::peak::{keep_best, Peak};
use crate::kernel::{placement_range, zncc_window, Kernel, ScanParams};
use crate::template::TemplatePlan;
use crate::util::SymMatchResult;
use crate::ImageView;

/// Scalar ZNCC kernel that evaluates every window directly.
///
/// Costs O(W·H·w·h); [`ZnccFft`](crate::kernel::fft::ZnccFft) computes the
/// same peak faster on page-sized images.
pub struct ZnccScalar;

impl Kernel for ZnccScalar {
    type Plan = TemplatePlan;

    fn score_at(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f64,
    ) -> f32 {
        match placement_range(image.width(), image.height(), tpl) {
            Ok((max_x, max_y)) if x <= max_x && y <= max_y => {
                zncc_window(image, tpl, x, y, min_var_i).unwrap_or(f32::NEG_INFINITY)
            }
            _ => f32::NEG_INFINITY,
        }
    }

    fn best_match(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        params: ScanParams,
    ) -> SymMatchResult<Option<Peak>> {
        let (max_x, max_y) = placement_range(image.width(), image.height(), tpl)?;
        if tpl.is_flat() {
            return Ok(None);
        }

        let mut best = None;
        for y in 0..=max_y {
            for x in 0..=max_x {
                let Some(score) = zncc_window(image, tpl, x, y, params.min_var_i) else {
                    continue;
                };
                if score >= params.min_score {
                    keep_best(&mut best, Peak { x, y, score });
                }
            }
        }
        Ok(best)
    }
}
