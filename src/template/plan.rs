//! Template plan precomputation for ZNCC.

use crate::image::ImageView;
use crate::util::{SymMatchError, SymMatchResult};

/// Precomputed statistics and zero-mean buffer for template matching.
///
/// A template whose pixels are all equal has no variance to normalize by. Its
/// plan is still built, but it is flagged [`is_flat`](Self::is_flat) and the
/// kernels report no placement for it.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    zero_mean: Vec<f32>,
    var_t: f64,
    flat: bool,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> SymMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(SymMatchError::InvalidDimensions { width, height })?;

        let mut sum = 0u64;
        let mut sum_sq = 0u64;
        for y in 0..height {
            for &value in row_or_err(tpl, y)? {
                let v = value as u64;
                sum += v;
                sum_sq += v * v;
            }
        }
        let flat = count as u128 * sum_sq as u128 == sum as u128 * sum as u128;

        let mean = sum as f64 / count as f64;
        let mut zero_mean = Vec::with_capacity(count);
        let mut var_t = 0.0f64;
        for y in 0..height {
            for &value in row_or_err(tpl, y)? {
                let centered = value as f64 - mean;
                var_t += centered * centered;
                zero_mean.push(centered as f32);
            }
        }

        Ok(Self {
            width,
            height,
            zero_mean,
            var_t,
            flat,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn zero_mean(&self) -> &[f32] {
        &self.zero_mean
    }

    /// Returns the sum of squared zero-mean values.
    pub fn var_t(&self) -> f64 {
        self.var_t
    }

    /// Returns true when every template pixel has the same value.
    pub fn is_flat(&self) -> bool {
        self.flat
    }
}

fn row_or_err<'a>(tpl: ImageView<'a, u8>, y: usize) -> SymMatchResult<&'a [u8]> {
    tpl.row(y).ok_or_else(|| {
        let needed = (y + 1)
            .checked_mul(tpl.stride())
            .and_then(|v| v.checked_add(tpl.width()))
            .unwrap_or(usize::MAX);
        SymMatchError::BufferTooSmall {
            needed,
            got: tpl.as_slice().len(),
        }
    })
}
