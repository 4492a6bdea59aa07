//! Summed-area tables for constant-time window statistics.

use crate::ImageView;

/// Integer prefix sums of pixel values and squared values.
///
/// Tables are `(width + 1) x (height + 1)` with a zero first row and column,
/// so any window sum is four lookups.
pub(crate) struct IntegralImage {
    width: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralImage {
    pub(crate) fn new(image: ImageView<'_, u8>) -> Self {
        let stride = image.width() + 1;
        let len = stride * (image.height() + 1);
        let mut sum = vec![0u64; len];
        let mut sum_sq = vec![0u64; len];

        for y in 0..image.height() {
            let Some(row) = image.row(y) else {
                break;
            };
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for (x, &value) in row.iter().enumerate() {
                let v = value as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }

        Self {
            width: image.width(),
            sum,
            sum_sq,
        }
    }

    /// Sum and sum of squares over the `width x height` window at `(x, y)`.
    #[inline]
    pub(crate) fn window(&self, x: usize, y: usize, width: usize, height: usize) -> (u64, u64) {
        let stride = self.width + 1;
        let top_left = y * stride + x;
        let top_right = top_left + width;
        let bottom_left = (y + height) * stride + x;
        let bottom_right = bottom_left + width;
        let area = |table: &[u64]| {
            (table[bottom_right] + table[top_left]) - (table[top_right] + table[bottom_left])
        };
        (area(&self.sum), area(&self.sum_sq))
    }
}

#[cfg(test)]
mod tests {
    use super::IntegralImage;
    use crate::ImageView;

    #[test]
    fn window_sums_match_direct_sums() {
        let data: Vec<u8> = (0..35).map(|v| (v * 37 % 251) as u8).collect();
        let view = ImageView::from_slice(&data, 7, 5).unwrap();
        let integral = IntegralImage::new(view);

        for (x, y, w, h) in [(0, 0, 7, 5), (2, 1, 3, 3), (6, 4, 1, 1), (1, 0, 4, 5)] {
            let mut sum = 0u64;
            let mut sum_sq = 0u64;
            for row in 0..h {
                for &v in &view.row(y + row).unwrap()[x..x + w] {
                    sum += v as u64;
                    sum_sq += v as u64 * v as u64;
                }
            }
            assert_eq!(integral.window(x, y, w, h), (sum, sum_sq));
        }
    }
}
