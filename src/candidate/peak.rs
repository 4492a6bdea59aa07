//! Best-alignment peak selection.

use std::cmp::Ordering;

/// Placement of a template inside a candidate image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// X coordinate (column) of the template's top-left corner.
    pub x: usize,
    /// Y coordinate (row) of the template's top-left corner.
    pub y: usize,
    /// ZNCC score at this placement.
    pub score: f32,
}

/// Orders peaks by descending score; ties go to the earlier placement in
/// row-major order, so the best peak does not depend on scan order.
pub(crate) fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Keeps the better of `best` and `peak`.
pub(crate) fn keep_best(best: &mut Option<Peak>, peak: Peak) {
    match best {
        Some(current) if peak_cmp_desc(&peak, current) != Ordering::Less => {}
        _ => *best = Some(peak),
    }
}
