//! Which part of the grid the viewport currently shows.

use plotmap_shared::{CellBounds, ChunkKey};

use crate::error::TransformError;
use crate::options::MapOptions;
use crate::transform::screen_to_iso_exact;
use crate::viewport::ViewportState;

/// Axis-aligned cell rectangle covering the whole canvas.
///
/// The canvas is a rotated rectangle in grid space, so bounding its four
/// corners over-approximates the visible area; floor/ceil keeps the
/// rectangle a superset of the rounded corner cells.
pub fn visible_bounds(view: &ViewportState) -> Result<CellBounds, TransformError> {
    let (w, h) = (view.canvas_width, view.canvas_height);
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for (sx, sy) in [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)] {
        let iso = screen_to_iso_exact(sx, sy, view)?;
        min_x = min_x.min(iso.x);
        max_x = max_x.max(iso.x);
        min_y = min_y.min(iso.y);
        max_y = max_y.max(iso.y);
    }

    Ok(CellBounds::new(
        min_x.floor() as i32,
        max_x.ceil() as i32,
        min_y.floor() as i32,
        max_y.ceil() as i32,
    ))
}

/// Chunk keys touching `bounds`, widened by `chunk_margin` chunks and clipped
/// to `grid_bounds`. Ordered by x, then y.
pub fn chunks_for_bounds(bounds: CellBounds, options: &MapOptions) -> Vec<ChunkKey> {
    let size = options.chunk_size();
    let margin = i32::try_from(options.chunk_margin).unwrap_or(i32::MAX);

    let mut min_cx = bounds.min_x.div_euclid(size).saturating_sub(margin);
    let mut max_cx = bounds.max_x.div_euclid(size).saturating_add(margin);
    let mut min_cy = bounds.min_y.div_euclid(size).saturating_sub(margin);
    let mut max_cy = bounds.max_y.div_euclid(size).saturating_add(margin);

    if let Some(grid) = options.grid_bounds {
        min_cx = min_cx.max(grid.min_x.div_euclid(size));
        max_cx = max_cx.min(grid.max_x.div_euclid(size));
        min_cy = min_cy.max(grid.min_y.div_euclid(size));
        max_cy = max_cy.min(grid.max_y.div_euclid(size));
    }

    if min_cx > max_cx || min_cy > max_cy {
        return Vec::new();
    }

    (min_cx..=max_cx)
        .flat_map(|x| (min_cy..=max_cy).map(move |y| ChunkKey::new(x, y)))
        .collect()
}

/// Chunk keys the viewport needs loaded right now. Views zoomed out past
/// the smallest allowed level are rejected.
pub fn visible_chunks(
    view: &ViewportState,
    options: &MapOptions,
) -> Result<Vec<ChunkKey>, TransformError> {
    options.check_scale(view.scale)?;
    visible_bounds(view).map(|bounds| chunks_for_bounds(bounds, options))
}
