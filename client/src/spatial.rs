use plotmap_shared::Cell;

use crate::error::TransformError;
use crate::options::{MapOptions, sanitize_hit_extent};
use crate::transform::{ScreenPoint, iso_to_screen, screen_to_iso, tile_size};
use crate::viewport::ViewportState;

/// Whether `point` falls inside the clickable diamond of `cell`.
///
/// The diamond is `|dx / half_w| + |dy / half_h| <= 1` around the cell's
/// screen centre, with half extents `hit_extent * tile size`. `hit_extent` is
/// clamped into (0, 1]; unusable values fall back to the default. Must be
/// given the same viewport that produced `cell`.
pub fn hit_test(
    point: ScreenPoint,
    cell: Cell,
    view: &ViewportState,
    hit_extent: f64,
) -> Result<bool, TransformError> {
    let centre = iso_to_screen(cell, view)?;
    let (tile_w, tile_h) = tile_size(view.scale);
    let hit_extent = sanitize_hit_extent(hit_extent);
    let half_w = tile_w * hit_extent;
    let half_h = tile_h * hit_extent;

    let dx = (point.x - centre.x) / half_w;
    let dy = (point.y - centre.y) / half_h;
    Ok(dx.abs() + dy.abs() <= 1.0)
}

/// Resolve a screen point to the cell whose diamond contains it.
///
/// `None` for points in the gaps between diamonds and for cells outside the
/// configured grid bounds.
pub fn pick_cell(
    point: ScreenPoint,
    view: &ViewportState,
    options: &MapOptions,
) -> Result<Option<Cell>, TransformError> {
    let candidate = screen_to_iso(point.x, point.y, view)?;
    if let Some(grid) = options.grid_bounds
        && !grid.contains(candidate)
    {
        return Ok(None);
    }
    if !hit_test(point, candidate, view, options.hit_extent())? {
        return Ok(None);
    }
    Ok(Some(candidate))
}

#[cfg(test)]
mod tests {
    use plotmap_shared::Cell;

    use super::{hit_test, pick_cell};
    use crate::options::MapOptions;
    use crate::transform::ScreenPoint;
    use crate::viewport::ViewportState;

    fn view() -> ViewportState {
        ViewportState {
            offset: ScreenPoint::new(-40.0, 25.0),
            scale: 1.0,
            canvas_width: 800.0,
            canvas_height: 600.0,
        }
    }

    fn at(cell: Cell, dx: f64, dy: f64) -> ScreenPoint {
        let centre = view().cell_to_screen(cell).expect("valid view");
        ScreenPoint::new(centre.x + dx, centre.y + dy)
    }

    #[test]
    fn centre_and_inner_points_hit() {
        let options = MapOptions::default();
        let cell = Cell::new(6, 4);
        assert_eq!(pick_cell(at(cell, 0.0, 0.0), &view(), &options), Ok(Some(cell)));
        assert_eq!(pick_cell(at(cell, 12.0, 0.0), &view(), &options), Ok(Some(cell)));
        assert_eq!(pick_cell(at(cell, 0.0, -7.0), &view(), &options), Ok(Some(cell)));
        assert_eq!(pick_cell(at(cell, -7.0, 3.5), &view(), &options), Ok(Some(cell)));
    }

    #[test]
    fn dead_zone_between_diamonds_is_no_cell() {
        let options = MapOptions::default();
        let cell = Cell::new(6, 4);
        // |14/15| + |5/7.5| > 1 while still rounding to the same candidate.
        let point = at(cell, 14.0, 5.0);
        assert_eq!(view().screen_to_cell(point.x, point.y), Ok(cell));
        assert_eq!(hit_test(point, cell, &view(), 0.5), Ok(false));
        assert_eq!(pick_cell(point, &view(), &options), Ok(None));
    }

    #[test]
    fn full_extent_diamonds_leave_no_gaps() {
        let options = MapOptions {
            hit_extent: 1.0,
            grid_bounds: None,
            ..MapOptions::default()
        };
        for ix in 0..40 {
            for iy in 0..40 {
                let point = ScreenPoint::new(300.0 + ix as f64 * 3.7, 150.0 + iy as f64 * 2.9);
                let picked = pick_cell(point, &view(), &options).expect("valid view");
                assert!(picked.is_some(), "no cell at {point:?}");
            }
        }
    }

    #[test]
    fn degenerate_hit_extents_fall_back_to_the_default() {
        let cell = Cell::new(6, 4);
        for extent in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            assert_eq!(hit_test(at(cell, 0.0, 0.0), cell, &view(), extent), Ok(true));
            assert_eq!(hit_test(at(cell, 14.0, 5.0), cell, &view(), extent), Ok(false));
        }
        // Oversized extents are capped at full diamonds.
        assert_eq!(hit_test(at(cell, 14.0, 0.0), cell, &view(), 5.0), Ok(true));
        assert_eq!(hit_test(at(cell, 31.0, 0.0), cell, &view(), 5.0), Ok(false));
    }

    #[test]
    fn cells_outside_grid_bounds_are_not_picked() {
        let options = MapOptions::default();
        let cell = Cell::new(-1, 3);
        assert_eq!(pick_cell(at(cell, 0.0, 0.0), &view(), &options), Ok(None));

        let unbounded = MapOptions {
            grid_bounds: None,
            ..MapOptions::default()
        };
        assert_eq!(pick_cell(at(cell, 0.0, 0.0), &view(), &unbounded), Ok(Some(cell)));
    }
}
