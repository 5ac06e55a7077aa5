//! Screen <-> grid mapping under a 2:1 isometric projection.
//!
//! The grid origin sits at `(canvas_width / 2, canvas_height / 4)` plus the
//! viewport offset. Moving one cell along `x` shifts the screen position by
//! `(+30, +15) * scale`, one cell along `y` by `(-30, +15) * scale`.

use plotmap_shared::Cell;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::viewport::{ViewportState, validate_scale};

pub const TILE_HALF_WIDTH_UNIT: f64 = 30.0;
pub const TILE_HALF_HEIGHT_UNIT: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Unrounded grid position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoPoint {
    pub x: f64,
    pub y: f64,
}

impl IsoPoint {
    /// Nearest cell. Ties round away from zero.
    pub fn round(self) -> Cell {
        Cell::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// On-screen `(tile_w, tile_h)` at `scale`: the screen shift per unit step.
pub fn tile_size(scale: f64) -> (f64, f64) {
    (TILE_HALF_WIDTH_UNIT * scale, TILE_HALF_HEIGHT_UNIT * scale)
}

fn grid_origin(view: &ViewportState) -> ScreenPoint {
    ScreenPoint::new(
        view.offset.x + view.canvas_width / 2.0,
        view.offset.y + view.canvas_height / 4.0,
    )
}

/// Screen position of the centre of `cell`.
pub fn iso_to_screen(cell: Cell, view: &ViewportState) -> Result<ScreenPoint, TransformError> {
    view.validate()?;
    let (tile_w, tile_h) = tile_size(view.scale);
    let origin = grid_origin(view);
    let x = f64::from(cell.x);
    let y = f64::from(cell.y);
    Ok(ScreenPoint::new(
        (x - y) * tile_w + origin.x,
        (x + y) * tile_h + origin.y,
    ))
}

/// Grid position under a screen point, without rounding.
pub fn screen_to_iso_exact(
    screen_x: f64,
    screen_y: f64,
    view: &ViewportState,
) -> Result<IsoPoint, TransformError> {
    view.validate()?;
    let (tile_w, tile_h) = tile_size(view.scale);
    let origin = grid_origin(view);
    let x = (screen_x - origin.x) / tile_w;
    let y = (screen_y - origin.y) / tile_h;
    Ok(IsoPoint {
        x: (x + y) / 2.0,
        y: (y - x) / 2.0,
    })
}

/// Nearest cell under a screen point. The result is only a candidate near
/// diamond edges; [`crate::spatial::hit_test`] settles it.
pub fn screen_to_iso(
    screen_x: f64,
    screen_y: f64,
    view: &ViewportState,
) -> Result<Cell, TransformError> {
    screen_to_iso_exact(screen_x, screen_y, view).map(IsoPoint::round)
}

/// Offset that keeps the grid point under `pivot` fixed when switching the
/// view to `new_scale`.
pub fn calculate_zoom(
    pivot: ScreenPoint,
    view: &ViewportState,
    new_scale: f64,
) -> Result<ScreenPoint, TransformError> {
    view.validate()?;
    validate_scale(new_scale)?;
    let ratio = new_scale / view.scale;
    let half_w = view.canvas_width / 2.0;
    let quarter_h = view.canvas_height / 4.0;

    Ok(ScreenPoint::new(
        pivot.x - half_w - (pivot.x - view.offset.x - half_w) * ratio,
        pivot.y - quarter_h - (pivot.y - view.offset.y - quarter_h) * ratio,
    ))
}

/// Next allowed level strictly above (`zoom_in`) or below the current scale.
/// Returns `current` unchanged when there is none.
pub fn next_zoom_level(current: f64, zoom_in: bool, allowed_levels: &[f64]) -> f64 {
    let candidates = allowed_levels.iter().copied().filter(|level| level.is_finite());
    let next = if zoom_in {
        candidates
            .filter(|&level| level > current)
            .min_by(f64::total_cmp)
    } else {
        candidates
            .filter(|&level| level < current)
            .max_by(f64::total_cmp)
    };
    next.unwrap_or(current)
}
