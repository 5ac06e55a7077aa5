use plotmap_shared::Cell;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::options::MapOptions;
use crate::transform::{
    ScreenPoint, TILE_HALF_HEIGHT_UNIT, TILE_HALF_WIDTH_UNIT, calculate_zoom, iso_to_screen,
    next_zoom_level, screen_to_iso,
};

/// A release closer than this to the press position counts as a click.
pub const CLICK_SLOP_PX: f64 = 5.0;

/// Pan/zoom state of the map plus the canvas it is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub offset: ScreenPoint,
    pub scale: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

pub(crate) fn validate_scale(scale: f64) -> Result<(), TransformError> {
    if !scale.is_finite() {
        return Err(TransformError::NonFiniteScale(scale));
    }
    if scale <= 0.0 {
        return Err(TransformError::NonPositiveScale(scale));
    }
    Ok(())
}

impl ViewportState {
    pub fn new(canvas_width: f64, canvas_height: f64, options: &MapOptions) -> Self {
        Self {
            offset: ScreenPoint::default(),
            scale: options.initial_scale,
            canvas_width,
            canvas_height,
        }
    }

    pub fn validate(&self) -> Result<(), TransformError> {
        validate_scale(self.scale)?;
        if !self.offset.x.is_finite() || !self.offset.y.is_finite() {
            return Err(TransformError::NonFiniteOffset {
                x: self.offset.x,
                y: self.offset.y,
            });
        }
        let canvas_ok = |v: f64| v.is_finite() && v > 0.0;
        if !canvas_ok(self.canvas_width) || !canvas_ok(self.canvas_height) {
            return Err(TransformError::InvalidCanvas {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        Ok(())
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.canvas_width / 2.0, self.canvas_height / 2.0)
    }

    pub fn cell_to_screen(&self, cell: Cell) -> Result<ScreenPoint, TransformError> {
        iso_to_screen(cell, self)
    }

    pub fn screen_to_cell(&self, sx: f64, sy: f64) -> Result<Cell, TransformError> {
        screen_to_iso(sx, sy, self)
    }

    /// Pan by a screen-space delta, scaled by the pan speed multiplier.
    pub fn pan(&mut self, dx: f64, dy: f64, multiplier: f64) {
        self.offset.x += dx * multiplier;
        self.offset.y += dy * multiplier;
    }

    /// Step to the neighbouring allowed zoom level, keeping the grid point
    /// under `pivot` in place. Returns whether the scale changed.
    pub fn zoom_step(
        &mut self,
        zoom_in: bool,
        pivot: ScreenPoint,
        allowed_levels: &[f64],
    ) -> Result<bool, TransformError> {
        let new_scale = next_zoom_level(self.scale, zoom_in, allowed_levels);
        if new_scale == self.scale {
            return Ok(false);
        }
        self.offset = calculate_zoom(pivot, self, new_scale)?;
        self.scale = new_scale;
        Ok(true)
    }

    /// Zoom buttons pivot on the middle of the canvas.
    pub fn zoom_at_center(
        &mut self,
        zoom_in: bool,
        allowed_levels: &[f64],
    ) -> Result<bool, TransformError> {
        let pivot = self.center();
        self.zoom_step(zoom_in, pivot, allowed_levels)
    }

    pub fn resize(&mut self, canvas_width: f64, canvas_height: f64) {
        self.canvas_width = canvas_width;
        self.canvas_height = canvas_height;
    }

    /// Move the view so that `cell` is drawn at the centre of the canvas.
    pub fn center_on(&mut self, cell: Cell) -> Result<(), TransformError> {
        self.validate()?;
        let x = f64::from(cell.x);
        let y = f64::from(cell.y);
        self.offset = ScreenPoint::new(
            -(x - y) * TILE_HALF_WIDTH_UNIT * self.scale,
            self.canvas_height / 4.0 - (x + y) * TILE_HALF_HEIGHT_UNIT * self.scale,
        );
        Ok(())
    }
}

/// Pointer bookkeeping for drag-to-pan that tells clicks apart from drags.
#[derive(Debug, Clone, Copy, Default)]
pub struct DragTracker {
    dragging: bool,
    start: ScreenPoint,
    last: ScreenPoint,
}

impl DragTracker {
    pub fn press(&mut self, at: ScreenPoint) {
        self.dragging = true;
        self.start = at;
        self.last = at;
    }

    /// Screen delta since the previous pointer position, if a drag is active.
    pub fn drag(&mut self, at: ScreenPoint) -> Option<(f64, f64)> {
        if !self.dragging {
            return None;
        }
        let delta = (at.x - self.last.x, at.y - self.last.y);
        self.last = at;
        Some(delta)
    }

    /// Ends the drag. Returns `true` when the pointer barely moved, i.e. the
    /// gesture should be handled as a click.
    pub fn release(&mut self, at: ScreenPoint) -> bool {
        let was_dragging = std::mem::take(&mut self.dragging);
        was_dragging
            && (at.x - self.start.x).abs() < CLICK_SLOP_PX
            && (at.y - self.start.y).abs() < CLICK_SLOP_PX
    }

    pub fn cancel(&mut self) {
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}

#[cfg(test)]
mod tests {
    use plotmap_shared::Cell;

    use super::{DragTracker, ViewportState};
    use crate::options::{DESKTOP_ZOOM_LEVELS, MapOptions};
    use crate::transform::{ScreenPoint, screen_to_iso_exact};

    #[test]
    fn new_viewport_uses_initial_scale() {
        let vp = ViewportState::new(800.0, 600.0, &MapOptions::mobile());
        assert_eq!(vp.scale, 1.6);
        assert_eq!(vp.offset, ScreenPoint::default());
        assert!(vp.validate().is_ok());
    }

    #[test]
    fn pan_applies_multiplier() {
        let mut vp = ViewportState::new(800.0, 600.0, &MapOptions::default());
        vp.pan(10.0, -4.0, 2.5);
        assert_eq!(vp.offset, ScreenPoint::new(25.0, -10.0));
    }

    #[test]
    fn zoom_step_saturates_and_anchors() {
        let mut vp = ViewportState::new(800.0, 600.0, &MapOptions::default());
        vp.pan(-120.0, 45.0, 1.0);
        let pivot = ScreenPoint::new(230.0, 410.0);
        let before = screen_to_iso_exact(pivot.x, pivot.y, &vp).expect("valid view");

        assert!(vp.zoom_step(true, pivot, &DESKTOP_ZOOM_LEVELS).expect("zoom"));
        assert_eq!(vp.scale, 0.8);
        let after = screen_to_iso_exact(pivot.x, pivot.y, &vp).expect("valid view");
        assert!((before.x - after.x).abs() < 1e-9 && (before.y - after.y).abs() < 1e-9);

        let offset = vp.offset;
        assert!(!vp.zoom_step(true, pivot, &DESKTOP_ZOOM_LEVELS).expect("zoom"));
        assert_eq!(vp.offset, offset);

        assert!(vp.zoom_at_center(false, &DESKTOP_ZOOM_LEVELS).expect("zoom"));
        assert!(vp.zoom_at_center(false, &DESKTOP_ZOOM_LEVELS).expect("zoom"));
        assert_eq!(vp.scale, 0.4);
        assert!(!vp.zoom_at_center(false, &DESKTOP_ZOOM_LEVELS).expect("zoom"));
    }

    #[test]
    fn center_on_places_cell_mid_canvas() {
        let mut vp = ViewportState::new(1024.0, 768.0, &MapOptions::default());
        vp.center_on(Cell::new(50, 50)).expect("valid view");
        let p = vp.cell_to_screen(Cell::new(50, 50)).expect("valid view");
        assert!((p.x - 512.0).abs() < 1e-9);
        assert!((p.y - 384.0).abs() < 1e-9);
        assert_eq!(vp.screen_to_cell(512.0, 384.0), Ok(Cell::new(50, 50)));
    }

    #[test]
    fn drag_tracker_separates_clicks_from_drags() {
        let mut drag = DragTracker::default();
        assert_eq!(drag.drag(ScreenPoint::new(1.0, 1.0)), None);

        drag.press(ScreenPoint::new(100.0, 100.0));
        assert_eq!(drag.drag(ScreenPoint::new(102.0, 99.0)), Some((2.0, -1.0)));
        assert!(drag.release(ScreenPoint::new(103.0, 101.0)));
        assert!(!drag.is_dragging());

        drag.press(ScreenPoint::new(100.0, 100.0));
        assert_eq!(drag.drag(ScreenPoint::new(140.0, 100.0)), Some((40.0, 0.0)));
        assert!(!drag.release(ScreenPoint::new(140.0, 100.0)));

        // A release without a press is never a click.
        assert!(!drag.release(ScreenPoint::new(140.0, 100.0)));
    }
}
