use plotmap_shared::CellBounds;
use serde::Deserialize;

use crate::error::TransformError;

pub const CHUNK_SIZE: i32 = 20;
pub const DEFAULT_CHUNK_MARGIN: u32 = 1;
pub const DEFAULT_HIT_EXTENT: f64 = 0.5;
const SCALE_TOLERANCE: f64 = 1e-9;

pub const DESKTOP_ZOOM_LEVELS: [f64; 3] = [0.8, 0.6, 0.4];
pub const DESKTOP_INITIAL_SCALE: f64 = 0.6;

// Mobile levels are twice the desktop ones.
pub const MOBILE_ZOOM_LEVELS: [f64; 3] = [1.6, 1.2, 0.8];
pub const MOBILE_INITIAL_SCALE: f64 = 1.6;
pub const MOBILE_PAN_SPEED_MULTIPLIER: f64 = 2.5;

/// Knobs shared by the bounds calculator, chunk cache and hit tester.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Cells outside these bounds are never fetched or picked. `None` = unbounded.
    pub grid_bounds: Option<CellBounds>,
    /// Extra chunks loaded on every side of the visible ones so that panning
    /// reveals data that is already there.
    pub chunk_margin: u32,
    pub allowed_zoom_levels: Vec<f64>,
    pub initial_scale: f64,
    pub pan_speed_multiplier: f64,
    /// Side length of a chunk in cells. Also the span of one fetch.
    pub chunk_size: i32,
    /// Size of the clickable diamond relative to the lattice pitch, in (0, 1].
    /// At 1.0 neighbouring diamonds touch; below that the gaps are dead zones.
    pub hit_extent: f64,
    /// Keep fetched payloads of chunks that scrolled out of view.
    pub retain_evicted_payloads: bool,
    /// Upper bound on cached payloads; untracked oldest entries go first.
    pub max_cached_chunks: Option<usize>,
}

impl MapOptions {
    pub fn desktop() -> Self {
        Self {
            grid_bounds: Some(CellBounds::non_negative()),
            chunk_margin: DEFAULT_CHUNK_MARGIN,
            allowed_zoom_levels: DESKTOP_ZOOM_LEVELS.to_vec(),
            initial_scale: DESKTOP_INITIAL_SCALE,
            pan_speed_multiplier: 1.0,
            chunk_size: CHUNK_SIZE,
            hit_extent: DEFAULT_HIT_EXTENT,
            retain_evicted_payloads: true,
            max_cached_chunks: None,
        }
    }

    pub fn mobile() -> Self {
        Self {
            allowed_zoom_levels: MOBILE_ZOOM_LEVELS.to_vec(),
            initial_scale: MOBILE_INITIAL_SCALE,
            pan_speed_multiplier: MOBILE_PAN_SPEED_MULTIPLIER,
            ..Self::desktop()
        }
    }

    /// Chunk size clamped to at least one cell.
    pub(crate) fn chunk_size(&self) -> i32 {
        self.chunk_size.max(1)
    }

    pub(crate) fn hit_extent(&self) -> f64 {
        sanitize_hit_extent(self.hit_extent)
    }

    /// Smallest configured zoom level. `None` when no usable level is set.
    pub fn min_scale(&self) -> Option<f64> {
        self.allowed_zoom_levels
            .iter()
            .copied()
            .filter(|level| level.is_finite() && *level > 0.0)
            .min_by(f64::total_cmp)
    }

    /// Rejects views zoomed out past the smallest allowed level; the visible
    /// chunk count grows with the inverse square of the scale.
    pub(crate) fn check_scale(&self, scale: f64) -> Result<(), TransformError> {
        match self.min_scale() {
            Some(min) if scale < min - SCALE_TOLERANCE => {
                Err(TransformError::ScaleBelowMinimum { scale, min })
            }
            _ => Ok(()),
        }
    }
}

/// Clamp a hit extent into (0, 1], falling back to the default for
/// non-finite or non-positive values.
pub(crate) fn sanitize_hit_extent(hit_extent: f64) -> f64 {
    if hit_extent.is_finite() && hit_extent > 0.0 {
        hit_extent.min(1.0)
    } else {
        DEFAULT_HIT_EXTENT
    }
}

impl Default for MapOptions {
    fn default() -> Self {
        Self::desktop()
    }
}
