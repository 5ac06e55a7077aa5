//! Per-frame query for the rendering shell: what to draw and where.

use plotmap_shared::{Cell, CellBounds, ChunkKey, EntityKind};

use crate::bounds::{chunks_for_bounds, visible_bounds};
use crate::chunks::{ChunkCache, MapEvents};
use crate::error::TransformError;
use crate::source::ChunkSource;
use crate::transform::{ScreenPoint, iso_to_screen, tile_size};
use crate::viewport::ViewportState;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameCell {
    pub cell: Cell,
    /// Centre of the cell's diamond.
    pub screen: ScreenPoint,
    pub kind: Option<EntityKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub bounds: CellBounds,
    pub chunks: Vec<ChunkKey>,
    pub cells: Vec<FrameCell>,
}

impl FramePlan {
    pub fn occupied(&self) -> impl Iterator<Item = &FrameCell> {
        self.cells.iter().filter(|c| c.kind.is_some())
    }
}

/// Cells whose diamond may touch the canvas, with whatever the cache holds
/// for them. Cells outside the grid bounds are left out.
pub fn plan_frame<S, E>(
    cache: &ChunkCache<S, E>,
    view: &ViewportState,
) -> Result<FramePlan, TransformError>
where
    S: ChunkSource + 'static,
    E: MapEvents + 'static,
{
    cache.options().check_scale(view.scale)?;
    let mut bounds = visible_bounds(view)?;
    let chunks = chunks_for_bounds(bounds, cache.options());
    if let Some(grid) = cache.options().grid_bounds {
        match bounds.intersection(&grid) {
            Some(clipped) => bounds = clipped,
            None => {
                return Ok(FramePlan {
                    bounds,
                    chunks,
                    cells: Vec::new(),
                });
            }
        }
    }

    let (tile_w, tile_h) = tile_size(view.scale);
    let on_canvas = |p: ScreenPoint| {
        p.x >= -tile_w
            && p.x <= view.canvas_width + tile_w
            && p.y >= -tile_h
            && p.y <= view.canvas_height + tile_h
    };

    let mut cells = Vec::new();
    for cell in bounds.cells() {
        let screen = iso_to_screen(cell, view)?;
        if on_canvas(screen) {
            cells.push(FrameCell {
                cell,
                screen,
                kind: cache.kind_at(cell),
            });
        }
    }

    Ok(FramePlan {
        bounds,
        chunks,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use futures::future::{self, FutureExt};
    use plotmap_shared::{Cell, ChunkKey, EntityId, EntityKind, MapInfo, MapRange, SiteEntity};

    use super::plan_frame;
    use crate::chunks::{ChunkCache, NoopEvents};
    use crate::options::MapOptions;
    use crate::source::{ChunkSource, FetchFuture};
    use crate::transform::ScreenPoint;
    use crate::viewport::ViewportState;

    struct OneMine;

    impl ChunkSource for OneMine {
        fn fetch(&self, _map_info: MapInfo) -> FetchFuture {
            future::ready(Ok(MapRange {
                mines: vec![SiteEntity {
                    id: EntityId::Number(1),
                    cell: Cell::new(3, 3),
                }],
                ..MapRange::default()
            }))
            .boxed_local()
        }
    }

    fn view() -> ViewportState {
        ViewportState {
            offset: ScreenPoint::new(0.0, 0.0),
            scale: 1.0,
            canvas_width: 640.0,
            canvas_height: 480.0,
        }
    }

    #[test]
    fn plan_lists_on_screen_cells_with_their_entities() {
        let cache = ChunkCache::new(OneMine, NoopEvents, MapOptions::default(), 1);
        let view = view();
        let keys = cache.visible_chunks(&view).expect("valid view");
        block_on(cache.reconcile(&keys));

        let plan = plan_frame(&cache, &view).expect("valid view");
        assert_eq!(plan.chunks, keys);
        assert!(plan.chunks.contains(&ChunkKey::new(0, 0)));
        assert!(plan.cells.iter().all(|c| c.cell.x >= 0 && c.cell.y >= 0));
        assert!(plan.cells.iter().all(|c| {
            c.screen.x >= -30.0 && c.screen.x <= 670.0 && c.screen.y >= -15.0 && c.screen.y <= 495.0
        }));

        let occupied: Vec<_> = plan.occupied().collect();
        assert_eq!(occupied.len(), 1);
        assert_eq!(occupied[0].cell, Cell::new(3, 3));
        assert_eq!(occupied[0].kind, Some(EntityKind::Mine));
        assert_eq!(occupied[0].screen, view.cell_to_screen(Cell::new(3, 3)).expect("valid view"));
    }

    #[test]
    fn view_outside_the_grid_has_no_cells() {
        let cache = ChunkCache::new(OneMine, NoopEvents, MapOptions::default(), 1);
        let mut view = view();
        view.center_on(Cell::new(-500, -500)).expect("valid view");
        let plan = plan_frame(&cache, &view).expect("valid view");
        assert!(plan.cells.is_empty());
        assert!(plan.chunks.is_empty());
    }
}
