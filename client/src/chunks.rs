//! Viewport-driven chunk cache.
//!
//! Chunk lifecycle: unknown -> loading -> loaded -> (evicted) unknown. Fetched
//! payloads are kept separately from the live point store, so a chunk that
//! scrolls back into view is rebuilt without another request.
//!
//! Everything runs on one thread. State sits behind a `RefCell` that is
//! never held across an `.await` or while calling into [`MapEvents`].

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures::future::{self, FutureExt, LocalBoxFuture};
use plotmap_shared::{Cell, CellBounds, ChunkKey, Entity, EntityKind, MapInfo, MapRange};
use tracing::{debug, info, warn};

use crate::bounds::visible_chunks;
use crate::error::{FetchError, TransformError};
use crate::options::MapOptions;
use crate::source::ChunkSource;
use crate::spatial::pick_cell;
use crate::transform::ScreenPoint;
use crate::viewport::ViewportState;

/// Callbacks into the rendering shell.
pub trait MapEvents {
    /// Aggregate loading flag: `true` when the first load starts, `false`
    /// once no load is in flight.
    fn loading_changed(&self, _loading: bool) {}
    fn entity_clicked(&self, _cell: Cell, _entity: &Entity) {}
    fn empty_cell_clicked(&self, _cell: Cell) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl MapEvents for NoopEvents {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Loading,
    Loaded,
}

/// Validated payload of one chunk fetch.
#[derive(Debug, Clone)]
pub struct ChunkCacheEntry {
    pub payload: Rc<MapRange>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    Entity { cell: Cell, entity: Entity },
    Empty { cell: Cell },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenClick {
    Cell { cell: Cell, entity: Option<Entity> },
    /// The point is between diamonds or outside the grid.
    NoCell,
}

#[derive(Default)]
struct CacheState {
    loaded: HashSet<ChunkKey>,
    in_flight: HashSet<ChunkKey>,
    points: HashMap<Cell, Entity>,
    chunk_points: HashMap<ChunkKey, Vec<Cell>>,
    payloads: HashMap<ChunkKey, ChunkCacheEntry>,
}

impl CacheState {
    fn purge_points(&mut self, key: ChunkKey) -> usize {
        let Some(cells) = self.chunk_points.remove(&key) else {
            return 0;
        };
        for cell in &cells {
            self.points.remove(cell);
        }
        cells.len()
    }

    /// Replace the points of `key` with the entities of `payload` that lie
    /// inside both the chunk and the grid. Returns the number of points stored.
    fn materialize(
        &mut self,
        key: ChunkKey,
        payload: &MapRange,
        chunk_size: i32,
        grid: Option<CellBounds>,
    ) -> usize {
        self.purge_points(key);
        let bounds = key.cell_bounds(chunk_size);
        let mut cells = Vec::new();
        let mut outside = 0usize;

        for entity in payload.entities() {
            let cell = entity.cell();
            if !bounds.contains(cell) || grid.is_some_and(|grid| !grid.contains(cell)) {
                outside += 1;
                continue;
            }
            match self.points.get(&cell) {
                Some(existing) if existing.kind().precedence() >= entity.kind().precedence() => {
                    continue;
                }
                Some(_) => {}
                None => cells.push(cell),
            }
            self.points.insert(cell, entity);
        }

        if outside > 0 {
            debug!(
                chunk_x = key.x,
                chunk_y = key.y,
                outside,
                "dropped entities outside the requested chunk or the grid"
            );
        }
        let count = cells.len();
        self.chunk_points.insert(key, cells);
        count
    }

    fn evict(&mut self, key: ChunkKey, retain_payload: bool) {
        self.loaded.remove(&key);
        let purged = self.purge_points(key);
        if !retain_payload {
            self.payloads.remove(&key);
        }
        debug!(chunk_x = key.x, chunk_y = key.y, purged, "evicted chunk");
    }

    /// Drop the oldest payloads of untracked chunks until at most `max` remain.
    fn enforce_payload_cap(&mut self, max: Option<usize>) {
        let Some(max) = max else {
            return;
        };
        while self.payloads.len() > max {
            let oldest = self
                .payloads
                .iter()
                .filter(|(key, _)| !self.loaded.contains(*key) && !self.in_flight.contains(*key))
                .min_by_key(|(key, entry)| (entry.fetched_at, **key))
                .map(|(key, _)| *key);
            let Some(key) = oldest else {
                break;
            };
            self.payloads.remove(&key);
            debug!(chunk_x = key.x, chunk_y = key.y, "dropped cached payload");
        }
    }
}

struct Shared<S, E> {
    source: S,
    events: E,
    options: MapOptions,
    planet_id: i64,
    state: RefCell<CacheState>,
}

impl<S, E: MapEvents> Shared<S, E> {
    fn finish_load(&self, key: ChunkKey, result: Result<MapRange, FetchError>) {
        let chunk_size = self.options.chunk_size();
        let mut state = self.state.borrow_mut();
        state.in_flight.remove(&key);

        match result {
            Ok(payload) => {
                let entry = ChunkCacheEntry {
                    payload: Rc::new(payload),
                    fetched_at: Utc::now(),
                };
                let points =
                    state.materialize(key, &entry.payload, chunk_size, self.options.grid_bounds);
                state.payloads.insert(key, entry);
                state.loaded.insert(key);
                state.enforce_payload_cap(self.options.max_cached_chunks);
                info!(chunk_x = key.x, chunk_y = key.y, points, "chunk loaded");
            }
            Err(e) => {
                state.purge_points(key);
                warn!(chunk_x = key.x, chunk_y = key.y, error = %e, "failed to load chunk");
            }
        }

        let idle = state.in_flight.is_empty();
        drop(state);
        if idle {
            self.events.loading_changed(false);
        }
    }

    fn abandon_load(&self, key: ChunkKey) {
        let mut state = self.state.borrow_mut();
        if !state.in_flight.remove(&key) {
            return;
        }
        state.purge_points(key);
        debug!(chunk_x = key.x, chunk_y = key.y, "chunk load dropped before completion");
        let idle = state.in_flight.is_empty();
        drop(state);
        if idle {
            self.events.loading_changed(false);
        }
    }
}

/// Owned by an in-flight load future. If the future is dropped before the
/// fetch settles, the chunk leaves the in-flight set instead of wedging it.
struct LoadGuard<S, E: MapEvents> {
    shared: Option<Rc<Shared<S, E>>>,
    key: ChunkKey,
}

impl<S, E: MapEvents> LoadGuard<S, E> {
    fn finish(mut self, result: Result<MapRange, FetchError>) {
        if let Some(shared) = self.shared.take() {
            shared.finish_load(self.key, result);
        }
    }
}

impl<S, E: MapEvents> Drop for LoadGuard<S, E> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.abandon_load(self.key);
        }
    }
}

/// Network loads started by one reconcile or refetch pass.
///
/// Chunks are already marked loading when the pass is returned; the fetches
/// only progress while the pass is polled.
#[must_use = "chunk fetches only progress while the pass is polled"]
pub struct ReconcilePass {
    requested: Vec<ChunkKey>,
    loads: LocalBoxFuture<'static, ()>,
}

impl ReconcilePass {
    fn new(requested: Vec<ChunkKey>, loads: Vec<LocalBoxFuture<'static, ()>>) -> Self {
        Self {
            requested,
            loads: future::join_all(loads).map(|_| ()).boxed_local(),
        }
    }

    /// Chunks this pass issued a network request for.
    pub fn requested(&self) -> &[ChunkKey] {
        &self.requested
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }
}

impl Future for ReconcilePass {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.get_mut().loads.as_mut().poll(cx)
    }
}

/// Loads, caches and evicts chunks to follow the viewport, and answers
/// point lookups and clicks. Cloning yields another handle to the same cache.
pub struct ChunkCache<S, E = NoopEvents> {
    shared: Rc<Shared<S, E>>,
}

impl<S, E> Clone for ChunkCache<S, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<S: ChunkSource + 'static, E: MapEvents + 'static> ChunkCache<S, E> {
    pub fn new(source: S, events: E, options: MapOptions, planet_id: i64) -> Self {
        Self {
            shared: Rc::new(Shared {
                source,
                events,
                options,
                planet_id,
                state: RefCell::new(CacheState::default()),
            }),
        }
    }

    pub fn options(&self) -> &MapOptions {
        &self.shared.options
    }

    pub fn events(&self) -> &E {
        &self.shared.events
    }

    /// Chunk keys the viewport needs, per this cache's options.
    pub fn visible_chunks(&self, view: &ViewportState) -> Result<Vec<ChunkKey>, TransformError> {
        visible_chunks(view, &self.shared.options)
    }

    /// Align cache state with the visible chunk set.
    ///
    /// Loaded chunks missing from `visible` are evicted first; then every
    /// visible chunk that is neither loaded nor loading starts loading.
    /// Chunks still loading are left alone even if no longer visible.
    pub fn reconcile(&self, visible: &[ChunkKey]) -> ReconcilePass {
        let visible_set: HashSet<ChunkKey> = visible.iter().copied().collect();
        {
            let retain = self.shared.options.retain_evicted_payloads;
            let mut state = self.shared.state.borrow_mut();
            let stale: Vec<ChunkKey> = state
                .loaded
                .iter()
                .filter(|key| !visible_set.contains(*key))
                .copied()
                .collect();
            for key in stale {
                state.evict(key, retain);
            }
            state.enforce_payload_cap(self.shared.options.max_cached_chunks);
        }

        let mut seen = HashSet::with_capacity(visible.len());
        let mut requested = Vec::new();
        let mut loads = Vec::new();
        for &key in visible {
            if !seen.insert(key) || self.shared.state.borrow().loaded.contains(&key) {
                continue;
            }
            if let Some(load) = self.begin_load(key, false) {
                requested.push(key);
                loads.push(load);
            }
        }
        ReconcilePass::new(requested, loads)
    }

    /// Load one chunk. Served synchronously from the payload cache unless
    /// `force_refetch` is set or nothing is cached. A chunk that is already
    /// loading is left to its in-flight request.
    pub fn load_chunk(&self, key: ChunkKey, force_refetch: bool) -> LocalBoxFuture<'static, ()> {
        self.begin_load(key, force_refetch)
            .unwrap_or_else(|| future::ready(()).boxed_local())
    }

    /// Drop cached payloads for `keys` and fetch them again.
    pub fn refetch(&self, keys: &[ChunkKey]) -> ReconcilePass {
        {
            let mut state = self.shared.state.borrow_mut();
            for key in keys {
                if !state.in_flight.contains(key) {
                    state.payloads.remove(key);
                }
            }
        }
        let mut requested = Vec::new();
        let mut loads = Vec::new();
        for &key in keys {
            if let Some(load) = self.begin_load(key, true) {
                requested.push(key);
                loads.push(load);
            }
        }
        ReconcilePass::new(requested, loads)
    }

    /// Returns the pending network load, or `None` if there is nothing to await.
    fn begin_load(&self, key: ChunkKey, force_refetch: bool) -> Option<LocalBoxFuture<'static, ()>> {
        let options = &self.shared.options;
        let chunk_size = options.chunk_size();
        let chunk_bounds = key.cell_bounds(chunk_size);
        if let Some(grid) = options.grid_bounds
            && grid.intersection(&chunk_bounds).is_none()
        {
            debug!(chunk_x = key.x, chunk_y = key.y, "chunk outside grid bounds");
            return None;
        }

        let mut state = self.shared.state.borrow_mut();
        if state.in_flight.contains(&key) {
            debug!(chunk_x = key.x, chunk_y = key.y, "chunk already loading");
            return None;
        }

        if !force_refetch && let Some(entry) = state.payloads.get(&key).cloned() {
            let points = state.materialize(key, &entry.payload, chunk_size, options.grid_bounds);
            state.loaded.insert(key);
            debug!(chunk_x = key.x, chunk_y = key.y, points, "chunk restored from cache");
            return None;
        }

        state.loaded.remove(&key);
        let was_idle = state.in_flight.is_empty();
        state.in_flight.insert(key);
        drop(state);

        if was_idle {
            self.shared.events.loading_changed(true);
        }

        let request = self
            .shared
            .source
            .fetch(MapInfo::for_bounds(self.shared.planet_id, chunk_bounds));
        let guard = LoadGuard {
            shared: Some(Rc::clone(&self.shared)),
            key,
        };
        Some(
            async move {
                let result = request.await;
                guard.finish(result);
            }
            .boxed_local(),
        )
    }

    pub fn point_at(&self, cell: Cell) -> Option<Entity> {
        self.shared.state.borrow().points.get(&cell).cloned()
    }

    pub fn kind_at(&self, cell: Cell) -> Option<EntityKind> {
        self.shared
            .state
            .borrow()
            .points
            .get(&cell)
            .map(Entity::kind)
    }

    /// Report what sits on `cell` to the event sink. Exactly one of
    /// `entity_clicked` / `empty_cell_clicked` fires.
    pub fn handle_click(&self, cell: Cell) -> ClickOutcome {
        match self.point_at(cell) {
            Some(entity) => {
                self.shared.events.entity_clicked(cell, &entity);
                ClickOutcome::Entity { cell, entity }
            }
            None => {
                self.shared.events.empty_cell_clicked(cell);
                ClickOutcome::Empty { cell }
            }
        }
    }

    /// Hit-test a screen point and dispatch the click for the cell under it.
    /// Nothing is dispatched for points that hit no cell.
    pub fn handle_screen_click(
        &self,
        screen_x: f64,
        screen_y: f64,
        view: &ViewportState,
    ) -> Result<ScreenClick, TransformError> {
        let point = ScreenPoint::new(screen_x, screen_y);
        let Some(cell) = pick_cell(point, view, &self.shared.options)? else {
            return Ok(ScreenClick::NoCell);
        };
        Ok(match self.handle_click(cell) {
            ClickOutcome::Entity { cell, entity } => ScreenClick::Cell {
                cell,
                entity: Some(entity),
            },
            ClickOutcome::Empty { cell } => ScreenClick::Cell { cell, entity: None },
        })
    }

    pub fn is_loading(&self) -> bool {
        !self.shared.state.borrow().in_flight.is_empty()
    }

    /// `None` means the chunk is unknown.
    pub fn chunk_state(&self, key: ChunkKey) -> Option<ChunkState> {
        let state = self.shared.state.borrow();
        if state.in_flight.contains(&key) {
            Some(ChunkState::Loading)
        } else if state.loaded.contains(&key) {
            Some(ChunkState::Loaded)
        } else {
            None
        }
    }

    pub fn loaded_chunk_count(&self) -> usize {
        self.shared.state.borrow().loaded.len()
    }

    pub fn cached_chunk_count(&self) -> usize {
        self.shared.state.borrow().payloads.len()
    }

    pub fn is_cached(&self, key: ChunkKey) -> bool {
        self.shared.state.borrow().payloads.contains_key(&key)
    }

    pub fn cache_entry(&self, key: ChunkKey) -> Option<ChunkCacheEntry> {
        self.shared.state.borrow().payloads.get(&key).cloned()
    }

    pub fn point_count(&self) -> usize {
        self.shared.state.borrow().points.len()
    }
}
