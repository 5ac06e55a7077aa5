//! Viewport-driven isometric map core.
//!
//! Turns pan/zoom/resize input into the set of grid chunks worth having,
//! keeps those chunks loaded from a [`source::ChunkSource`], and answers
//! point lookups and clicks. Drawing is left to the host.

pub mod bounds;
pub mod chunks;
pub mod error;
pub mod frame;
pub mod options;
pub mod source;
pub mod spatial;
pub mod transform;
pub mod viewport;

pub use bounds::{chunks_for_bounds, visible_bounds, visible_chunks};
pub use chunks::{
    ChunkCache, ChunkCacheEntry, ChunkState, ClickOutcome, MapEvents, NoopEvents, ReconcilePass,
    ScreenClick,
};
pub use error::{FetchError, TransformError};
pub use frame::{FrameCell, FramePlan, plan_frame};
pub use options::{CHUNK_SIZE, MapOptions};
pub use source::{ChunkSource, DEFAULT_MAP_RANGE_URL, FetchFuture, HttpChunkSource, SessionToken};
pub use spatial::{hit_test, pick_cell};
pub use transform::{
    IsoPoint, ScreenPoint, calculate_zoom, iso_to_screen, next_zoom_level, screen_to_iso,
    screen_to_iso_exact,
};
pub use viewport::{CLICK_SLOP_PX, DragTracker, ViewportState};
