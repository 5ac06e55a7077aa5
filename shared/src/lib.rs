pub mod entity;
pub mod grid;
pub mod map_range;

pub use entity::*;
pub use grid::*;
pub use map_range::{MapInfo, MapRange, MapRangeRequest, parse_map_range_payload};
