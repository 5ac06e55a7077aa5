//! Wire format of the `map_range` endpoint.
//!
//! The response is a JSON array whose elements are positional sections:
//! `[{"range": ..}, {"users": [..]}, {"mines": [..]}, {"locks": [..]}]`.
//! Any element, or any key inside it, may be missing or `null`. The payload is
//! validated once here and the rest of the code only sees [`MapRange`].

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, Profile, SiteEntity, UserEntity};
use crate::grid::{Cell, CellBounds};

const RANGE_SECTION: usize = 0;
const USERS_SECTION: usize = 1;
const MINES_SECTION: usize = 2;
const LOCKS_SECTION: usize = 3;

/// Inclusive coordinate window requested from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    pub planet_id: i64,
    pub x_loc_min: i32,
    pub x_loc_max: i32,
    pub y_loc_min: i32,
    pub y_loc_max: i32,
}

impl MapInfo {
    pub const fn for_bounds(planet_id: i64, bounds: CellBounds) -> Self {
        Self {
            planet_id,
            x_loc_min: bounds.min_x,
            x_loc_max: bounds.max_x,
            y_loc_min: bounds.min_y,
            y_loc_max: bounds.max_y,
        }
    }

    pub const fn bounds(&self) -> CellBounds {
        CellBounds::new(self.x_loc_min, self.x_loc_max, self.y_loc_min, self.y_loc_max)
    }
}

/// Request body. `init_data` is the caller's session token, forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRangeRequest {
    pub init_data: String,
    pub map_info: MapInfo,
}

/// Validated contents of one `map_range` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRange {
    /// Range descriptor echoed by the server; its shape is not relied upon.
    pub range: Option<serde_json::Value>,
    pub users: Vec<UserEntity>,
    pub mines: Vec<SiteEntity>,
    pub locks: Vec<SiteEntity>,
}

impl MapRange {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.mines.is_empty() && self.locks.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.users.len() + self.mines.len() + self.locks.len()
    }

    /// Every entity in the payload, users first, then mines, then locks.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.users
            .iter()
            .cloned()
            .map(Entity::User)
            .chain(self.mines.iter().cloned().map(Entity::Mine))
            .chain(self.locks.iter().cloned().map(Entity::Lock))
    }
}

#[derive(Deserialize, Default)]
struct RawSection {
    #[serde(default)]
    range: Option<serde_json::Value>,
    #[serde(default)]
    users: Option<Vec<RawUser>>,
    #[serde(default)]
    mines: Option<Vec<RawSite>>,
    #[serde(default)]
    locks: Option<Vec<RawSite>>,
}

#[derive(Deserialize)]
struct RawUser {
    x_location: i32,
    y_location: i32,
    #[serde(flatten)]
    profile: Profile,
}

#[derive(Deserialize)]
struct RawSite {
    id: EntityId,
    x_location: i32,
    y_location: i32,
}

impl From<RawUser> for UserEntity {
    fn from(value: RawUser) -> Self {
        Self {
            cell: Cell::new(value.x_location, value.y_location),
            profile: value.profile,
        }
    }
}

impl From<RawSite> for SiteEntity {
    fn from(value: RawSite) -> Self {
        Self {
            id: value.id,
            cell: Cell::new(value.x_location, value.y_location),
        }
    }
}

/// Decode a raw response body into a [`MapRange`].
pub fn parse_map_range_payload(bytes: &[u8]) -> Result<MapRange, serde_json::Error> {
    let mut sections: Vec<Option<RawSection>> = serde_json::from_slice(bytes)?;
    let mut take = |index: usize| -> RawSection {
        sections
            .get_mut(index)
            .and_then(Option::take)
            .unwrap_or_default()
    };

    let range = take(RANGE_SECTION).range;
    let users = take(USERS_SECTION).users.unwrap_or_default();
    let mines = take(MINES_SECTION).mines.unwrap_or_default();
    let locks = take(LOCKS_SECTION).locks.unwrap_or_default();

    Ok(MapRange {
        range,
        users: users.into_iter().map(UserEntity::from).collect(),
        mines: mines.into_iter().map(SiteEntity::from).collect(),
        locks: locks.into_iter().map(SiteEntity::from).collect(),
    })
}
