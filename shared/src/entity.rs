use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::Cell;

/// Opaque profile fields attached to a user cell, passed through untouched.
pub type Profile = serde_json::Map<String, serde_json::Value>;

/// Server ids show up both as numbers and as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(id) => write!(f, "{id}"),
            EntityId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Mine,
    Lock,
}

impl EntityKind {
    /// Which kind wins when a payload lists more than one entity on a cell.
    pub const fn precedence(self) -> u8 {
        match self {
            EntityKind::User => 2,
            EntityKind::Lock => 1,
            EntityKind::Mine => 0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Mine => "mine",
            EntityKind::Lock => "lock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntity {
    pub cell: Cell,
    pub profile: Profile,
}

/// A mine or lock: an id pinned to a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteEntity {
    pub id: EntityId,
    pub cell: Cell,
}

/// Whatever occupies a cell. Empty cells have no entity at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Entity {
    User(UserEntity),
    Mine(SiteEntity),
    Lock(SiteEntity),
}

impl Entity {
    pub const fn kind(&self) -> EntityKind {
        match self {
            Entity::User(_) => EntityKind::User,
            Entity::Mine(_) => EntityKind::Mine,
            Entity::Lock(_) => EntityKind::Lock,
        }
    }

    pub const fn cell(&self) -> Cell {
        match self {
            Entity::User(user) => user.cell,
            Entity::Mine(site) | Entity::Lock(site) => site.cell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, EntityId, EntityKind, SiteEntity};
    use crate::grid::Cell;

    #[test]
    fn precedence_prefers_users_then_locks() {
        assert!(EntityKind::User.precedence() > EntityKind::Lock.precedence());
        assert!(EntityKind::Lock.precedence() > EntityKind::Mine.precedence());
    }

    #[test]
    fn entity_ids_accept_numbers_and_strings() {
        let ids: Vec<EntityId> = serde_json::from_str(r#"[7, "m-12"]"#).expect("ids");
        assert_eq!(ids, vec![EntityId::Number(7), EntityId::Text("m-12".into())]);
        assert_eq!(ids[1].to_string(), "m-12");
    }

    #[test]
    fn entity_serializes_with_kind_tag() {
        let entity = Entity::Lock(SiteEntity {
            id: EntityId::Number(3),
            cell: Cell::new(4, 5),
        });
        let json = serde_json::to_value(&entity).expect("serialize");
        assert_eq!(json["type"], "lock");
        assert_eq!(json["data"]["cell"]["x"], 4);
        assert_eq!(entity.kind().as_str(), "lock");
        assert_eq!(entity.cell(), Cell::new(4, 5));
    }
}
