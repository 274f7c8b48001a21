use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Largest player number the slot pairing can carry.
pub const MAX_PLAYER_NUMBER: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A roster member that can be placed into a room slot.
///
/// Only `id` and `player_number` matter to the codec and the store. `name` and
/// `resonance` drive roster search, filtering and display ordering; everything
/// else the directory sent is kept verbatim in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub player_number: u32,
    pub name: String,
    #[serde(default)]
    pub resonance: i64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
}

/// The entities available to one roster context, addressable by id and by
/// player number.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Directory {
    entities: Vec<Entity>,
    index_by_id: HashMap<EntityId, usize>,
}

impl Directory {
    /// Builds the lookup tables. Callers validate player numbers beforehand;
    /// on a duplicate id the first entity wins, matching lookup by player
    /// number.
    pub fn new(entities: Vec<Entity>) -> Self {
        let mut index_by_id = HashMap::with_capacity(entities.len());
        for (idx, entity) in entities.iter().enumerate() {
            index_by_id.entry(entity.id.clone()).or_insert(idx);
        }
        Self {
            entities,
            index_by_id,
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn by_id(&self, id: &EntityId) -> Option<&Entity> {
        self.index_by_id
            .get(id)
            .and_then(|idx| self.entities.get(*idx))
    }

    /// First entity carrying `player_number`.
    pub fn by_player_number(&self, player_number: u32) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|entity| entity.player_number == player_number)
    }

    /// Resolves a user-typed reference: entity id, then player number, then
    /// case-insensitive exact name.
    pub fn resolve(&self, reference: &str) -> Option<&Entity> {
        let reference = reference.trim();
        if let Some(entity) = self.by_id(&EntityId::new(reference)) {
            return Some(entity);
        }
        if let Ok(player_number) = reference.trim_start_matches('#').parse::<u32>() {
            if let Some(entity) = self.by_player_number(player_number) {
                return Some(entity);
            }
        }
        let lower = reference.to_lowercase();
        self.entities
            .iter()
            .find(|entity| entity.name.to_lowercase() == lower)
    }
}

#[cfg(test)]
pub(crate) fn test_entity(id: &str, player_number: u32, name: &str, resonance: i64) -> Entity {
    Entity {
        id: EntityId::new(id),
        player_number,
        name: name.to_string(),
        resonance,
        payload: Map::new(),
    }
}
