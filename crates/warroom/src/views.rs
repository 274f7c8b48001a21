//! Read-only projections used for display. Nothing here feeds back into the
//! grid or the token.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::entity::{Directory, Entity};
use crate::grid::{Grid, SLOTS_PER_ROOM};
use crate::store::AssignmentStore;

pub const FILTER_LEVELS: [i64; 4] = [3000, 5000, 7000, 9000];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterLevel {
    #[default]
    All,
    AtLeast(i64),
}

impl FilterLevel {
    pub fn admits(self, resonance: i64) -> bool {
        match self {
            Self::All => true,
            Self::AtLeast(min) => resonance >= min,
        }
    }
}

impl fmt::Display for FilterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::AtLeast(min) => write!(f, "{}k+", min / 1000),
        }
    }
}

impl FromStr for FilterLevel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lower = raw.trim().to_ascii_lowercase();
        if lower == "all" {
            return Ok(Self::All);
        }
        let value = match lower.strip_suffix("k+") {
            Some(thousands) => thousands.parse::<i64>().map(|k| k * 1000),
            None => lower.parse::<i64>(),
        }
        .map_err(|_| format!("invalid filter level '{raw}' (expected all|3000|5000|7000|9000)"))?;
        if FILTER_LEVELS.contains(&value) {
            Ok(Self::AtLeast(value))
        } else {
            Err(format!(
                "unsupported filter level '{raw}' (expected all|3000|5000|7000|9000)"
            ))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterFilter {
    pub search: String,
    pub level: FilterLevel,
}

impl RosterFilter {
    pub fn admits(&self, entity: &Entity) -> bool {
        entity
            .name
            .to_lowercase()
            .contains(&self.search.to_lowercase())
            && self.level.admits(entity.resonance)
    }
}

/// Entities sorted by resonance, highest first; ties keep directory order.
pub fn sorted_by_resonance(directory: &Directory) -> Vec<&Entity> {
    let mut sorted = directory.entities().iter().collect::<Vec<_>>();
    sorted.sort_by_key(|entity| Reverse(entity.resonance));
    sorted
}

/// Unassigned members passing the filter, in display order.
pub fn available_members<'a>(
    store: &'a AssignmentStore,
    filter: &RosterFilter,
) -> Vec<&'a Entity> {
    sorted_by_resonance(store.directory())
        .into_iter()
        .filter(|entity| !store.is_assigned(&entity.id))
        .filter(|entity| filter.admits(entity))
        .collect()
}

/// A room's occupants for display: strongest first, empty slots last. A room
/// index past the grid yields no slots at all.
pub fn sorted_room(grid: &Grid, room_index: usize) -> Vec<Option<&Entity>> {
    let Some(cells) = grid.room(room_index) else {
        return Vec::new();
    };
    let mut occupants = cells
        .iter()
        .flatten()
        .collect::<Vec<_>>();
    occupants.sort_by_key(|entity| Reverse(entity.resonance));
    let mut slots = occupants.into_iter().map(Some).collect::<Vec<_>>();
    slots.resize(SLOTS_PER_ROOM, None);
    slots
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entity::{test_entity, EntityId};
    use crate::grid::{SlotRef, ROOMS};

    fn store() -> AssignmentStore {
        AssignmentStore::new(Arc::new(Directory::new(vec![
            test_entity("a", 1, "Anna", 3100),
            test_entity("b", 2, "Borys", 9400),
            test_entity("c", 3, "Chrystia", 5000),
            test_entity("d", 4, "Danylo", 5000),
            test_entity("e", 5, "Anton", 800),
        ])))
    }

    fn names(entities: &[&Entity]) -> Vec<String> {
        entities.iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn filter_levels_parse_and_display() {
        assert_eq!("all".parse::<FilterLevel>(), Ok(FilterLevel::All));
        assert_eq!("5000".parse::<FilterLevel>(), Ok(FilterLevel::AtLeast(5000)));
        assert_eq!("7k+".parse::<FilterLevel>(), Ok(FilterLevel::AtLeast(7000)));
        assert!("4000".parse::<FilterLevel>().is_err());
        assert!("lots".parse::<FilterLevel>().is_err());
        assert_eq!(FilterLevel::AtLeast(9000).to_string(), "9k+");
        assert_eq!(FilterLevel::All.to_string(), "All");
    }

    #[test]
    fn available_members_sorted_and_filtered() {
        let mut store = store();
        assert_eq!(
            names(&available_members(&store, &RosterFilter::default())),
            vec!["Borys", "Chrystia", "Danylo", "Anna", "Anton"]
        );

        store
            .move_to_slot(&EntityId::new("b"), 0, 0)
            .expect("place");
        let filter = RosterFilter {
            search: "AN".to_string(),
            level: FilterLevel::AtLeast(3000),
        };
        assert_eq!(
            names(&available_members(&store, &filter)),
            vec!["Danylo", "Anna"]
        );
    }

    #[test]
    fn sorted_room_puts_strongest_first_and_empties_last() {
        let mut store = store();
        store
            .move_to_slot(&EntityId::new("e"), 2, 0)
            .expect("place");
        store
            .move_to_slot(&EntityId::new("b"), 2, 5)
            .expect("place");
        let view = sorted_room(store.grid(), 2);
        assert_eq!(view.len(), SLOTS_PER_ROOM);
        assert_eq!(view[0].map(|e| e.name.as_str()), Some("Borys"));
        assert_eq!(view[1].map(|e| e.name.as_str()), Some("Anton"));
        assert!(view[2..].iter().all(Option::is_none));
        assert_eq!(
            store
                .grid()
                .get(SlotRef::new(2, 0).expect("slot"))
                .map(|e| e.name.as_str()),
            Some("Anton")
        );
        assert!(sorted_room(store.grid(), ROOMS).is_empty());
    }
}
