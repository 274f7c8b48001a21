use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::codec::encode_grid;
use crate::entity::{Directory, Entity, EntityId};
use crate::grid::{Grid, SlotRef, ROOMS, SLOTS_PER_ROOM};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("slot {slot_number} in room {room_number} is taken by {occupant}")]
    SlotOccupied {
        room_number: usize,
        slot_number: usize,
        occupant: EntityId,
    },
    #[error("Room {room_number} is full.")]
    RoomFull { room_number: usize },
    #[error("unknown player '{id}'")]
    UnknownEntity { id: EntityId },
    #[error("room index {room_index} is out of range (expected 0..12)")]
    RoomOutOfRange { room_index: usize },
    #[error("slot index {slot_index} is out of range (expected 0..8)")]
    SlotOutOfRange { slot_index: usize },
}

impl StoreError {
    /// Short title for a transient notification.
    pub fn title(&self) -> &'static str {
        match self {
            Self::SlotOccupied { .. } => "Slot Occupied",
            Self::RoomFull { .. } => "Room Full",
            Self::UnknownEntity { .. } => "Unknown Player",
            Self::RoomOutOfRange { .. } | Self::SlotOutOfRange { .. } => "Invalid Target",
        }
    }
}

/// In-memory owner of the grid. Every operation either applies completely or
/// returns an error with the grid untouched.
///
/// Mutations return `Ok(true)` when the grid changed and `Ok(false)` for
/// no-ops, so callers only re-sync on real changes.
#[derive(Debug, Clone)]
pub struct AssignmentStore {
    directory: Arc<Directory>,
    grid: Grid,
    assigned_ids: HashSet<EntityId>,
}

impl AssignmentStore {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self::with_grid(directory, Grid::empty())
    }

    /// Adopts a decoded grid. Decoding never places an id twice, so the
    /// assigned set is a plain projection of the cells.
    pub fn with_grid(directory: Arc<Directory>, grid: Grid) -> Self {
        let assigned_ids = grid.occupied().map(|(_, e)| e.id.clone()).collect();
        Self {
            directory,
            grid,
            assigned_ids,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    pub fn token(&self) -> String {
        encode_grid(&self.grid)
    }

    pub fn is_assigned(&self, id: &EntityId) -> bool {
        self.assigned_ids.contains(id)
    }

    pub fn assigned_ids(&self) -> &HashSet<EntityId> {
        &self.assigned_ids
    }

    pub fn location_of(&self, id: &EntityId) -> Option<SlotRef> {
        if !self.is_assigned(id) {
            return None;
        }
        self.grid.find(id)
    }

    pub fn move_to_slot(
        &mut self,
        id: &EntityId,
        room_index: usize,
        slot_index: usize,
    ) -> Result<bool, StoreError> {
        let target = target_slot(room_index, slot_index)?;
        let entity = self.lookup(id)?;
        self.place(entity, target)
    }

    pub fn move_to_first_empty_slot(
        &mut self,
        id: &EntityId,
        room_index: usize,
    ) -> Result<bool, StoreError> {
        if room_index >= ROOMS {
            return Err(StoreError::RoomOutOfRange { room_index });
        }
        let entity = self.lookup(id)?;
        let Some(target) = self.grid.first_empty_slot(room_index) else {
            info!(
                entity_id = %id,
                room_number = room_index + 1,
                "assignment_rejected_room_full"
            );
            return Err(StoreError::RoomFull {
                room_number: room_index + 1,
            });
        };
        self.place(entity, target)
    }

    /// Like [`Self::move_to_first_empty_slot`], but the mover's own cell counts
    /// as free. A player dropped back onto their own full room stays put, and
    /// one dropped onto their own room moves up to an earlier gap.
    pub fn move_to_first_free_slot(
        &mut self,
        id: &EntityId,
        room_index: usize,
    ) -> Result<bool, StoreError> {
        let Some(cells) = self.grid.room(room_index) else {
            return Err(StoreError::RoomOutOfRange { room_index });
        };
        let entity = self.lookup(id)?;
        let free = cells
            .iter()
            .position(|cell| cell.as_ref().map_or(true, |occupant| occupant.id == *id));
        let Some(slot_index) = free else {
            info!(
                entity_id = %id,
                room_number = room_index + 1,
                "assignment_rejected_room_full"
            );
            return Err(StoreError::RoomFull {
                room_number: room_index + 1,
            });
        };
        let target = target_slot(room_index, slot_index)?;
        self.place(entity, target)
    }

    pub fn remove(&mut self, id: &EntityId) -> bool {
        let Some(slot) = self.location_of(id) else {
            return false;
        };
        self.grid.take(slot);
        self.assigned_ids.remove(id);
        true
    }

    pub fn remove_all(&mut self) -> bool {
        if self.assigned_ids.is_empty() {
            return false;
        }
        self.grid.clear();
        self.assigned_ids.clear();
        true
    }

    fn lookup(&self, id: &EntityId) -> Result<Entity, StoreError> {
        self.directory
            .by_id(id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownEntity { id: id.clone() })
    }

    fn place(&mut self, entity: Entity, target: SlotRef) -> Result<bool, StoreError> {
        if let Some(occupant) = self.grid.get(target) {
            if occupant.id == entity.id {
                return Ok(false);
            }
            info!(
                entity_id = %entity.id,
                occupant = %occupant.id,
                room_number = target.room_number(),
                slot_number = target.slot_number(),
                "assignment_rejected_slot_occupied"
            );
            return Err(StoreError::SlotOccupied {
                room_number: target.room_number(),
                slot_number: target.slot_number(),
                occupant: occupant.id.clone(),
            });
        }

        if let Some(previous) = self.location_of(&entity.id) {
            self.grid.take(previous);
        }
        self.assigned_ids.insert(entity.id.clone());
        self.grid.set(target, entity);
        Ok(true)
    }
}

fn target_slot(room_index: usize, slot_index: usize) -> Result<SlotRef, StoreError> {
    if room_index >= ROOMS {
        return Err(StoreError::RoomOutOfRange { room_index });
    }
    SlotRef::new(room_index, slot_index).ok_or(StoreError::SlotOutOfRange { slot_index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_entity;

    fn store_with(count: u32) -> AssignmentStore {
        let entities = (1..=count)
            .map(|n| test_entity(&format!("p_{n}"), n, &format!("P{n}"), i64::from(n) * 100))
            .collect();
        AssignmentStore::new(Arc::new(Directory::new(entities)))
    }

    fn id(n: u32) -> EntityId {
        EntityId::new(format!("p_{n}"))
    }

    fn assert_unique(store: &AssignmentStore) {
        let mut seen = HashSet::new();
        for (_, entity) in store.grid().occupied() {
            assert!(seen.insert(entity.id.clone()), "{} placed twice", entity.id);
        }
        assert_eq!(&seen, store.assigned_ids());
        for room in 0..ROOMS {
            assert!(store.grid().room_occupancy(room) <= SLOTS_PER_ROOM);
        }
    }

    #[test]
    fn move_to_slot_relocates_existing_placement() {
        let mut store = store_with(3);
        assert_eq!(store.move_to_slot(&id(1), 0, 0), Ok(true));
        assert_eq!(store.move_to_slot(&id(1), 4, 6), Ok(true));
        assert_eq!(store.location_of(&id(1)), SlotRef::new(4, 6));
        assert!(store.grid().is_empty_at(SlotRef::new(0, 0).expect("slot")));
        assert_unique(&store);
    }

    #[test]
    fn move_to_same_slot_is_a_no_op() {
        let mut store = store_with(3);
        store.move_to_slot(&id(2), 2, 1).expect("place");
        let before = store.token();
        assert_eq!(store.move_to_slot(&id(2), 2, 1), Ok(false));
        assert_eq!(store.token(), before);
    }

    #[test]
    fn move_to_occupied_slot_is_rejected_unchanged() {
        let mut store = store_with(3);
        store.move_to_slot(&id(1), 0, 0).expect("place 1");
        store.move_to_slot(&id(2), 1, 0).expect("place 2");
        let before = store.token();

        let err = store.move_to_slot(&id(2), 0, 0).expect_err("occupied");
        assert_eq!(
            err,
            StoreError::SlotOccupied {
                room_number: 1,
                slot_number: 1,
                occupant: id(1),
            }
        );
        assert_eq!(store.token(), before);
        assert_eq!(store.location_of(&id(2)), SlotRef::new(1, 0));
    }

    #[test]
    fn first_empty_slot_fills_gaps_then_reports_full_room() {
        let mut store = store_with(10);
        for n in 1..=8 {
            store.move_to_first_empty_slot(&id(n), 3).expect("room has space");
        }
        store.remove(&id(3));
        store.move_to_first_empty_slot(&id(9), 3).expect("gap");
        assert_eq!(store.location_of(&id(9)), SlotRef::new(3, 2));

        let before = store.token();
        let err = store.move_to_first_empty_slot(&id(10), 3).expect_err("full");
        assert_eq!(err, StoreError::RoomFull { room_number: 4 });
        assert_eq!(err.to_string(), "Room 4 is full.");
        assert_eq!(store.token(), before);
        assert!(!store.is_assigned(&id(10)));
        assert_unique(&store);
    }

    #[test]
    fn first_free_slot_counts_the_movers_own_cell() {
        let mut store = store_with(10);
        for n in 1..=8 {
            store.move_to_first_empty_slot(&id(n), 2).expect("fill");
        }
        let before = store.token();
        assert_eq!(store.move_to_first_free_slot(&id(4), 2), Ok(false));
        assert_eq!(store.token(), before);
        assert_eq!(
            store.move_to_first_free_slot(&id(9), 2),
            Err(StoreError::RoomFull { room_number: 3 })
        );

        store.remove(&id(2));
        assert_eq!(store.move_to_first_free_slot(&id(6), 2), Ok(true));
        assert_eq!(store.location_of(&id(6)), SlotRef::new(2, 1));
        assert!(store.grid().is_empty_at(SlotRef::new(2, 5).expect("slot")));

        assert_eq!(store.move_to_first_free_slot(&id(9), 0), Ok(true));
        assert_eq!(store.location_of(&id(9)), SlotRef::new(0, 0));
        assert_eq!(
            store.move_to_first_free_slot(&id(9), ROOMS),
            Err(StoreError::RoomOutOfRange { room_index: ROOMS })
        );
        assert_unique(&store);
    }

    #[test]
    fn remove_and_remove_all_report_changes() {
        let mut store = store_with(3);
        assert!(!store.remove(&id(1)));
        store.move_to_slot(&id(1), 0, 0).expect("place");
        store.move_to_slot(&id(2), 0, 1).expect("place");
        assert!(store.remove(&id(1)));
        assert!(!store.is_assigned(&id(1)));
        assert!(store.remove_all());
        assert!(!store.remove_all());
        assert_eq!(store.token(), "");
    }

    #[test]
    fn unknown_entities_and_bad_coordinates_are_rejected() {
        let mut store = store_with(1);
        assert_eq!(
            store.move_to_slot(&EntityId::new("ghost"), 0, 0),
            Err(StoreError::UnknownEntity {
                id: EntityId::new("ghost")
            })
        );
        assert_eq!(
            store.move_to_slot(&id(1), ROOMS, 0),
            Err(StoreError::RoomOutOfRange { room_index: ROOMS })
        );
        assert_eq!(
            store.move_to_slot(&id(1), 0, SLOTS_PER_ROOM),
            Err(StoreError::SlotOutOfRange {
                slot_index: SLOTS_PER_ROOM
            })
        );
        assert_eq!(
            store.move_to_first_empty_slot(&id(1), 99),
            Err(StoreError::RoomOutOfRange { room_index: 99 })
        );
    }

    #[test]
    fn capacity_and_uniqueness_hold_over_mixed_sequences() {
        let mut store = store_with(30);
        let mut seed = 17u64;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let player = (seed >> 33) as u32 % 30 + 1;
            let room = (seed >> 13) as usize % ROOMS;
            let slot = (seed >> 7) as usize % SLOTS_PER_ROOM;
            match seed % 4 {
                0 => {
                    let _ = store.move_to_slot(&id(player), room, slot);
                }
                1 => {
                    let _ = store.move_to_first_empty_slot(&id(player), room % 2);
                }
                2 => {
                    store.remove(&id(player));
                }
                _ => {
                    let _ = store.move_to_first_empty_slot(&id(player), room);
                }
            }
            assert_unique(&store);
        }
    }
}
