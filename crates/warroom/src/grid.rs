use crate::entity::{Entity, EntityId};

pub const ROOMS: usize = 12;
pub const SLOTS_PER_ROOM: usize = 8;
pub const TOTAL_SLOTS: usize = ROOMS * SLOTS_PER_ROOM;

/// Zero-based cell coordinate. Rooms are numbered 1..=12 outside this crate;
/// use [`SlotRef::room_number`] for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub room_index: usize,
    pub slot_index: usize,
}

impl SlotRef {
    pub fn new(room_index: usize, slot_index: usize) -> Option<Self> {
        if room_index < ROOMS && slot_index < SLOTS_PER_ROOM {
            Some(Self {
                room_index,
                slot_index,
            })
        } else {
            None
        }
    }

    pub fn from_slot_id(slot_id: usize) -> Option<Self> {
        if slot_id < TOTAL_SLOTS {
            Some(Self {
                room_index: slot_id / SLOTS_PER_ROOM,
                slot_index: slot_id % SLOTS_PER_ROOM,
            })
        } else {
            None
        }
    }

    pub fn slot_id(self) -> usize {
        self.room_index * SLOTS_PER_ROOM + self.slot_index
    }

    pub fn room_number(self) -> usize {
        self.room_index + 1
    }

    pub fn slot_number(self) -> usize {
        self.slot_index + 1
    }
}

/// Fixed 12x8 assignment grid. Cells are stored flat, indexed by slot id; the
/// length never changes after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: Vec<Option<Entity>>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

impl Grid {
    pub fn empty() -> Self {
        Self {
            cells: vec![None; TOTAL_SLOTS],
        }
    }

    pub fn get(&self, slot: SlotRef) -> Option<&Entity> {
        self.cells.get(slot.slot_id()).and_then(Option::as_ref)
    }

    /// False for cells outside the grid.
    pub fn is_empty_at(&self, slot: SlotRef) -> bool {
        matches!(self.cells.get(slot.slot_id()), Some(None))
    }

    pub(crate) fn set(&mut self, slot: SlotRef, entity: Entity) {
        self.cells[slot.slot_id()] = Some(entity);
    }

    pub(crate) fn take(&mut self, slot: SlotRef) -> Option<Entity> {
        self.cells[slot.slot_id()].take()
    }

    pub(crate) fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }

    /// The room's eight cells, or `None` past the last room.
    pub fn room(&self, room_index: usize) -> Option<&[Option<Entity>]> {
        if room_index >= ROOMS {
            return None;
        }
        let start = room_index * SLOTS_PER_ROOM;
        self.cells.get(start..start + SLOTS_PER_ROOM)
    }

    pub fn first_empty_slot(&self, room_index: usize) -> Option<SlotRef> {
        self.room(room_index)?
            .iter()
            .position(Option::is_none)
            .map(|slot_index| SlotRef {
                room_index,
                slot_index,
            })
    }

    pub fn room_occupancy(&self, room_index: usize) -> usize {
        self.room(room_index)
            .map_or(0, |cells| cells.iter().filter(|c| c.is_some()).count())
    }

    pub fn find(&self, id: &EntityId) -> Option<SlotRef> {
        self.cells
            .iter()
            .position(|cell| cell.as_ref().is_some_and(|entity| &entity.id == id))
            .and_then(SlotRef::from_slot_id)
    }

    /// Occupied cells in room-major, slot-minor order.
    pub fn occupied(&self) -> impl Iterator<Item = (SlotRef, &Entity)> {
        self.cells.iter().enumerate().filter_map(|(slot_id, cell)| {
            let entity = cell.as_ref()?;
            Some((SlotRef::from_slot_id(slot_id)?, entity))
        })
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleGroup {
    pub label: &'static str,
    pub room_numbers: [usize; 3],
}

pub const BATTLE_GROUPS: [BattleGroup; 4] = [
    BattleGroup {
        label: "+8",
        room_numbers: [1, 2, 3],
    },
    BattleGroup {
        label: "+4",
        room_numbers: [4, 5, 6],
    },
    BattleGroup {
        label: "+2",
        room_numbers: [7, 8, 9],
    },
    BattleGroup {
        label: "+1",
        room_numbers: [10, 11, 12],
    },
];

pub fn room_label(room_number: usize) -> &'static str {
    BATTLE_GROUPS
        .iter()
        .find(|group| group.room_numbers.contains(&room_number))
        .map(|group| group.label)
        .unwrap_or("")
}

/// Position of the room inside its battle group, 1..=3.
pub fn display_room_number(room_number: usize) -> Option<usize> {
    BATTLE_GROUPS.iter().find_map(|group| {
        group
            .room_numbers
            .iter()
            .position(|n| *n == room_number)
            .map(|pos| pos + 1)
    })
}
