use tracing::debug;

use crate::entity::EntityId;
use crate::store::{AssignmentStore, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Idle,
    Selected(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Dropped onto a specific cell.
    Slot {
        room_index: usize,
        slot_index: usize,
    },
    /// Dropped onto a room body; lands in its first free slot, counting the
    /// dragged player's own cell as free.
    Room { room_index: usize },
    Roster,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    ClickEntity(EntityId),
    ClickRoom { room_index: usize },
    ClickRoster,
    /// A finished drag. `None` destination means the drag was cancelled.
    Drop {
        entity: EntityId,
        destination: Option<DropTarget>,
    },
}

/// What a gesture did to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEffect {
    Unchanged,
    GridChanged,
}

impl GestureEffect {
    fn from_changed(changed: bool) -> Self {
        if changed {
            Self::GridChanged
        } else {
            Self::Unchanged
        }
    }

    pub fn grid_changed(self) -> bool {
        self == Self::GridChanged
    }
}

/// Turns clicks and drops into store mutations while tracking the single
/// selected entity.
#[derive(Debug, Default)]
pub struct InteractionController {
    selection: Selection,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected(&self) -> Option<&EntityId> {
        match &self.selection {
            Selection::Idle => None,
            Selection::Selected(id) => Some(id),
        }
    }

    pub fn reset(&mut self) {
        self.selection = Selection::Idle;
    }

    /// Applies one gesture. A store rejection leaves the grid untouched and is
    /// returned for the caller to surface; click selection survives it, a
    /// completed drop does not.
    pub fn handle(
        &mut self,
        gesture: Gesture,
        store: &mut AssignmentStore,
    ) -> Result<GestureEffect, StoreError> {
        debug!(?gesture, selection = ?self.selection, "gesture_received");
        match gesture {
            Gesture::ClickEntity(id) => {
                self.selection = match &self.selection {
                    Selection::Selected(current) if *current == id => Selection::Idle,
                    _ => Selection::Selected(id),
                };
                Ok(GestureEffect::Unchanged)
            }
            Gesture::ClickRoom { room_index } => {
                let Selection::Selected(id) = &self.selection else {
                    return Ok(GestureEffect::Unchanged);
                };
                let changed = store.move_to_first_empty_slot(id, room_index)?;
                self.selection = Selection::Idle;
                Ok(GestureEffect::from_changed(changed))
            }
            Gesture::ClickRoster => {
                let Selection::Selected(id) = &self.selection else {
                    return Ok(GestureEffect::Unchanged);
                };
                if !store.is_assigned(id) {
                    return Ok(GestureEffect::Unchanged);
                }
                let changed = store.remove(id);
                self.selection = Selection::Idle;
                Ok(GestureEffect::from_changed(changed))
            }
            Gesture::Drop {
                entity,
                destination,
            } => {
                let Some(destination) = destination else {
                    return Ok(GestureEffect::Unchanged);
                };
                self.selection = Selection::Idle;
                let changed = match destination {
                    DropTarget::Slot {
                        room_index,
                        slot_index,
                    } => store.move_to_slot(&entity, room_index, slot_index)?,
                    DropTarget::Room { room_index } => {
                        store.move_to_first_free_slot(&entity, room_index)?
                    }
                    DropTarget::Roster => store.remove(&entity),
                };
                Ok(GestureEffect::from_changed(changed))
            }
        }
    }
}
