use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::codec::decode_grid;
use crate::controller::{Gesture, InteractionController, Selection};
use crate::directory::{
    select_roster, ClanRecord, DirectoryError, DirectorySource, RosterRoute,
};
use crate::entity::{Directory, Entity, EntityId};
use crate::store::{AssignmentStore, StoreError};
use crate::sync::{SyncBridge, SyncReport};
use crate::views::{available_members, RosterFilter};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Gate in front of the interactive surface. `Loaded` with zero members is a
/// valid, distinct outcome from `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Failed { reason: String },
    Loaded { member_count: usize },
}

impl LoadState {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// A transient, non-fatal message for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    fn from_store_error(error: &StoreError) -> Self {
        Self {
            title: error.title().to_string(),
            description: error.to_string(),
        }
    }
}

/// Outcome of one gesture as seen by the front end.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureResult {
    pub notice: Option<Notice>,
    pub sync: Option<SyncReport>,
}

/// One planning session: roster, grid, selection and the outbound sync.
pub struct Session {
    title: String,
    route: RosterRoute,
    clans: Vec<ClanRecord>,
    store: AssignmentStore,
    controller: InteractionController,
    bridge: SyncBridge,
    filter: RosterFilter,
}

impl Session {
    /// Loads the routed roster, restores the starting token and publishes it.
    /// The directory fetch is the only failure that escapes.
    pub fn initialize(
        source: &dyn DirectorySource,
        route: RosterRoute,
        mut bridge: SyncBridge,
    ) -> Result<Self, SessionError> {
        let clans = source.list_clans().map_err(|err| {
            error!(error = %err, "directory_load_failed");
            err
        })?;
        let roster = select_roster(&clans, &route)?;
        let directory = Arc::new(roster.directory);

        let token = bridge.initial_token();
        let grid = if !token.is_empty() && !directory.is_empty() {
            decode_grid(&token, &directory)
        } else {
            Default::default()
        };
        let store = AssignmentStore::with_grid(directory, grid);
        bridge.publish(&store.token());

        info!(
            title = %roster.title,
            member_count = store.directory().len(),
            placed = store.grid().occupied_count(),
            "session_initialized"
        );
        Ok(Self {
            title: roster.title,
            route,
            clans,
            store,
            controller: InteractionController::new(),
            bridge,
            filter: RosterFilter::default(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn route(&self) -> &RosterRoute {
        &self.route
    }

    /// The full clan list as loaded, for browsing other routes.
    pub fn clans(&self) -> &[ClanRecord] {
        &self.clans
    }

    pub fn store(&self) -> &AssignmentStore {
        &self.store
    }

    pub fn directory(&self) -> &Directory {
        self.store.directory()
    }

    pub fn bridge(&self) -> &SyncBridge {
        &self.bridge
    }

    pub fn selection(&self) -> &Selection {
        self.controller.selection()
    }

    pub fn token(&self) -> String {
        self.store.token()
    }

    pub fn filter(&self) -> &RosterFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut RosterFilter {
        &mut self.filter
    }

    pub fn available_members(&self) -> Vec<&Entity> {
        available_members(&self.store, &self.filter)
    }

    /// Routes a gesture through the controller and republishes the token if
    /// the grid changed. Store rejections become notices.
    pub fn apply(&mut self, gesture: Gesture) -> GestureResult {
        match self.controller.handle(gesture, &mut self.store) {
            Ok(effect) if effect.grid_changed() => GestureResult {
                notice: None,
                sync: Some(self.bridge.publish(&self.store.token())),
            },
            Ok(_) => GestureResult {
                notice: None,
                sync: None,
            },
            Err(error) => GestureResult {
                notice: Some(Notice::from_store_error(&error)),
                sync: None,
            },
        }
    }

    /// Direct removal, as from a room card's close button.
    pub fn remove(&mut self, id: &EntityId) -> GestureResult {
        let sync = self
            .store
            .remove(id)
            .then(|| self.bridge.publish(&self.store.token()));
        GestureResult { notice: None, sync }
    }

    pub fn clear_all(&mut self) -> GestureResult {
        self.controller.reset();
        let sync = self
            .store
            .remove_all()
            .then(|| self.bridge.publish(&self.store.token()));
        GestureResult {
            notice: Some(Notice {
                title: "Battlefield Cleared".to_string(),
                description: "All players have been returned to the roster.".to_string(),
            }),
            sync,
        }
    }
}
