use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod codec;
pub mod controller;
pub mod directory;
pub mod entity;
pub mod grid;
pub mod session;
pub mod share;
pub mod store;
pub mod sync;
pub mod views;

pub use codec::{
    decode_grid, decode_integer, encode_grid, encode_integer, try_decode_grid, CodecError,
    DecodedGrid, SkipReason, SkippedSegment,
};
pub use controller::{DropTarget, Gesture, GestureEffect, InteractionController, Selection};
pub use directory::{
    list_clans_view, ClanListing, ClanRecord, ClanSearch, ClansView, DirectoryError,
    DirectorySource, JsonFileDirectory, MemberRecord, Roster, RosterRoute, StaticDirectory,
    DEFAULT_HOME_CLAN_ID,
};
pub use entity::{Directory, Entity, EntityId, MAX_PLAYER_NUMBER};
pub use grid::{Grid, SlotRef, BATTLE_GROUPS, ROOMS, SLOTS_PER_ROOM};
pub use session::{GestureResult, LoadState, Notice, Session, SessionError};
pub use share::{battle_setup_text, share_url, DEFAULT_SHARE_BASE};
pub use store::{AssignmentStore, StoreError};
pub use sync::{
    AddressBar, FileTokenStorage, HashUpdateMessage, JsonLineParent, Location,
    MemoryTokenStorage, ParentContext, SyncBridge, SyncError, SyncReport, TokenStorage,
};
pub use views::{FilterLevel, RosterFilter};

pub const ROOT_ENV_VAR: &str = "WARROOM_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub directory_file: PathBuf,
    pub state_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create state directory at {path}: {source}")]
    CreateStateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "WARROOM_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or data/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or data/.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/path/to/warroom\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Default locations under the project root. The state directory is created
/// eagerly so the first token write cannot fail on a missing parent.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let directory_file = root.join("data").join("clans.json");
    let state_dir = root.join("cache").join("state");

    fs::create_dir_all(&state_dir).map_err(|source| StartupError::CreateStateDir {
        path: state_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        directory_file,
        state_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_data = path.join("data").is_dir();

    cargo_toml && (has_crates || has_data)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("data")).expect("data dir");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        assert!(is_repo_marker(temp.path()));
        assert!(!is_repo_marker(&temp.path().join("definitely_not_a_marker")));
    }
}
