use std::env;
use std::io;
use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warroom::{
    resolve_app_paths, AppPaths, FileTokenStorage, JsonLineParent, Location, RosterRoute,
    StartupError, SyncBridge, DEFAULT_HOME_CLAN_ID, DEFAULT_SHARE_BASE,
};

const DIRECTORY_ENV_VAR: &str = "WARROOM_DIRECTORY";
const STATE_DIR_ENV_VAR: &str = "WARROOM_STATE_DIR";
const HOME_CLAN_ENV_VAR: &str = "WARROOM_HOME_CLAN";
const SHARE_BASE_ENV_VAR: &str = "WARROOM_SHARE_BASE";
const EMBEDDED_ENV_VAR: &str = "WARROOM_EMBEDDED";
const PARENT_MESSAGE_PREFIX: &str = "T ";
const DEFAULT_LOCATION: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannerConfig {
    pub(crate) directory_file: PathBuf,
    pub(crate) state_dir: PathBuf,
    pub(crate) home_clan_id: String,
    pub(crate) share_base: String,
    pub(crate) embedded: bool,
}

impl PlannerConfig {
    fn from_env(paths: &AppPaths) -> Self {
        Self::from_lookup(paths, |var| env::var(var).ok())
    }

    fn from_lookup<F>(paths: &AppPaths, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let directory_file = non_empty(lookup(DIRECTORY_ENV_VAR))
            .map(PathBuf::from)
            .unwrap_or_else(|| paths.directory_file.clone());
        let state_dir = non_empty(lookup(STATE_DIR_ENV_VAR))
            .map(PathBuf::from)
            .unwrap_or_else(|| paths.state_dir.clone());
        let home_clan_id =
            non_empty(lookup(HOME_CLAN_ENV_VAR)).unwrap_or_else(|| DEFAULT_HOME_CLAN_ID.to_string());
        let share_base = match non_empty(lookup(SHARE_BASE_ENV_VAR)) {
            Some(value) if value.starts_with("http://") || value.starts_with("https://") => value,
            Some(value) => {
                warn!(
                    value = %value,
                    fallback = DEFAULT_SHARE_BASE,
                    "share_base_invalid_using_default"
                );
                DEFAULT_SHARE_BASE.to_string()
            }
            None => DEFAULT_SHARE_BASE.to_string(),
        };
        let embedded = parse_enabled_flag(lookup(EMBEDDED_ENV_VAR).as_deref());

        Self {
            directory_file,
            state_dir,
            home_clan_id,
            share_base,
            embedded,
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: PlannerConfig,
    pub(crate) route: RosterRoute,
    pub(crate) bridge: SyncBridge,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Shadow Wars Planner Startup ===");

    let paths = resolve_app_paths()?;
    let config = PlannerConfig::from_env(&paths);
    let location = Location::parse(&location_arg());
    let route = RosterRoute::from_clan_index(location.clan_index(), &config.home_clan_id);

    info!(
        root = %paths.root.display(),
        directory = %config.directory_file.display(),
        state_dir = %config.state_dir.display(),
        route = ?route,
        embedded = config.embedded,
        "planner_configured"
    );

    let bridge = build_bridge(&config, location);
    Ok(AppWiring {
        config,
        route,
        bridge,
    })
}

pub(crate) fn build_bridge(config: &PlannerConfig, location: Location) -> SyncBridge {
    let bridge = SyncBridge::new(
        Box::new(FileTokenStorage::new(config.state_dir.clone())),
        Box::new(location),
    );
    if config.embedded {
        bridge.with_parent(Box::new(
            JsonLineParent::new(io::stdout()).with_prefix(PARENT_MESSAGE_PREFIX),
        ))
    } else {
        bridge
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn location_arg() -> String {
    let mut args = env::args().skip(1);
    let location = args.next().unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    let ignored = args.count();
    if ignored > 0 {
        warn!(ignored, "planner_extra_args_ignored");
    }
    location
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn parse_enabled_flag(raw: Option<&str>) -> bool {
    let Some(raw) = raw else {
        return false;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "" | "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(value = raw, "embedded_flag_invalid_using_default");
            false
        }
    }
}
