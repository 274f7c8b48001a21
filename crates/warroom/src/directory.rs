use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::entity::{Directory, Entity, EntityId, MAX_PLAYER_NUMBER};

pub const DEFAULT_HOME_CLAN_ID: &str = "Zhg/SM1poUE/Qfdp";
const HOME_TITLE_FALLBACK: &str = "Shadow Wars";
const UNKNOWN_CLAN_TITLE: &str = "Unknown Immortal Clan";
const UNRANKED_SORT_RANK: i64 = 99;
const UNRANKED_SHADOW_SORT_RANK: i64 = 999;
/// Queries this short leave the clan list unfiltered.
const MIN_CLAN_QUERY_CHARS: usize = 3;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("clan directory unavailable at {location}: {reason}")]
    Unavailable { location: String, reason: String },
    #[error("malformed clan directory at {location}: {reason}")]
    Malformed { location: String, reason: String },
    #[error("roster '{clan}' has {member_count} members; at most 100 fit in a token")]
    RosterTooLarge { clan: String, member_count: usize },
    #[error("player number {player_number} for '{id}' is outside 1..=100")]
    InvalidPlayerNumber { id: EntityId, player_number: u32 },
    #[error("player number {player_number} is used by both '{first}' and '{second}'")]
    DuplicatePlayerNumber {
        player_number: u32,
        first: EntityId,
        second: EntityId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClanRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rank: i64,
    #[serde(rename = "immortalRank", default)]
    pub immortal_rank: i64,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
}

/// A member as the directory service sends it. Fields beyond `name` and
/// `resonance` (class, hp, armor, ...) stay opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub name: String,
    #[serde(default)]
    pub resonance: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where the clan list comes from. Loading happens once, before any
/// interaction, and its failure is fatal to the session.
pub trait DirectorySource {
    fn list_clans(&self) -> Result<Vec<ClanRecord>, DirectoryError>;
}

/// Reads the `/clans` response body from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileDirectory {
    path: PathBuf,
}

impl JsonFileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DirectorySource for JsonFileDirectory {
    fn list_clans(&self) -> Result<Vec<ClanRecord>, DirectoryError> {
        let location = self.path.display().to_string();
        let raw = fs::read_to_string(&self.path).map_err(|error| DirectoryError::Unavailable {
            location: location.clone(),
            reason: error.to_string(),
        })?;
        parse_clans_json(&raw).map_err(|reason| DirectoryError::Malformed { location, reason })
    }
}

/// Already-fetched clans, e.g. for tests or an embedding that fetched itself.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    clans: Vec<ClanRecord>,
}

impl StaticDirectory {
    pub fn new(clans: Vec<ClanRecord>) -> Self {
        Self { clans }
    }
}

impl DirectorySource for StaticDirectory {
    fn list_clans(&self) -> Result<Vec<ClanRecord>, DirectoryError> {
        Ok(self.clans.clone())
    }
}

pub fn parse_clans_json(raw: &str) -> Result<Vec<ClanRecord>, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, Vec<ClanRecord>>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        if path.is_empty() || path == "." {
            format!("parse clans json: {source}")
        } else {
            format!("parse clans json at {path}: {source}")
        }
    })
}

/// Which roster a session plans for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterRoute {
    /// 1-based position among immortal clans ordered by rank.
    Immortal { clan_index: usize },
    /// The operator's own clan, looked up by id.
    Home { clan_id: String },
}

impl RosterRoute {
    pub fn from_clan_index(clan_index: Option<usize>, home_clan_id: &str) -> Self {
        match clan_index {
            Some(clan_index) => Self::Immortal { clan_index },
            None => Self::Home {
                clan_id: home_clan_id.to_string(),
            },
        }
    }

    pub fn clan_index(&self) -> Option<usize> {
        match self {
            Self::Immortal { clan_index } => Some(*clan_index),
            Self::Home { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub title: String,
    pub directory: Directory,
}

/// Picks the routed clan and numbers its members 1..=n in feed order. A
/// missing clan yields an empty roster; an oversize one is rejected.
pub fn select_roster(
    clans: &[ClanRecord],
    route: &RosterRoute,
) -> Result<Roster, DirectoryError> {
    let (clan, id_prefix, fallback_title) = match route {
        RosterRoute::Immortal { clan_index } => {
            let immortal = immortal_route_order(clans);
            (
                clan_index.checked_sub(1).and_then(|idx| immortal.get(idx).copied()),
                format!("enemy_{clan_index}"),
                UNKNOWN_CLAN_TITLE,
            )
        }
        RosterRoute::Home { clan_id } => (
            clans.iter().find(|clan| clan.id == *clan_id),
            "palyanytsya".to_string(),
            HOME_TITLE_FALLBACK,
        ),
    };

    let Some(clan) = clan else {
        info!(route = ?route, "roster_clan_not_found");
        return Ok(Roster {
            title: fallback_title.to_string(),
            directory: Directory::default(),
        });
    };

    if clan.members.len() > MAX_PLAYER_NUMBER as usize {
        return Err(DirectoryError::RosterTooLarge {
            clan: clan.name.clone(),
            member_count: clan.members.len(),
        });
    }

    let entities = clan
        .members
        .iter()
        .enumerate()
        .map(|(idx, member)| Entity {
            id: EntityId::new(format!("{id_prefix}_{idx}")),
            player_number: idx as u32 + 1,
            name: member.name.clone(),
            resonance: member.resonance,
            payload: member.extra.clone(),
        })
        .collect::<Vec<_>>();
    validate_player_numbers(&entities)?;

    info!(
        clan = %clan.name,
        member_count = entities.len(),
        "roster_selected"
    );
    Ok(Roster {
        title: clan.name.clone(),
        directory: Directory::new(entities),
    })
}

/// Immortal clans in the order `RosterRoute::Immortal` indexes them.
fn immortal_route_order(clans: &[ClanRecord]) -> Vec<&ClanRecord> {
    let mut immortal = clans
        .iter()
        .filter(|clan| clan.immortal_rank > 0)
        .collect::<Vec<_>>();
    immortal.sort_by_key(|clan| sort_rank(clan.rank, UNRANKED_SORT_RANK));
    immortal
}

fn sort_rank(rank: i64, unranked: i64) -> i64 {
    if rank == 0 {
        unranked
    } else {
        rank
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClanSearch {
    #[default]
    ClanName,
    MemberName,
}

/// One row of the clan browser. `route_index` is the 1-based index to plan
/// against this clan, present for immortal clans only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClanListing<'a> {
    pub route_index: Option<usize>,
    pub clan: &'a ClanRecord,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClansView<'a> {
    pub immortal: Vec<ClanListing<'a>>,
    pub shadow: Vec<ClanListing<'a>>,
}

/// Clan browser: immortal clans by immortal rank, then shadow clans by rank,
/// unranked last in both. A query of three or more characters keeps clans
/// whose name (or any member's name) contains it, case-insensitively.
pub fn list_clans_view<'a>(
    clans: &'a [ClanRecord],
    query: &str,
    search: ClanSearch,
) -> ClansView<'a> {
    let routes = immortal_route_order(clans);
    let route_index_of = |clan: &ClanRecord| {
        routes
            .iter()
            .position(|routed| std::ptr::eq(*routed, clan))
            .map(|idx| idx + 1)
    };

    let needle = query.to_lowercase();
    let filtering = query.chars().count() >= MIN_CLAN_QUERY_CHARS;
    let mut matching = clans
        .iter()
        .filter(|clan| {
            !filtering
                || match search {
                    ClanSearch::ClanName => clan.name.to_lowercase().contains(&needle),
                    ClanSearch::MemberName => clan
                        .members
                        .iter()
                        .any(|member| member.name.to_lowercase().contains(&needle)),
                }
        })
        .collect::<Vec<_>>();
    matching.sort_by_key(|clan| clan.rank);

    let mut immortal = matching
        .iter()
        .filter(|clan| clan.immortal_rank > 0)
        .copied()
        .collect::<Vec<_>>();
    immortal.sort_by_key(|clan| sort_rank(clan.immortal_rank, UNRANKED_SORT_RANK));
    let mut shadow = matching
        .iter()
        .filter(|clan| clan.immortal_rank == 0)
        .copied()
        .collect::<Vec<_>>();
    shadow.sort_by_key(|clan| sort_rank(clan.rank, UNRANKED_SHADOW_SORT_RANK));

    ClansView {
        immortal: immortal
            .into_iter()
            .map(|clan| ClanListing {
                route_index: route_index_of(clan),
                clan,
            })
            .collect(),
        shadow: shadow
            .into_iter()
            .map(|clan| ClanListing {
                route_index: None,
                clan,
            })
            .collect(),
    }
}

/// Player numbers must be unique and inside `1..=100` for tokens to decode
/// unambiguously.
pub fn validate_player_numbers(entities: &[Entity]) -> Result<(), DirectoryError> {
    let mut seen: Vec<Option<&EntityId>> = vec![None; MAX_PLAYER_NUMBER as usize + 1];
    for entity in entities {
        let n = entity.player_number;
        if n == 0 || n > MAX_PLAYER_NUMBER {
            return Err(DirectoryError::InvalidPlayerNumber {
                id: entity.id.clone(),
                player_number: n,
            });
        }
        if let Some(first) = seen[n as usize] {
            return Err(DirectoryError::DuplicatePlayerNumber {
                player_number: n,
                first: first.clone(),
                second: entity.id.clone(),
            });
        }
        seen[n as usize] = Some(&entity.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn member(name: &str, resonance: i64) -> MemberRecord {
        let mut extra = Map::new();
        extra.insert("class".to_string(), Value::from("Monk"));
        MemberRecord {
            name: name.to_string(),
            resonance,
            extra,
        }
    }

    fn clan(id: &str, rank: i64, immortal_rank: i64, members: Vec<MemberRecord>) -> ClanRecord {
        ClanRecord {
            id: id.to_string(),
            name: format!("clan {id}"),
            rank,
            immortal_rank,
            updated_at: None,
            members,
        }
    }

    #[test]
    fn immortal_route_orders_by_rank_with_unranked_last() {
        let clans = vec![
            clan("a", 0, 1, vec![member("unranked", 1)]),
            clan("b", 5, 2, vec![member("fifth", 1)]),
            clan("c", 2, 0, vec![member("mortal", 1)]),
            clan("d", 3, 3, vec![member("third", 1), member("third2", 2)]),
        ];
        let first = select_roster(&clans, &RosterRoute::Immortal { clan_index: 1 })
            .expect("first clan");
        assert_eq!(first.title, "clan d");
        assert_eq!(first.directory.len(), 2);
        let ids = first
            .directory
            .entities()
            .iter()
            .map(|e| (e.id.as_str(), e.player_number))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![("enemy_1_0", 1), ("enemy_1_1", 2)]);

        let third = select_roster(&clans, &RosterRoute::Immortal { clan_index: 3 })
            .expect("third clan");
        assert_eq!(third.title, "clan a");

        let missing = select_roster(&clans, &RosterRoute::Immortal { clan_index: 4 })
            .expect("missing clan is not an error");
        assert_eq!(missing.title, "Unknown Immortal Clan");
        assert!(missing.directory.is_empty());
    }

    #[test]
    fn home_route_uses_clan_id_and_keeps_payload() {
        let clans = vec![clan(DEFAULT_HOME_CLAN_ID, 1, 0, vec![member("Olena", 8000)])];
        let roster = select_roster(
            &clans,
            &RosterRoute::from_clan_index(None, DEFAULT_HOME_CLAN_ID),
        )
        .expect("home");
        let entity = &roster.directory.entities()[0];
        assert_eq!(entity.id.as_str(), "palyanytsya_0");
        assert_eq!(entity.resonance, 8000);
        assert_eq!(entity.payload.get("class"), Some(&Value::from("Monk")));

        let fallback = select_roster(
            &clans,
            &RosterRoute::Home {
                clan_id: "nope".to_string(),
            },
        )
        .expect("fallback");
        assert_eq!(fallback.title, "Shadow Wars");
    }

    fn names(listings: &[ClanListing<'_>]) -> Vec<(String, Option<usize>)> {
        listings
            .iter()
            .map(|listing| (listing.clan.name.clone(), listing.route_index))
            .collect()
    }

    fn browser_clans() -> Vec<ClanRecord> {
        vec![
            clan("wardens", 2, 1, vec![member("Grimnir", 1)]),
            clan("court", 5, 3, vec![member("Morrow", 1)]),
            clan("night", 0, 2, vec![member("Raven", 1), member("Thorn", 1)]),
            clan("home", 14, 0, vec![member("Olena", 1)]),
            clan("unranked", 0, 0, vec![member("Nobody", 1)]),
            clan("vale", 3, 0, vec![member("Olenka", 1)]),
        ]
    }

    #[test]
    fn clan_browser_orders_sections_and_maps_route_indexes() {
        let clans = browser_clans();
        let view = list_clans_view(&clans, "", ClanSearch::ClanName);
        assert_eq!(
            names(&view.immortal),
            vec![
                ("clan wardens".to_string(), Some(1)),
                ("clan night".to_string(), Some(3)),
                ("clan court".to_string(), Some(2)),
            ]
        );
        assert_eq!(
            names(&view.shadow),
            vec![
                ("clan vale".to_string(), None),
                ("clan home".to_string(), None),
                ("clan unranked".to_string(), None),
            ]
        );

        let routed = select_roster(&clans, &RosterRoute::Immortal { clan_index: 3 })
            .expect("route 3");
        assert_eq!(routed.title, "clan night");
    }

    #[test]
    fn clan_browser_ignores_queries_shorter_than_three_chars() {
        let clans = browser_clans();
        let short = list_clans_view(&clans, "ni", ClanSearch::ClanName);
        assert_eq!(short.immortal.len() + short.shadow.len(), clans.len());

        let view = list_clans_view(&clans, "NIG", ClanSearch::ClanName);
        assert_eq!(names(&view.immortal), vec![("clan night".to_string(), Some(3))]);
        assert!(view.shadow.is_empty());
    }

    #[test]
    fn clan_browser_searches_member_names() {
        let clans = browser_clans();
        let view = list_clans_view(&clans, "olen", ClanSearch::MemberName);
        assert!(view.immortal.is_empty());
        assert_eq!(
            names(&view.shadow),
            vec![("clan vale".to_string(), None), ("clan home".to_string(), None)]
        );

        let by_name = list_clans_view(&clans, "olen", ClanSearch::ClanName);
        assert!(by_name.immortal.is_empty() && by_name.shadow.is_empty());

        let thorn = list_clans_view(&clans, "thorn", ClanSearch::MemberName);
        assert_eq!(names(&thorn.immortal), vec![("clan night".to_string(), Some(3))]);
    }

    #[test]
    fn oversize_roster_is_rejected() {
        let members = (0..101).map(|n| member(&format!("m{n}"), n)).collect();
        let clans = vec![clan("big", 1, 1, members)];
        let err = select_roster(&clans, &RosterRoute::Immortal { clan_index: 1 })
            .expect_err("too large");
        assert!(matches!(
            err,
            DirectoryError::RosterTooLarge {
                member_count: 101,
                ..
            }
        ));
    }

    #[test]
    fn player_number_validation_catches_range_and_duplicates() {
        let mk = |id: &str, n| Entity {
            id: EntityId::new(id),
            player_number: n,
            name: id.to_string(),
            resonance: 0,
            payload: Map::new(),
        };
        assert!(validate_player_numbers(&[mk("a", 1), mk("b", 100)]).is_ok());
        assert!(matches!(
            validate_player_numbers(&[mk("a", 0)]),
            Err(DirectoryError::InvalidPlayerNumber { .. })
        ));
        assert!(matches!(
            validate_player_numbers(&[mk("a", 101)]),
            Err(DirectoryError::InvalidPlayerNumber { .. })
        ));
        assert!(matches!(
            validate_player_numbers(&[mk("a", 7), mk("b", 7)]),
            Err(DirectoryError::DuplicatePlayerNumber {
                player_number: 7,
                ..
            })
        ));
    }

    #[test]
    fn json_file_directory_reports_missing_and_malformed_files() {
        let temp = TempDir::new().expect("tempdir");
        let missing = JsonFileDirectory::new(temp.path().join("clans.json"));
        assert!(matches!(
            missing.list_clans(),
            Err(DirectoryError::Unavailable { .. })
        ));

        let path = temp.path().join("bad.json");
        fs::write(&path, r#"[{"id":"x","name":7,"members":[]}]"#).expect("write");
        let err = JsonFileDirectory::new(&path)
            .list_clans()
            .expect_err("malformed");
        let text = err.to_string();
        assert!(text.contains("at [0].name"), "{text}");
    }

    #[test]
    fn json_file_directory_reads_feed_shape() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("clans.json");
        fs::write(
            &path,
            r#"[{"id":"k1","name":"Kyiv","rank":2,"immortalRank":1,"updated_at":null,
                "members":[{"id":"m1","name":"Ivan","class":"Druid","hp":10,"resonance":6100}]}]"#,
        )
        .expect("write");
        let clans = JsonFileDirectory::new(&path).list_clans().expect("parse");
        assert_eq!(clans[0].immortal_rank, 1);
        assert_eq!(clans[0].members[0].resonance, 6100);
        assert_eq!(
            clans[0].members[0].extra.get("id"),
            Some(&Value::from("m1"))
        );
    }
}
