use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

use warroom::codec::{decode_integer, encode_integer, pack, unpack, SEPARATOR};
use warroom::directory::select_roster;
use warroom::{
    battle_setup_text, try_decode_grid, DirectorySource, JsonFileDirectory, RosterRoute,
    SkippedSegment, SlotRef, DEFAULT_HOME_CLAN_ID, MAX_PLAYER_NUMBER,
};

pub const HOME_CLAN_ENV_VAR: &str = "WARROOM_HOME_CLAN";

pub enum CommandKind {
    Inspect {
        token: String,
    },
    Pack {
        placements: Vec<String>,
    },
    Setup {
        directory: PathBuf,
        clan_index: Option<usize>,
        home_clan_id: String,
        token: String,
    },
}

/// One explicit placement, 1-based as typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub room_number: usize,
    pub slot_number: usize,
    pub player_number: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetupReport {
    pub text: String,
    pub skipped: Vec<SkippedSegment>,
}

/// `--home` wins over `WARROOM_HOME_CLAN`; blank values fall through to the
/// built-in home clan, the same way the planner resolves it.
pub fn resolve_home_clan_id(flag: Option<String>, env_value: Option<String>) -> String {
    [flag, env_value]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_HOME_CLAN_ID.to_string())
}

/// Accepts a bare token or anything ending in `#<token>`, such as a share URL.
pub fn token_from_input(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.rsplit_once('#') {
        Some((_, token)) => token,
        None => trimmed,
    }
}

pub fn inspect_lines(token: &str) -> Vec<String> {
    let segments = token
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    if segments.is_empty() {
        return vec!["(empty token)".to_string()];
    }

    let mut errors = 0usize;
    let mut lines = Vec::with_capacity(segments.len() + 1);
    for segment in &segments {
        match decode_integer(segment) {
            Ok(packed) => {
                let (slot_id, player_number) = unpack(packed);
                let position = usize::try_from(slot_id)
                    .ok()
                    .and_then(SlotRef::from_slot_id)
                    .map(|slot| format!("room {} slot {}", slot.room_number(), slot.slot_number()))
                    .unwrap_or_else(|| "out of range".to_string());
                lines.push(format!(
                    "{segment}\t{packed}\tslot {slot_id}\t{position}\tplayer {player_number}"
                ));
            }
            Err(err) => {
                errors += 1;
                lines.push(format!("{segment}\terror: {err}"));
            }
        }
    }
    lines.push(format!("segments: {}, errors: {errors}", segments.len()));
    lines
}

pub fn parse_placement(raw: &str) -> Result<Placement, String> {
    let parts = raw.split(':').collect::<Vec<_>>();
    let [room, slot, player] = parts.as_slice() else {
        return Err(format!(
            "invalid placement '{raw}' (expected <room>:<slot>:<player>)"
        ));
    };
    let room_number = parse_in_range(room, "room", 1, warroom::ROOMS)?;
    let slot_number = parse_in_range(slot, "slot", 1, warroom::SLOTS_PER_ROOM)?;
    let player_number = parse_in_range(player, "player", 1, MAX_PLAYER_NUMBER as usize)? as u32;
    Ok(Placement {
        room_number,
        slot_number,
        player_number,
    })
}

/// Builds a token from explicit placements, in grid traversal order.
pub fn pack_token(placements: &[Placement]) -> Result<String, String> {
    let mut slots = HashSet::new();
    let mut players = HashSet::new();
    let mut packed = Vec::with_capacity(placements.len());

    for placement in placements {
        let slot = SlotRef::new(placement.room_number - 1, placement.slot_number - 1)
            .ok_or_else(|| {
                format!(
                    "room {} slot {} is outside the grid",
                    placement.room_number, placement.slot_number
                )
            })?;
        if !slots.insert(slot.slot_id()) {
            return Err(format!(
                "room {} slot {} is used twice",
                placement.room_number, placement.slot_number
            ));
        }
        if !players.insert(placement.player_number) {
            return Err(format!(
                "player {} is placed twice",
                placement.player_number
            ));
        }
        packed.push((slot.slot_id(), pack(slot, placement.player_number)));
    }

    packed.sort_by_key(|(slot_id, _)| *slot_id);
    Ok(packed
        .into_iter()
        .map(|(_, code)| encode_integer(code))
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string()))
}

pub fn setup_report(
    source: &dyn DirectorySource,
    route: &RosterRoute,
    token: &str,
) -> Result<SetupReport, String> {
    let clans = source.list_clans().map_err(|err| err.to_string())?;
    let roster = select_roster(&clans, route).map_err(|err| err.to_string())?;
    let decoded = try_decode_grid(token, &roster.directory)
        .map_err(|err| format!("token cannot be decoded: {err}"))?;
    Ok(SetupReport {
        text: battle_setup_text(&decoded.grid),
        skipped: decoded.skipped,
    })
}

pub fn run<W: Write, E: Write>(kind: CommandKind, stdout: &mut W, stderr: &mut E) -> Result<(), String> {
    match kind {
        CommandKind::Inspect { token } => {
            for line in inspect_lines(token_from_input(&token)) {
                write_line(stdout, &line)?;
            }
        }
        CommandKind::Pack { placements } => {
            let placements = placements
                .iter()
                .map(|raw| parse_placement(raw))
                .collect::<Result<Vec<_>, _>>()?;
            write_line(stdout, &pack_token(&placements)?)?;
        }
        CommandKind::Setup {
            directory,
            clan_index,
            home_clan_id,
            token,
        } => {
            let route = RosterRoute::from_clan_index(clan_index, &home_clan_id);
            let report = setup_report(
                &JsonFileDirectory::new(directory),
                &route,
                token_from_input(&token),
            )?;
            write_line(stdout, &report.text)?;
            for skipped in &report.skipped {
                write_line(
                    stderr,
                    &format!(
                        "skipped {}: slot {} player {} ({:?})",
                        skipped.segment, skipped.slot_id, skipped.player_number, skipped.reason
                    ),
                )?;
            }
        }
    }
    Ok(())
}

fn parse_in_range(raw: &str, what: &str, min: usize, max: usize) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(value) if (min..=max).contains(&value) => Ok(value),
        _ => Err(format!("invalid {what} '{raw}' (expected {min}..={max})")),
    }
}

fn write_line<W: Write>(out: &mut W, line: &str) -> Result<(), String> {
    writeln!(out, "{line}").map_err(|err| format!("failed to write output: {err}"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn token_from_input_strips_share_url() {
        assert_eq!(token_from_input("https://imbaw.com/diablo/2#li.3k"), "li.3k");
        assert_eq!(token_from_input(" li "), "li");
        assert_eq!(token_from_input("/diablo/2#"), "");
    }

    #[test]
    fn inspect_reports_each_segment() {
        let lines = inspect_lines("li.zzzz.l!");
        assert_eq!(lines[0], "li\t1320\tslot 13\troom 2 slot 6\tplayer 7");
        assert!(lines[1].starts_with("zzzz\t"), "{lines:?}");
        assert!(lines[1].contains("out of range"), "{lines:?}");
        assert_eq!(
            lines[2],
            "l!\terror: invalid character '!' at position 1 in code 'l!'"
        );
        assert_eq!(lines[3], "segments: 3, errors: 1");
        assert_eq!(inspect_lines(""), vec!["(empty token)"]);
    }

    #[test]
    fn pack_orders_by_slot_and_rejects_duplicates() {
        let placements = ["2:6:7", "1:1:1"]
            .iter()
            .map(|raw| parse_placement(raw).expect("placement"))
            .collect::<Vec<_>>();
        assert_eq!(pack_token(&placements).expect("token"), "1.li");

        let twice = [
            parse_placement("1:1:1").expect("placement"),
            parse_placement("1:2:1").expect("placement"),
        ];
        assert_eq!(
            pack_token(&twice).expect_err("duplicate player"),
            "player 1 is placed twice"
        );
        assert!(parse_placement("13:1:1").is_err());
        assert!(parse_placement("1:1:101").is_err());
        assert!(parse_placement("1:1").is_err());
    }

    #[test]
    fn setup_decodes_against_directory_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("clans.json");
        fs::write(
            &path,
            r#"[{"id":"a","name":"Sich","rank":1,"immortalRank":1,
                 "members":[{"name":"Olena","resonance":9400},{"name":"Taras","resonance":100}]}]"#,
        )
        .expect("write clans");

        let mut out = Vec::new();
        let mut err = Vec::new();
        run(
            CommandKind::Setup {
                directory: path,
                clan_index: Some(1),
                home_clan_id: DEFAULT_HOME_CLAN_ID.to_string(),
                token: "https://imbaw.com/diablo/1#1.2.li".to_string(),
            },
            &mut out,
            &mut err,
        )
        .expect("setup");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("+8\n\n#[1]\nOlena |\n\n#[2]"), "{text}");
        let skipped = String::from_utf8(err).expect("utf8");
        assert!(skipped.contains("skipped 2: slot 0 player 2 (SlotTaken)"), "{skipped}");
        assert!(skipped.contains("skipped li: slot 13 player 7 (UnknownPlayer)"), "{skipped}");
    }

    #[test]
    fn home_clan_resolves_flag_then_env_then_default() {
        assert_eq!(
            resolve_home_clan_id(Some("flag".to_string()), Some("env".to_string())),
            "flag"
        );
        assert_eq!(
            resolve_home_clan_id(Some("  ".to_string()), Some(" env ".to_string())),
            "env"
        );
        assert_eq!(resolve_home_clan_id(None, None), DEFAULT_HOME_CLAN_ID);
    }

    #[test]
    fn setup_without_clan_uses_configured_home_roster() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("clans.json");
        fs::write(
            &path,
            r#"[{"id":"Zhg/SM1poUE/Qfdp","name":"Default","members":[{"name":"Wrong"}]},
                {"id":"clan-7","name":"Sich","members":[{"name":"Olena"}]}]"#,
        )
        .expect("write clans");

        let mut out = Vec::new();
        run(
            CommandKind::Setup {
                directory: path,
                clan_index: None,
                home_clan_id: resolve_home_clan_id(Some("clan-7".to_string()), None),
                token: "1".to_string(),
            },
            &mut out,
            &mut Vec::<u8>::new(),
        )
        .expect("setup");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Olena |"), "{text}");
        assert!(!text.contains("Wrong"), "{text}");
    }

    #[test]
    fn setup_rejects_malformed_token() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("clans.json");
        fs::write(&path, "[]").expect("write clans");
        let route = RosterRoute::from_clan_index(None, DEFAULT_HOME_CLAN_ID);
        let err = setup_report(&JsonFileDirectory::new(path), &route, "a-b")
            .expect_err("malformed");
        assert!(err.starts_with("token cannot be decoded"), "{err}");
    }
}
