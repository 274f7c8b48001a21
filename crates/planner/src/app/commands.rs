use std::collections::HashMap;

use warroom::{ClanSearch, FilterLevel};

/// Where a `drag` ends. Room and slot numbers are 1-based as typed; range
/// checks are left to the store so rejections surface as notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DragTarget {
    Room { room_number: usize },
    Slot { room_number: usize, slot_number: usize },
    Roster,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlannerCommand {
    Help,
    Rooms,
    Roster,
    Search { text: String },
    SearchClear,
    Filter { level: FilterLevel },
    Select { player: String },
    ClickRoom { room_number: usize },
    ClickRoster,
    Drag { player: String, target: DragTarget },
    Remove { player: String },
    Clear,
    Token,
    Share,
    Setup,
    Status,
    Clans { query: String, search: ClanSearch },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandParseError {
    pub(crate) reason: String,
    pub(crate) usage: String,
}

type ParseFn = dyn Fn(&[String]) -> Result<PlannerCommand, CommandParseError>;

pub(crate) struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

impl CommandSpec {
    pub(crate) fn parse(&self, args: &[String]) -> Result<PlannerCommand, CommandParseError> {
        (self.parse)(args)
    }
}

pub(crate) struct CommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl CommandRegistry {
    pub(crate) fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub(crate) fn with_planner_builtins() -> Result<Self, String> {
        let mut registry = Self::new();
        registry.register("help", "List commands", "", parse_help_command)?;
        registry.register("rooms", "Show all rooms by battle group", "", parse_rooms_command)?;
        registry.register("roster", "Show available players", "", parse_roster_command)?;
        registry.register(
            "search",
            "Filter roster by name",
            "<text...>",
            parse_search_command,
        )?;
        registry.register(
            "search_clear",
            "Clear the name filter",
            "",
            parse_search_clear_command,
        )?;
        registry.register(
            "filter",
            "Filter roster by resonance",
            "<all|3000|5000|7000|9000>",
            parse_filter_command,
        )?;
        registry.register(
            "select",
            "Select or deselect a player",
            "<player>",
            parse_select_command,
        )?;
        registry.register(
            "click_room",
            "Place the selected player in a room",
            "<room:1-12>",
            parse_click_room_command,
        )?;
        registry.register(
            "click_roster",
            "Return the selected player to the roster",
            "",
            parse_click_roster_command,
        )?;
        registry.register(
            "drag",
            "Drag a player onto a room, slot or the roster",
            "<player> <room[:slot]|roster>",
            parse_drag_command,
        )?;
        registry.register(
            "remove",
            "Return a player to the roster",
            "<player>",
            parse_remove_command,
        )?;
        registry.register("clear", "Return everyone to the roster", "", parse_clear_command)?;
        registry.register("token", "Print the current token", "", parse_token_command)?;
        registry.register("share", "Print the share URL", "", parse_share_command)?;
        registry.register("setup", "Print the battle setup text", "", parse_setup_command)?;
        registry.register("status", "Show session status", "", parse_status_command)?;
        registry.register(
            "clans",
            "Browse clans and their route indexes",
            "[--member] [query...]",
            parse_clans_command,
        )?;
        registry.register("quit", "Quit planner", "", parse_quit_command)?;
        Ok(registry)
    }

    pub(crate) fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<PlannerCommand, CommandParseError> + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name
            .insert(lower, self.specs.len() - 1);
        Ok(())
    }

    pub(crate) fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(&lower)?;
        self.specs.get(*index)
    }

    pub(crate) fn help_lines(&self) -> Vec<String> {
        self.specs
            .iter()
            .map(|spec| {
                if spec.arg_schema.is_empty() {
                    format!("{} - {}", spec.name, spec.help)
                } else {
                    format!("{} {} - {}", spec.name, spec.arg_schema, spec.help)
                }
            })
            .collect()
    }
}

pub(crate) fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            _ => {
                current.push(ch);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if pending {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_help_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(PlannerCommand::Help)
}

fn parse_rooms_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "rooms")?;
    Ok(PlannerCommand::Rooms)
}

fn parse_roster_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "roster")?;
    Ok(PlannerCommand::Roster)
}

fn parse_search_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError {
            reason: "missing required argument <text...>".to_string(),
            usage: "search <text...>".to_string(),
        });
    }
    Ok(PlannerCommand::Search {
        text: args.join(" "),
    })
}

fn parse_search_clear_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "search_clear")?;
    Ok(PlannerCommand::SearchClear)
}

fn parse_filter_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    let usage = "filter <all|3000|5000|7000|9000>";
    let [raw] = args else {
        return Err(CommandParseError {
            reason: "expected exactly one argument <level>".to_string(),
            usage: usage.to_string(),
        });
    };
    let level = raw.parse::<FilterLevel>().map_err(|reason| CommandParseError {
        reason,
        usage: usage.to_string(),
    })?;
    Ok(PlannerCommand::Filter { level })
}

fn parse_select_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    let player = single_player_arg(args, "select <player>")?;
    Ok(PlannerCommand::Select { player })
}

fn parse_click_room_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    let usage = "click_room <room>";
    let [raw] = args else {
        return Err(CommandParseError {
            reason: "expected exactly one argument <room>".to_string(),
            usage: usage.to_string(),
        });
    };
    let room_number = parse_number(raw, "room", usage)?;
    Ok(PlannerCommand::ClickRoom { room_number })
}

fn parse_click_roster_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "click_roster")?;
    Ok(PlannerCommand::ClickRoster)
}

fn parse_drag_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    let usage = "drag <player> <room[:slot]|roster>";
    let [player, raw_target] = args else {
        return Err(CommandParseError {
            reason: "expected <player> <room[:slot]|roster>".to_string(),
            usage: usage.to_string(),
        });
    };

    let target = if raw_target.eq_ignore_ascii_case("roster") {
        DragTarget::Roster
    } else {
        match raw_target.split_once(':') {
            Some((room, slot)) => DragTarget::Slot {
                room_number: parse_number(room, "room", usage)?,
                slot_number: parse_number(slot, "slot", usage)?,
            },
            None => DragTarget::Room {
                room_number: parse_number(raw_target, "room", usage)?,
            },
        }
    };

    Ok(PlannerCommand::Drag {
        player: player.clone(),
        target,
    })
}

fn parse_remove_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    let player = single_player_arg(args, "remove <player>")?;
    Ok(PlannerCommand::Remove { player })
}

fn parse_clear_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "clear")?;
    Ok(PlannerCommand::Clear)
}

fn parse_token_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "token")?;
    Ok(PlannerCommand::Token)
}

fn parse_share_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "share")?;
    Ok(PlannerCommand::Share)
}

fn parse_setup_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "setup")?;
    Ok(PlannerCommand::Setup)
}

fn parse_status_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "status")?;
    Ok(PlannerCommand::Status)
}

fn parse_clans_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    let (search, words) = match args.split_first() {
        Some((flag, rest)) if flag == "--member" => (ClanSearch::MemberName, rest),
        Some((flag, _)) if flag.starts_with("--") => {
            return Err(CommandParseError {
                reason: format!("unknown flag '{flag}'"),
                usage: "clans [--member] [query...]".to_string(),
            });
        }
        _ => (ClanSearch::ClanName, args),
    };
    Ok(PlannerCommand::Clans {
        query: words.join(" "),
        search,
    })
}

fn parse_quit_command(args: &[String]) -> Result<PlannerCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(PlannerCommand::Quit)
}

fn single_player_arg(args: &[String], usage: &str) -> Result<String, CommandParseError> {
    match args {
        [player] => Ok(player.clone()),
        _ => Err(CommandParseError {
            reason: "expected exactly one argument <player>".to_string(),
            usage: usage.to_string(),
        }),
    }
}

/// Parses a 1-based room or slot number.
fn parse_number(raw: &str, what: &str, usage: &str) -> Result<usize, CommandParseError> {
    match raw.parse::<usize>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(CommandParseError {
            reason: format!("invalid {what} '{raw}' (expected a number from 1)"),
            usage: usage.to_string(),
        }),
    }
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError {
            reason: "unexpected extra arguments".to_string(),
            usage: usage.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<PlannerCommand, CommandParseError> {
        let registry = CommandRegistry::with_planner_builtins().expect("registry");
        let tokens = tokenize_line(line).expect("tokens");
        let spec = registry.lookup(&tokens[0]).expect("known command");
        spec.parse(&tokens[1..])
    }

    #[test]
    fn help_lists_commands_in_registration_order() {
        let registry = CommandRegistry::with_planner_builtins().expect("registry");
        let lines = registry.help_lines();
        assert_eq!(lines[0], "help - List commands");
        assert_eq!(lines[3], "search <text...> - Filter roster by name");
        assert_eq!(
            lines[9],
            "drag <player> <room[:slot]|roster> - Drag a player onto a room, slot or the roster"
        );
        assert_eq!(lines.last().map(String::as_str), Some("quit - Quit planner"));
        assert_eq!(lines.len(), 18);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry
            .register("token", "a", "", parse_token_command)
            .expect("first");
        let err = registry
            .register("TOKEN", "b", "", parse_token_command)
            .expect_err("duplicate");
        assert_eq!(err, "duplicate command registration: TOKEN");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(parse("ROOMS"), Ok(PlannerCommand::Rooms));
    }

    #[test]
    fn drag_targets_parse() {
        assert_eq!(
            parse("drag 7 3"),
            Ok(PlannerCommand::Drag {
                player: "7".to_string(),
                target: DragTarget::Room { room_number: 3 },
            })
        );
        assert_eq!(
            parse("drag \"Big Olena\" 12:8"),
            Ok(PlannerCommand::Drag {
                player: "Big Olena".to_string(),
                target: DragTarget::Slot {
                    room_number: 12,
                    slot_number: 8,
                },
            })
        );
        assert_eq!(
            parse("drag enemy_1_0 Roster"),
            Ok(PlannerCommand::Drag {
                player: "enemy_1_0".to_string(),
                target: DragTarget::Roster,
            })
        );
    }

    #[test]
    fn bad_args_report_usage_hint() {
        let err = parse("drag 7 0").expect_err("room zero");
        assert_eq!(err.reason, "invalid room '0' (expected a number from 1)");
        assert_eq!(err.usage, "drag <player> <room[:slot]|roster>");

        let err = parse("filter 4000").expect_err("unsupported level");
        assert_eq!(err.usage, "filter <all|3000|5000|7000|9000>");

        let err = parse("token now").expect_err("extra args");
        assert_eq!(err.reason, "unexpected extra arguments");
    }

    #[test]
    fn search_joins_words_and_filter_parses_levels() {
        assert_eq!(
            parse("search big  olena"),
            Ok(PlannerCommand::Search {
                text: "big olena".to_string()
            })
        );
        assert_eq!(
            parse("filter 7000"),
            Ok(PlannerCommand::Filter {
                level: FilterLevel::AtLeast(7000)
            })
        );
    }

    #[test]
    fn clans_takes_optional_member_flag_and_query() {
        assert_eq!(
            parse("clans"),
            Ok(PlannerCommand::Clans {
                query: String::new(),
                search: ClanSearch::ClanName,
            })
        );
        assert_eq!(
            parse("clans --member big olena"),
            Ok(PlannerCommand::Clans {
                query: "big olena".to_string(),
                search: ClanSearch::MemberName,
            })
        );
        let err = parse("clans --rank 3").expect_err("unknown flag");
        assert_eq!(err.reason, "unknown flag '--rank'");
    }

    #[test]
    fn tokenizer_handles_quotes_and_errors() {
        assert_eq!(
            tokenize_line("select \"Big Olena\"").expect("tokens"),
            vec!["select", "Big Olena"]
        );
        assert_eq!(tokenize_line("search \"\"").expect("tokens"), vec!["search", ""]);
        assert!(tokenize_line("select \"oops").is_err());
    }
}
