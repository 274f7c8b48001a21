use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use hashtool::{resolve_home_clan_id, run, CommandKind, HOME_CLAN_ENV_VAR};

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let Some((command, command_args)) = args.split_first() else {
        return Err(usage_text());
    };

    let kind = match command.as_str() {
        "-h" | "--help" => {
            print_usage();
            return Ok(());
        }
        "inspect" => {
            let [token] = command_args else {
                return Err("inspect requires exactly one token or share URL".to_string());
            };
            CommandKind::Inspect {
                token: token.clone(),
            }
        }
        "pack" => {
            if command_args.is_empty() {
                return Err("pack requires at least one <room>:<slot>:<player>".to_string());
            }
            CommandKind::Pack {
                placements: command_args.to_vec(),
            }
        }
        "setup" => parse_setup_args(command_args)?,
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    run(kind, &mut io::stdout(), &mut io::stderr())
}

fn parse_setup_args(args: &[String]) -> Result<CommandKind, String> {
    let mut positional = Vec::new();
    let mut clan_index = None;
    let mut home_flag = None;
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--clan" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --clan".to_string())?;
                let parsed = value
                    .parse::<usize>()
                    .ok()
                    .filter(|parsed| *parsed > 0)
                    .ok_or_else(|| format!("invalid --clan value '{value}' (expected 1 or more)"))?;
                clan_index = Some(parsed);
                index += 2;
            }
            "--home" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --home".to_string())?;
                home_flag = Some(value.clone());
                index += 2;
            }
            other => {
                positional.push(other.to_string());
                index += 1;
            }
        }
    }

    let [directory, token] = positional.as_slice() else {
        return Err("setup requires <directory.json> and <token>".to_string());
    };
    Ok(CommandKind::Setup {
        directory: PathBuf::from(directory),
        clan_index,
        home_clan_id: resolve_home_clan_id(home_flag, env::var(HOME_CLAN_ENV_VAR).ok()),
        token: token.clone(),
    })
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "hashtool - inspect and build room assignment tokens",
        "",
        "Usage:",
        "  hashtool inspect <token|share-url>",
        "  hashtool pack <room>:<slot>:<player>...",
        "  hashtool setup <directory.json> [--clan <index>] [--home <clan-id>] <token|share-url>",
        "",
        "Rooms are 1-12, slots 1-8, players 1-100.",
        "Without --clan, setup uses the home clan roster: --home, else WARROOM_HOME_CLAN,",
        "else the built-in home clan.",
    ]
    .join("\n")
}
