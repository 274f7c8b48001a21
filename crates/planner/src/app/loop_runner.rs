use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use tracing::{error, info};
use warroom::{JsonFileDirectory, LoadState, Session};

use super::bootstrap::AppWiring;
use super::console::PlannerConsole;
use super::render;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match run_with_io(app, stdin.lock(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "planner_failed");
            ExitCode::FAILURE
        }
    }
}

/// Drives one session from line input until `quit` or end of input. Nothing
/// is interactive until the directory has loaded.
fn run_with_io<R: BufRead, W: Write>(app: AppWiring, input: R, out: &mut W) -> Result<(), String> {
    let console = PlannerConsole::new(app.config.share_base.clone())?;
    emit(out, &render::load_state_line(&LoadState::Loading))?;

    let source = JsonFileDirectory::new(app.config.directory_file.clone());
    let mut session = match Session::initialize(&source, app.route, app.bridge) {
        Ok(session) => session,
        Err(err) => {
            let state = LoadState::Failed {
                reason: err.to_string(),
            };
            emit(out, &render::load_state_line(&state))?;
            return Err(err.to_string());
        }
    };

    let state = LoadState::Loaded {
        member_count: session.directory().len(),
    };
    emit(out, &render::load_state_line(&state))?;
    emit(out, &format!("title: {}", session.title()))?;
    emit(out, &render::token_line(&session.token()))?;

    for line in input.lines() {
        let line = line.map_err(|err| format!("failed to read input: {err}"))?;
        let outcome = console.process_line(&mut session, &line);
        for output in &outcome.lines {
            emit(out, output)?;
        }
        if outcome.quit {
            break;
        }
    }

    info!(token = %session.token(), "planner_exit");
    Ok(())
}

fn emit<W: Write>(out: &mut W, line: &str) -> Result<(), String> {
    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(|err| format!("failed to write output: {err}"))
}
