use tracing::debug;
use warroom::{
    battle_setup_text, list_clans_view, share_url, DropTarget, EntityId, Gesture,
    GestureResult, Session,
};

use super::commands::{tokenize_line, CommandRegistry, DragTarget, PlannerCommand};
use super::render;

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct LineOutcome {
    pub(crate) lines: Vec<String>,
    pub(crate) quit: bool,
}

impl LineOutcome {
    fn lines(lines: Vec<String>) -> Self {
        Self { lines, quit: false }
    }

    fn line(line: String) -> Self {
        Self::lines(vec![line])
    }
}

/// Turns typed lines into gestures against one session.
pub(crate) struct PlannerConsole {
    registry: CommandRegistry,
    share_base: String,
}

impl PlannerConsole {
    pub(crate) fn new(share_base: impl Into<String>) -> Result<Self, String> {
        Ok(Self {
            registry: CommandRegistry::with_planner_builtins()?,
            share_base: share_base.into(),
        })
    }

    pub(crate) fn process_line(&self, session: &mut Session, raw_line: &str) -> LineOutcome {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            return LineOutcome::default();
        }

        let tokens = match tokenize_line(trimmed) {
            Ok(tokens) => tokens,
            Err(reason) => return LineOutcome::line(format!("error: {reason}. usage: help")),
        };
        let Some((command_name, args)) = tokens.split_first() else {
            return LineOutcome::default();
        };
        let Some(spec) = self.registry.lookup(command_name) else {
            return LineOutcome::line(format!(
                "error: unknown command '{command_name}'. try: help"
            ));
        };

        match spec.parse(args) {
            Ok(command) => {
                debug!(command = ?command, "planner_command");
                self.execute(session, command)
            }
            Err(error) => LineOutcome::line(format!(
                "error: {}. usage: {}",
                error.reason, error.usage
            )),
        }
    }

    fn execute(&self, session: &mut Session, command: PlannerCommand) -> LineOutcome {
        match command {
            PlannerCommand::Help => LineOutcome::lines(self.registry.help_lines()),
            PlannerCommand::Rooms => LineOutcome::lines(render::room_lines(session.store().grid())),
            PlannerCommand::Roster => LineOutcome::lines(render::roster_lines(session)),
            PlannerCommand::Search { text } => {
                session.filter_mut().search = text;
                LineOutcome::lines(render::roster_lines(session))
            }
            PlannerCommand::SearchClear => {
                session.filter_mut().search.clear();
                LineOutcome::lines(render::roster_lines(session))
            }
            PlannerCommand::Filter { level } => {
                session.filter_mut().level = level;
                LineOutcome::lines(render::roster_lines(session))
            }
            PlannerCommand::Select { player } => {
                let Some(id) = resolve_player(session, &player) else {
                    return unknown_player(&player);
                };
                session.apply(Gesture::ClickEntity(id));
                LineOutcome::line(render::selection_line(session))
            }
            PlannerCommand::ClickRoom { room_number } => {
                let result = session.apply(Gesture::ClickRoom {
                    room_index: room_number - 1,
                });
                gesture_outcome(session, result)
            }
            PlannerCommand::ClickRoster => {
                let result = session.apply(Gesture::ClickRoster);
                gesture_outcome(session, result)
            }
            PlannerCommand::Drag { player, target } => {
                let Some(id) = resolve_player(session, &player) else {
                    return unknown_player(&player);
                };
                let destination = match target {
                    DragTarget::Room { room_number } => DropTarget::Room {
                        room_index: room_number - 1,
                    },
                    DragTarget::Slot {
                        room_number,
                        slot_number,
                    } => DropTarget::Slot {
                        room_index: room_number - 1,
                        slot_index: slot_number - 1,
                    },
                    DragTarget::Roster => DropTarget::Roster,
                };
                let result = session.apply(Gesture::Drop {
                    entity: id,
                    destination: Some(destination),
                });
                gesture_outcome(session, result)
            }
            PlannerCommand::Remove { player } => {
                let Some(id) = resolve_player(session, &player) else {
                    return unknown_player(&player);
                };
                let result = session.remove(&id);
                gesture_outcome(session, result)
            }
            PlannerCommand::Clear => {
                let result = session.clear_all();
                gesture_outcome(session, result)
            }
            PlannerCommand::Token => LineOutcome::line(render::token_line(&session.token())),
            PlannerCommand::Share => LineOutcome::line(format!(
                "share: {}",
                share_url(
                    &self.share_base,
                    session.route().clan_index(),
                    &session.token()
                )
            )),
            PlannerCommand::Setup => LineOutcome::lines(
                battle_setup_text(session.store().grid())
                    .lines()
                    .map(ToString::to_string)
                    .collect(),
            ),
            PlannerCommand::Status => LineOutcome::lines(render::status_lines(session)),
            PlannerCommand::Clans { query, search } => LineOutcome::lines(render::clan_lines(
                &list_clans_view(session.clans(), &query, search),
            )),
            PlannerCommand::Quit => LineOutcome {
                lines: vec!["bye".to_string()],
                quit: true,
            },
        }
    }
}

fn resolve_player(session: &Session, reference: &str) -> Option<EntityId> {
    session
        .directory()
        .resolve(reference)
        .map(|entity| entity.id.clone())
}

fn unknown_player(reference: &str) -> LineOutcome {
    LineOutcome::line(format!("error: unknown player '{reference}'"))
}

fn gesture_outcome(session: &Session, result: GestureResult) -> LineOutcome {
    let mut lines = Vec::new();
    if let Some(notice) = &result.notice {
        lines.push(render::notice_line(notice));
    }
    match result.sync {
        Some(report) => {
            lines.push(render::token_line(&session.token()));
            if !report.storage_ok {
                lines.push("warning: token was not saved".to_string());
            }
        }
        None if result.notice.is_none() => lines.push("unchanged".to_string()),
        None => {}
    }
    LineOutcome::lines(lines)
}
