use warroom::grid::{display_room_number, room_label, TOTAL_SLOTS};
use warroom::views::sorted_room;
use warroom::{
    ClanListing, ClansView, Grid, LoadState, Notice, Selection, Session, ROOMS, SLOTS_PER_ROOM,
};

pub(crate) fn load_state_line(state: &LoadState) -> String {
    match state {
        LoadState::Loading => "status: loading".to_string(),
        LoadState::Failed { reason } => format!("status: failed - {reason}"),
        LoadState::Loaded { member_count } => format!("status: loaded - {member_count} members"),
    }
}

pub(crate) fn notice_line(notice: &Notice) -> String {
    format!("notice: {} - {}", notice.title, notice.description)
}

pub(crate) fn token_line(token: &str) -> String {
    if token.is_empty() {
        "token: (empty)".to_string()
    } else {
        format!("token: {token}")
    }
}

/// Rooms grouped by battle group, occupants strongest first.
pub(crate) fn room_lines(grid: &Grid) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_label = None;
    for room_number in 1..=ROOMS {
        let label = room_label(room_number);
        if current_label != Some(label) {
            lines.push(format!("[{label}]"));
            current_label = Some(label);
        }
        let room_index = room_number - 1;
        let names = sorted_room(grid, room_index)
            .into_iter()
            .flatten()
            .map(|entity| format!("{} ({})", entity.name, entity.resonance))
            .collect::<Vec<_>>();
        let occupants = if names.is_empty() {
            "-".to_string()
        } else {
            names.join(", ")
        };
        lines.push(format!(
            "  room {room_number} #[{}] {}/{SLOTS_PER_ROOM}: {occupants}",
            display_room_number(room_number).unwrap_or(room_number),
            grid.room_occupancy(room_index),
        ));
    }
    lines
}

pub(crate) fn roster_lines(session: &Session) -> Vec<String> {
    let filter = session.filter();
    let available = session.available_members();
    let selected = match session.selection() {
        Selection::Selected(id) => Some(id),
        Selection::Idle => None,
    };

    let mut lines = vec![format!(
        "roster: {} {}/{} available (filter {}, search \"{}\")",
        session.title(),
        available.len(),
        session.directory().len(),
        filter.level,
        filter.search,
    )];
    lines.extend(available.iter().map(|entity| {
        let marker = if selected == Some(&entity.id) { " *" } else { "" };
        format!(
            "  #{} {} {}{marker}",
            entity.player_number, entity.name, entity.resonance
        )
    }));
    lines
}

pub(crate) fn selection_line(session: &Session) -> String {
    match session.selection() {
        Selection::Idle => "selection: none".to_string(),
        Selection::Selected(id) => {
            let name = session
                .directory()
                .by_id(id)
                .map(|entity| entity.name.as_str())
                .unwrap_or(id.as_str());
            format!("selection: {name}")
        }
    }
}

pub(crate) fn status_lines(session: &Session) -> Vec<String> {
    vec![
        format!("status: loaded - {}", session.title()),
        format!("members: {}", session.directory().len()),
        format!(
            "placed: {}/{TOTAL_SLOTS}",
            session.store().grid().occupied_count()
        ),
        selection_line(session),
        format!("location: {}", session.bridge().address().href()),
        token_line(&session.token()),
    ]
}

pub(crate) fn clan_lines(view: &ClansView<'_>) -> Vec<String> {
    let mut lines = vec!["immortal clans:".to_string()];
    lines.extend(clan_section(&view.immortal));
    lines.push("shadow clans:".to_string());
    lines.extend(clan_section(&view.shadow));
    lines
}

fn clan_section(listings: &[ClanListing<'_>]) -> Vec<String> {
    if listings.is_empty() {
        return vec!["  (none)".to_string()];
    }
    listings
        .iter()
        .map(|listing| {
            let clan = listing.clan;
            let rank = if clan.rank == 0 {
                "N/A".to_string()
            } else {
                clan.rank.to_string()
            };
            let details = format!("rank {rank}, {} members", clan.members.len());
            match listing.route_index {
                Some(route) => format!(
                    "  route {route}: {} (immortal rank {}, {details})",
                    clan.name, clan.immortal_rank
                ),
                None => format!("  {} ({details})", clan.name),
            }
        })
        .collect()
}
