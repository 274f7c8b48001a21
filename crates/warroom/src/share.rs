use crate::grid::{Grid, BATTLE_GROUPS, SLOTS_PER_ROOM};
use crate::views::sorted_room;

pub const DEFAULT_SHARE_BASE: &str = "https://imbaw.com/diablo";

pub fn share_url(base: &str, clan_index: Option<usize>, token: &str) -> String {
    let base = base.trim_end_matches('/');
    let mut url = match clan_index {
        Some(index) => format!("{base}/{index}"),
        None => base.to_string(),
    };
    if !token.is_empty() {
        url.push('#');
        url.push_str(token);
    }
    url
}

/// Plain-text roster in the in-game chat layout: one block per battle group,
/// one `#[n]` header per room, strongest member first.
pub fn battle_setup_text(grid: &Grid) -> String {
    let mut text = String::new();
    for group in &BATTLE_GROUPS {
        text.push_str(group.label);
        text.push_str("\n\n");
        for (position, room_number) in group.room_numbers.iter().enumerate() {
            text.push_str(&format!("#[{}]\n", position + 1));
            for (slot, occupant) in sorted_room(grid, room_number - 1).iter().enumerate() {
                let Some(entity) = occupant else {
                    continue;
                };
                if slot + 1 < SLOTS_PER_ROOM {
                    text.push_str(&format!("{} |\n", entity.name));
                } else {
                    text.push_str(&format!("{}\n", entity.name));
                }
            }
            text.push('\n');
        }
        text.push('\n');
    }
    text.trim().to_string()
}
