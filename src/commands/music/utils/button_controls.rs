use poise::serenity_prelude as serenity;
use serenity::all::{
    ButtonStyle, CreateActionRow, CreateButton, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption, ReactionType,
};

use super::menus::{PageAction, PagedMenu};
use super::{format_duration, limit_text};

pub const CLEAR_QUEUE_ID: &str = "music_clear_queue";
pub const SELECT_SONG_ID: &str = "music_select_song";

fn page_emoji(action: PageAction) -> &'static str {
    match action {
        PageAction::First => "⏮️",
        PageAction::Prev => "◀️",
        PageAction::Middle => "↔️",
        PageAction::Next => "▶️",
        PageAction::Last => "⏭️",
    }
}

/// Creates the row of page buttons for a menu
pub fn create_page_buttons(menu: &PagedMenu) -> CreateActionRow {
    let buttons = PageAction::ALL
        .into_iter()
        .filter(|action| *action != PageAction::Middle || menu.has_middle())
        .map(|action| {
            CreateButton::new(action.custom_id())
                .emoji(ReactionType::Unicode(page_emoji(action).to_string()))
                .style(ButtonStyle::Secondary)
                .disabled(menu.is_disabled(action))
        })
        .collect();

    CreateActionRow::Buttons(buttons)
}

/// Creates the "Clear Queue" button shown under the queue
pub fn create_clear_queue_button() -> CreateActionRow {
    let clear = CreateButton::new(CLEAR_QUEUE_ID)
        .emoji(ReactionType::Unicode("❌".to_string()))
        .style(ButtonStyle::Secondary)
        .label("Clear Queue");

    CreateActionRow::Buttons(vec![clear])
}

/// Creates the song picker for the current page of a search menu.
/// Option values are indices into the whole result list.
pub fn create_song_select(menu: &PagedMenu) -> CreateActionRow {
    let options = menu
        .page_range()
        .zip(menu.page_tracks())
        .map(|(index, track)| {
            CreateSelectMenuOption::new(
                format!(
                    "{} ({})",
                    limit_text(&track.title, 30),
                    format_duration(track.duration())
                ),
                index.to_string(),
            )
            .description(format!("by {}", limit_text(&track.artist, 50)))
        })
        .collect();

    CreateActionRow::SelectMenu(
        CreateSelectMenu::new(SELECT_SONG_ID, CreateSelectMenuKind::String { options })
            .placeholder("Select a song..."),
    )
}
