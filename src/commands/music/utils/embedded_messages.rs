use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{CreateActionRow, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};
use std::time::Duration;

use super::button_controls::{create_clear_queue_button, create_page_buttons, create_song_select};
use super::menus::{MenuKind, PagedMenu};
use super::music_manager::MusicError;
use super::{format_duration, limit_text};
use crate::commands::music::audio_sources::Track;

const GREEN: u32 = 0x00ff00;
const YELLOW: u32 = 0xffd700;
const RED: u32 = 0xff0000;

/// Discord rejects empty field names.
const BLANK: &str = "\u{200b}";

fn secs(secs: u64) -> String {
    format_duration(Duration::from_secs(secs))
}

/// The field describing one track. `position` and `plays_in` only show for queue entries.
fn track_field(
    track: &Track,
    position: Option<usize>,
    plays_in: Option<u64>,
    show_provider: bool,
) -> (String, String, bool) {
    let position = position.map(|p| format!("**{}.** ", p)).unwrap_or_default();
    let mut value = format!(
        "{}**{}** | {}\n*{}* | *{}*",
        position,
        limit_text(&track.title, 40),
        format_duration(track.duration()),
        limit_text(&track.album, 30),
        limit_text(&track.artist, 30)
    );

    let mut extras = Vec::new();
    if show_provider {
        extras.push(format!("Provider: `{}`", track.backend));
    }
    if let Some(plays_in) = plays_in.filter(|secs| *secs > 0) {
        extras.push(format!("Plays in `{}`", secs(plays_in)));
    }
    if !extras.is_empty() {
        value.push('\n');
        value.push_str(&extras.join(" | "));
    }

    (BLANK.to_string(), value, false)
}

/// Create an embed for when a song starts playing
pub fn now_playing(track: &Track, show_provider: bool) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .author(CreateEmbedAuthor::new("Now playing:"))
            .fields([track_field(track, None, None, show_provider)])
            .color(GREEN),
    )
}

/// Create an embed for when a song is added to the queue
pub fn added_to_queue(
    track: &Track,
    position: usize,
    plays_in: u64,
    show_provider: bool,
) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .author(CreateEmbedAuthor::new("Added to queue:"))
            .fields([track_field(
                track,
                Some(position),
                Some(plays_in),
                show_provider,
            )])
            .color(YELLOW),
    )
}

/// A paginated menu, rendered for the page it is on.
pub struct MenuView {
    pub content: String,
    pub embed: CreateEmbed,
    pub components: Vec<CreateActionRow>,
}

impl MenuView {
    pub fn into_reply(self) -> CreateReply {
        CreateReply::default()
            .content(self.content)
            .embed(self.embed)
            .components(self.components)
    }
}

pub fn menu_view(menu: &PagedMenu, show_provider: bool) -> MenuView {
    let count = menu.tracks().len();
    let footer = |what: String| {
        CreateEmbedFooter::new(format!(
            "Page {} of {} | {}",
            menu.page() + 1,
            menu.page_count(),
            what
        ))
    };

    match &menu.kind {
        MenuKind::Search { query } => {
            let fields = menu
                .page_tracks()
                .iter()
                .map(|track| track_field(track, None, None, show_provider));

            MenuView {
                content: String::new(),
                embed: CreateEmbed::new()
                    .title(format!("Results for: {}", query))
                    .fields(fields)
                    .footer(footer(format!("{} results", count)))
                    .color(GREEN),
                components: vec![create_page_buttons(menu), create_song_select(menu)],
            }
        }
        MenuKind::Queue { .. } => {
            let fields = menu.page_range().zip(menu.page_tracks()).map(|(index, track)| {
                track_field(
                    track,
                    Some(index + 1),
                    menu.time_until(index),
                    show_provider,
                )
            });
            let total = menu.time_until(count).unwrap_or_default();
            let songs = if count == 1 { "song" } else { "songs" };

            MenuView {
                content: format!(
                    "There {} `{} {}` in the queue.\nTotal duration: `{}`.",
                    if count == 1 { "is" } else { "are" },
                    count,
                    songs,
                    secs(total)
                ),
                embed: CreateEmbed::new()
                    .title("Queue")
                    .fields(fields)
                    .footer(footer(format!("{} {} in queue", count, songs)))
                    .color(GREEN),
                components: vec![create_page_buttons(menu), create_clear_queue_button()],
            }
        }
    }
}

/// A green confirmation embed
pub fn success(title: &str, description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(description)
            .color(GREEN),
    )
}

/// A red error embed
pub fn error(description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("❌ Error")
            .description(description)
            .color(RED),
    )
}

/// Create an embed for when a user is not connected to a voice channel
pub fn user_not_in_voice_channel() -> CreateReply {
    error("You need to join a voice channel first!").ephemeral(true)
}

/// Create an embed for when the bot fails to join a voice channel
pub fn failed_to_join_voice_channel(err: &MusicError) -> CreateReply {
    error(format!("Failed to join voice channel: {}", err))
}

pub fn no_results(query: &str) -> CreateReply {
    error(format!("Could not find any songs for: `{}`", query))
}

pub fn failed_to_play(track: &Track) -> CreateReply {
    error(format!(
        "Could not play **{}**. The server did not provide a stream.",
        track.title
    ))
}

pub fn queue_is_empty() -> CreateReply {
    error("The queue is empty.")
}

/// "N songs left in the queue." style suffix.
pub fn queue_left_text(count: usize) -> String {
    match count {
        0 => "The queue is empty now.".to_string(),
        1 => "There is 1 song left in the queue.".to_string(),
        n => format!("There are {} songs left in the queue.", n),
    }
}
