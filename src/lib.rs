//! Discord bot that plays music from one or more Subsonic servers into guild voice channels.

pub mod commands;
pub mod events;
pub mod utils;

use poise::serenity_prelude as serenity;
use std::sync::Arc;

use commands::music::utils::music_manager::MusicManager;
use utils::config::Config;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub music: Arc<MusicManager>,
    pub config: Arc<Config>,
}

/// Gateway intents of the bot. Slash commands and components need no message
/// content; `register` still works when the bot is mentioned.
pub fn gateway_intents() -> serenity::GatewayIntents {
    serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_VOICE_STATES
}

#[poise::command(slash_command, category = "General")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}
