use poise::serenity_prelude::{self as serenity, Context};
use serenity::all::{
    ComponentInteraction, ComponentInteractionDataKind, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::button_controls::{CLEAR_QUEUE_ID, SELECT_SONG_ID};
use super::embedded_messages::{self, menu_view};
use super::guild_session::GuildSession;
use super::menus::PageAction;
use super::music_manager::MusicManager;
use crate::commands::music::play_track;
use crate::utils::config::Config;

type ButtonInteractionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Handle a component interaction on one of the music menus
pub async fn handle_interaction(
    ctx: &Context,
    interaction: &ComponentInteraction,
    music: &MusicManager,
    config: &Config,
) -> ButtonInteractionResult {
    let guild_id = interaction.guild_id.ok_or("Not in a guild")?;
    let session = music.session(guild_id);
    let custom_id = interaction.data.custom_id.as_str();

    if custom_id == SELECT_SONG_ID {
        return handle_song_select(ctx, interaction, &session, config).await;
    }
    if custom_id == CLEAR_QUEUE_ID {
        return handle_clear_queue(ctx, interaction, &session).await;
    }
    if let Some(action) = PageAction::from_custom_id(custom_id) {
        return handle_page(ctx, interaction, &session, action, config).await;
    }

    error!("Unknown component ID: {}", custom_id);
    error_response(ctx, interaction, "Unknown button action.").await
}

/// Moves a menu to another page and re-renders it in place
async fn handle_page(
    ctx: &Context,
    interaction: &ComponentInteraction,
    session: &GuildSession,
    action: PageAction,
    config: &Config,
) -> ButtonInteractionResult {
    let view = session
        .menus()
        .get_mut(&interaction.message.id)
        .map(|mut menu| {
            menu.apply(action);
            debug!("Menu {} moved to page {}", interaction.message.id, menu.page() + 1);
            menu_view(&menu, config.show_provider)
        });
    let Some(view) = view else {
        return error_response(ctx, interaction, "This menu is no longer available.").await;
    };

    interaction
        .create_response(
            ctx,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content(view.content)
                    .embed(view.embed)
                    .components(view.components),
            ),
        )
        .await?;
    Ok(())
}

async fn handle_clear_queue(
    ctx: &Context,
    interaction: &ComponentInteraction,
    session: &GuildSession,
) -> ButtonInteractionResult {
    let removed = session.clear_queue().await;
    session.menus().remove(&interaction.message.id);
    info!(
        "Cleared {} tracks from the queue of guild {} via button",
        removed,
        session.guild_id()
    );

    interaction
        .create_response(
            ctx,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content("The queue has been cleared.")
                    .embeds(Vec::new())
                    .components(Vec::new()),
            ),
        )
        .await?;
    Ok(())
}

/// Plays the song picked from a search menu
async fn handle_song_select(
    ctx: &Context,
    interaction: &ComponentInteraction,
    session: &Arc<GuildSession>,
    config: &Config,
) -> ButtonInteractionResult {
    let index = match &interaction.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => {
            values.first().and_then(|value| value.parse::<usize>().ok())
        }
        _ => None,
    };
    let track = index.and_then(|index| {
        session
            .menus()
            .get(&interaction.message.id)
            .and_then(|menu| menu.track(index).cloned())
    });
    let Some(track) = track else {
        return error_response(ctx, interaction, "That song is no longer available.").await;
    };

    let channel_id =
        match MusicManager::get_user_voice_channel(ctx, session.guild_id(), interaction.user.id) {
            Ok(channel_id) => channel_id,
            Err(_) => {
                return error_response(ctx, interaction, "You need to join a voice channel first!")
                    .await;
            }
        };

    // Resolving the stream can take longer than Discord waits for a response
    interaction.defer(ctx).await?;

    let reply = play_track(session, channel_id, track, config.show_provider).await;
    interaction
        .create_followup(
            ctx,
            reply.to_slash_followup_response(CreateInteractionResponseFollowup::new()),
        )
        .await?;
    Ok(())
}

/// Answers the interaction with an ephemeral error embed
async fn error_response(
    ctx: &Context,
    interaction: &ComponentInteraction,
    message: &str,
) -> ButtonInteractionResult {
    let reply = embedded_messages::error(message).ephemeral(true);
    interaction
        .create_response(
            ctx,
            CreateInteractionResponse::Message(
                reply.to_slash_initial_response(CreateInteractionResponseMessage::new()),
            ),
        )
        .await?;
    Ok(())
}
