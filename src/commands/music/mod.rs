pub(crate) mod clear;
pub(crate) mod join;
pub(crate) mod leave;
pub(crate) mod pause;
pub(crate) mod play;
pub(crate) mod queue;
pub(crate) mod remove;
pub(crate) mod resume;
pub(crate) mod search;
pub(crate) mod shuffle;
pub(crate) mod skip;
pub(crate) mod stop;

pub mod audio_sources;
pub mod utils;

use poise::CreateReply;
use poise::serenity_prelude as serenity;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::debug;

use crate::{CommandResult, Context, Data, Error};
use self::audio_sources::Track;
use self::utils::embedded_messages;
use self::utils::guild_session::{EnqueueOutcome, GuildSession};
use self::utils::music_manager::{MusicError, MusicManager};
use self::utils::voice_session::JoinOutcome;

/// Every music slash command
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        play::play(),
        search::search(),
        pause::pause(),
        resume::resume(),
        stop::stop(),
        skip::skip(),
        shuffle::shuffle(),
        queue::queue(),
        remove::remove(),
        clear::clear_from_queue(),
        clear::clear_queue(),
        join::join(),
        leave::leave(),
    ]
}

/// The session of the guild the command was used in.
fn guild_session(ctx: Context<'_>) -> Result<Arc<GuildSession>, Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    Ok(ctx.data().music.session(guild_id))
}

/// The caller's guild and voice channel. Replies and returns `None` when
/// the caller is not in a voice channel.
async fn require_voice(ctx: Context<'_>) -> Result<Option<(GuildId, ChannelId)>, Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    match MusicManager::get_user_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id)
    {
        Ok(channel_id) => Ok(Some((guild_id, channel_id))),
        Err(err) => {
            debug!("{} is not in voice: {}", ctx.author().name, err);
            ctx.send(embedded_messages::user_not_in_voice_channel())
                .await?;
            Ok(None)
        }
    }
}

/// Joins `channel_id` and plays `track`, or queues it when something is already playing.
pub(crate) async fn play_track(
    session: &Arc<GuildSession>,
    channel_id: ChannelId,
    track: Track,
    show_provider: bool,
) -> CreateReply {
    if let JoinOutcome::Failed(err) = session.join_voice(channel_id).await {
        return embedded_messages::failed_to_join_voice_channel(&err);
    }

    match session.enqueue_or_play(track.clone()).await {
        EnqueueOutcome::Played => embedded_messages::now_playing(&track, show_provider),
        EnqueueOutcome::Queued { position } => {
            let plays_in = session.snapshot().await.time_until(position - 1);
            embedded_messages::added_to_queue(&track, position, plays_in, show_provider)
        }
        EnqueueOutcome::Failed => embedded_messages::failed_to_play(&track),
    }
}

/// Replies with a plain confirmation
async fn confirm(ctx: Context<'_>, title: &str, description: impl Into<String>) -> CommandResult {
    ctx.send(embedded_messages::success(title, description))
        .await?;
    Ok(())
}
