use super::*;
use super::serenity::Mentionable;
use super::serenity::model::channel::{ChannelType, GuildChannel};

/// Join your voice channel, or the given one
#[poise::command(slash_command, category = "Music")]
pub async fn join(
    ctx: Context<'_>,
    #[description = "Voice channel to join instead of yours"]
    #[channel_types("Voice")]
    channel: Option<GuildChannel>,
) -> CommandResult {
    let (channel_id, name) = match channel {
        Some(channel) if channel.kind != ChannelType::Voice => {
            ctx.send(embedded_messages::error("I can only join voice channels."))
                .await?;
            return Ok(());
        }
        Some(channel) => (channel.id, channel.name),
        None => {
            let Some((_, channel_id)) = require_voice(ctx).await? else {
                return Ok(());
            };
            (channel_id, channel_id.mention().to_string())
        }
    };

    let session = guild_session(ctx)?;
    match session.join_voice(channel_id).await {
        JoinOutcome::Joined | JoinOutcome::AlreadyConnected => {
            confirm(
                ctx,
                "🔊 Joined",
                format!("I joined the voice channel: {}", name),
            )
            .await
        }
        JoinOutcome::Failed(err) => {
            ctx.send(embedded_messages::failed_to_join_voice_channel(&err))
                .await?;
            Ok(())
        }
    }
}
