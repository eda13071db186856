use super::*;

/// Stop playback and leave the voice channel. The queue is kept.
#[poise::command(slash_command, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    if require_voice(ctx).await?.is_none() {
        return Ok(());
    }

    let session = guild_session(ctx)?;
    session.stop().await;
    if session.leave_voice().await {
        confirm(ctx, "👋 Left Voice Channel", "I left the voice channel.").await
    } else {
        ctx.send(embedded_messages::error("I'm not in a voice channel."))
            .await?;
        Ok(())
    }
}
