use super::*;

/// Pause the current track
#[poise::command(slash_command, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    if require_voice(ctx).await?.is_none() {
        return Ok(());
    }

    let session = guild_session(ctx)?;
    if session.pause().await {
        confirm(ctx, "⏸️ Paused", "Playback paused.").await
    } else {
        ctx.send(embedded_messages::error("No track is currently playing."))
            .await?;
        Ok(())
    }
}
