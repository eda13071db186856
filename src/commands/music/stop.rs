use super::*;

/// Stop playback, optionally leaving the voice channel. The queue is kept.
#[poise::command(slash_command, category = "Music")]
pub async fn stop(
    ctx: Context<'_>,
    #[description = "Also leave the voice channel"]
    #[rename = "leave-voice"]
    leave_voice: Option<bool>,
) -> CommandResult {
    if require_voice(ctx).await?.is_none() {
        return Ok(());
    }

    let session = guild_session(ctx)?;
    session.stop().await;
    if leave_voice.unwrap_or(false) {
        session.leave_voice().await;
    }

    confirm(ctx, "⏹️ Stopped", "Playback stopped.").await
}
