use super::*;
use super::utils::guild_session::{ResumeOutcome, SkipOutcome};

/// Continue a paused track, or start the queue
#[poise::command(slash_command, rename = "continue", category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    if require_voice(ctx).await?.is_none() {
        return Ok(());
    }

    ctx.defer().await?;

    let show_provider = ctx.data().config.show_provider;
    let session = guild_session(ctx)?;
    match session.resume().await {
        ResumeOutcome::Resumed => confirm(ctx, "▶️ Resumed", "Playback continued.").await,
        ResumeOutcome::AlreadyPlaying => {
            confirm(ctx, "▶️ Playing", "Playback is already running.").await
        }
        ResumeOutcome::Skipped(SkipOutcome::Played(track)) => {
            ctx.send(embedded_messages::now_playing(&track, show_provider))
                .await?;
            Ok(())
        }
        ResumeOutcome::Skipped(SkipOutcome::Empty) => {
            ctx.send(embedded_messages::queue_is_empty()).await?;
            Ok(())
        }
        ResumeOutcome::Skipped(SkipOutcome::Failed(track)) => {
            ctx.send(embedded_messages::failed_to_play(&track)).await?;
            Ok(())
        }
    }
}
