use super::*;
use super::utils::guild_session::SkipOutcome;

/// Skip the current track and play the next one in the queue
#[poise::command(slash_command, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    if require_voice(ctx).await?.is_none() {
        return Ok(());
    }

    let session = guild_session(ctx)?;
    let snapshot = session.snapshot().await;
    if snapshot.current.is_none() && snapshot.queue.is_empty() {
        ctx.send(embedded_messages::error(
            "Cannot skip, there is no song playing and the queue is empty.",
        ))
        .await?;
        return Ok(());
    }

    ctx.defer().await?;

    match session.skip().await {
        SkipOutcome::Played(track) => {
            let show_provider = ctx.data().config.show_provider;
            ctx.send(embedded_messages::now_playing(&track, show_provider))
                .await?;
            Ok(())
        }
        SkipOutcome::Empty => {
            confirm(ctx, "⏭️ Skipped", "Song skipped. The queue is empty now.").await
        }
        SkipOutcome::Failed(track) => {
            ctx.send(embedded_messages::failed_to_play(&track)).await?;
            Ok(())
        }
    }
}
