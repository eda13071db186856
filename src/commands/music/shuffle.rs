use super::*;

/// Shuffle the queue
#[poise::command(slash_command, category = "Music")]
pub async fn shuffle(ctx: Context<'_>) -> CommandResult {
    let session = guild_session(ctx)?;
    if session.shuffle_queue().await == 0 {
        ctx.send(embedded_messages::queue_is_empty()).await?;
        return Ok(());
    }

    confirm(ctx, "🔀 Shuffled", "The queue has been shuffled.").await
}
