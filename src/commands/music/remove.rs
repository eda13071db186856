use super::*;
use tracing::info;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RemoveBy {
    #[name = "index"]
    Index,
    #[name = "title"]
    Title,
}

/// Remove one song from the queue, by position or by exact title
#[poise::command(slash_command, rename = "remove-from-queue", category = "Music")]
pub async fn remove(
    ctx: Context<'_>,
    #[rename = "type"]
    #[description = "Remove by position or by title"]
    by: RemoveBy,
    #[description = "Position (starting at 1) or exact title"] query: String,
) -> CommandResult {
    let session = guild_session(ctx)?;
    let queue_len = session.queue_len().await;
    if queue_len == 0 {
        ctx.send(embedded_messages::queue_is_empty()).await?;
        return Ok(());
    }

    let removed = match by {
        RemoveBy::Index => {
            let Ok(position) = query.trim().parse::<usize>() else {
                ctx.send(embedded_messages::error("Index must be a number."))
                    .await?;
                return Ok(());
            };
            match session.remove_from_queue(position).await {
                Some(track) => track,
                None => {
                    ctx.send(embedded_messages::error(format!(
                        "Index must be between 1 and {}.",
                        queue_len
                    )))
                    .await?;
                    return Ok(());
                }
            }
        }
        RemoveBy::Title => match session.remove_titled(&query).await {
            Some(track) => track,
            None => {
                ctx.send(embedded_messages::error("Song not found in queue."))
                    .await?;
                return Ok(());
            }
        },
    };

    info!("Removed '{}' from the queue", removed.title);
    let left = session.queue_len().await;
    confirm(
        ctx,
        "🗑️ Removed",
        format!(
            "Removed **{}** from the queue. {}",
            removed.title,
            embedded_messages::queue_left_text(left)
        ),
    )
    .await
}
