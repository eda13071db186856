use super::*;
use super::audio_sources::TrackField;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ClearBy {
    #[name = "artist"]
    Artist,
    #[name = "album"]
    Album,
    #[name = "title"]
    Title,
}

impl From<ClearBy> for TrackField {
    fn from(by: ClearBy) -> Self {
        match by {
            ClearBy::Artist => TrackField::Artist,
            ClearBy::Album => TrackField::Album,
            ClearBy::Title => TrackField::Title,
        }
    }
}

/// Remove every queued song with the given artist, album or title
#[poise::command(slash_command, rename = "clear-from-queue", category = "Music")]
pub async fn clear_from_queue(
    ctx: Context<'_>,
    #[rename = "type"]
    #[description = "Which field to match"]
    by: ClearBy,
    #[description = "Exact value to match"] query: String,
) -> CommandResult {
    let session = guild_session(ctx)?;
    let removed = session.clear_matching(by.into(), &query).await;
    if removed == 0 {
        let what = match by {
            ClearBy::Artist => "Artist",
            ClearBy::Album => "Album",
            ClearBy::Title => "Title",
        };
        ctx.send(embedded_messages::error(format!("{} not found in queue.", what)))
            .await?;
        return Ok(());
    }

    let left = session.queue_len().await;
    confirm(
        ctx,
        "🗑️ Removed",
        format!(
            "{} song{} removed from the queue. {}",
            removed,
            if removed == 1 { "" } else { "s" },
            embedded_messages::queue_left_text(left)
        ),
    )
    .await
}

/// Remove every song from the queue
#[poise::command(slash_command, rename = "clear-queue", category = "Music")]
pub async fn clear_queue(ctx: Context<'_>) -> CommandResult {
    let session = guild_session(ctx)?;
    session.clear_queue().await;
    confirm(ctx, "🗑️ Cleared", "The queue has been cleared.").await
}
