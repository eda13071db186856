use super::*;
use tracing::info;

/// Play the best match for a query, or queue it if something is playing
#[poise::command(slash_command, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song to search for"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let Some((guild_id, channel_id)) = require_voice(ctx).await? else {
        return Ok(());
    };

    // Searching and resolving the stream might take time
    ctx.defer().await?;

    let data = ctx.data();
    let Some(track) = data.music.search(&query, 1).await.into_iter().next() else {
        ctx.send(embedded_messages::no_results(&query)).await?;
        return Ok(());
    };

    let session = data.music.session(guild_id);
    let reply = play_track(&session, channel_id, track, data.config.show_provider).await;
    ctx.send(reply).await?;
    Ok(())
}
