use super::*;
use tracing::info;
use super::utils::menus::{MenuKind, PagedMenu};

const DEFAULT_RESULTS: u32 = 100;

/// Search all servers and pick a song from the results
#[poise::command(slash_command, category = "Music")]
pub async fn search(
    ctx: Context<'_>,
    #[description = "Song to search for"] query: String,
    #[description = "Maximum number of results (default 100)"]
    #[min = 1]
    #[max = 500]
    count: Option<u32>,
) -> CommandResult {
    info!("Received search command with query: {}", query);
    if require_voice(ctx).await?.is_none() {
        return Ok(());
    }

    ctx.defer().await?;

    let data = ctx.data();
    let session = guild_session(ctx)?;
    let tracks = data
        .music
        .search(&query, count.unwrap_or(DEFAULT_RESULTS) as usize)
        .await;
    if tracks.is_empty() {
        ctx.send(embedded_messages::no_results(&query)).await?;
        return Ok(());
    }

    let menu = PagedMenu::new(
        MenuKind::Search {
            query: query.clone(),
        },
        tracks,
        data.config.max_page_entries,
    );
    let view = embedded_messages::menu_view(&menu, data.config.show_provider);

    let reply = ctx.send(view.into_reply()).await?;
    let message = reply.message().await?;
    session.open_menu(message.id, menu);
    Ok(())
}
