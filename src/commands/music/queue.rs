use super::*;
use super::utils::menus::{MenuKind, PagedMenu};

/// Show the queue
#[poise::command(slash_command, rename = "show-queue", category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let data = ctx.data();
    let session = guild_session(ctx)?;
    let snapshot = session.snapshot().await;
    if snapshot.queue.is_empty() {
        ctx.send(embedded_messages::queue_is_empty()).await?;
        return Ok(());
    }

    let menu = PagedMenu::new(
        MenuKind::Queue {
            remaining_secs: snapshot.remaining_secs,
        },
        snapshot.queue,
        data.config.max_page_entries,
    );
    let view = embedded_messages::menu_view(&menu, data.config.show_provider);

    let reply = ctx.send(view.into_reply()).await?;
    let message = reply.message().await?;
    session.open_menu(message.id, menu);
    Ok(())
}
