use serenity::all::{ComponentInteraction, Ready};
use serenity::async_trait;
use serenity::model::application::Interaction;
use serenity::prelude::*;
use std::sync::Arc;
use tracing::{error, info};

use crate::commands::music::utils::component_handlers;
use crate::commands::music::utils::music_manager::MusicManager;
use crate::utils::config::Config;

pub struct Handler {
    pub music: Arc<MusicManager>,
    pub config: Arc<Config>,
}

#[async_trait]
impl serenity::prelude::EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.name);
        self.music
            .register_guilds(ready.guilds.iter().map(|guild| guild.id));
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            if component.data.custom_id.starts_with("music_") {
                self.music_component_interaction(&ctx, &component).await;
            }
        }
    }
}

impl Handler {
    /// Handle component interactions for components with identities starting with "music_"
    async fn music_component_interaction(&self, ctx: &Context, component: &ComponentInteraction) {
        if let Err(e) =
            component_handlers::handle_interaction(ctx, component, &self.music, &self.config).await
        {
            error!("Error handling component interaction: {}", e);
        }
    }
}
