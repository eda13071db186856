use dashmap::DashMap;
use futures::future::join_all;
use poise::serenity_prelude as serenity;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::audio_sink::SinkFactory;
use super::guild_session::{GuildSession, SessionSettings};
use super::search_aggregator::SearchAggregator;
use super::stream_resolver::StreamResolver;
use super::voice_session::VoiceGateway;
use crate::commands::music::audio_sources::{BackendRegistry, Track};

/// Errors that can occur during music operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("No backend named '{0}'")]
    BackendNotFound(String),

    #[error("Backend '{backend}' failed: {reason}")]
    Upstream { backend: String, reason: String },

    #[error("Player error: {0}")]
    Player(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Owns the per-guild sessions and the pieces they share.
pub struct MusicManager {
    sessions: DashMap<GuildId, Arc<GuildSession>>,
    backends: Arc<BackendRegistry>,
    search: SearchAggregator,
    gateway: Arc<dyn VoiceGateway>,
    sinks: SinkFactory,
    settings: SessionSettings,
}

impl MusicManager {
    pub fn new(
        backends: Arc<BackendRegistry>,
        gateway: Arc<dyn VoiceGateway>,
        sinks: SinkFactory,
        settings: SessionSettings,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            search: SearchAggregator::new(backends.clone()),
            backends,
            gateway,
            sinks,
            settings,
        }
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// The session of `guild_id`, created on first use.
    pub fn session(&self, guild_id: GuildId) -> Arc<GuildSession> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("Creating music session for guild {}", guild_id);
                GuildSession::new(
                    guild_id,
                    StreamResolver::new(self.backends.clone()),
                    self.gateway.clone(),
                    &self.sinks,
                    &self.settings,
                )
            })
            .clone()
    }

    /// The session of `guild_id` if one was ever created.
    pub fn existing_session(&self, guild_id: GuildId) -> Option<Arc<GuildSession>> {
        self.sessions.get(&guild_id).map(|entry| entry.clone())
    }

    /// Creates sessions for every guild the bot is in.
    pub fn register_guilds(&self, guild_ids: impl IntoIterator<Item = GuildId>) {
        for guild_id in guild_ids {
            self.session(guild_id);
        }
        info!("Music sessions ready for {} guilds", self.sessions.len());
    }

    pub async fn search(&self, query: &str, limit: usize) -> Vec<Track> {
        self.search.search(query, limit).await
    }

    /// Stops playback and leaves voice in every guild.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<GuildSession>> =
            self.sessions.iter().map(|entry| entry.value().clone()).collect();

        join_all(sessions.iter().map(|session| async move {
            session.stop().await;
            session.leave_voice().await;
        }))
        .await;
        info!("Music sessions shut down");
    }

    /// The voice channel `user_id` currently sits in.
    pub fn get_user_voice_channel(
        ctx: &Context,
        guild_id: GuildId,
        user_id: UserId,
    ) -> MusicResult<ChannelId> {
        let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

        let voice_state = guild
            .voice_states
            .get(&user_id)
            .ok_or(MusicError::UserNotInVoiceChannel)?;

        voice_state
            .channel_id
            .ok_or(MusicError::UserNotInVoiceChannel)
    }
}
