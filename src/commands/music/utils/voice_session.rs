use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{CoreEvent, Event, Songbird};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::event_handlers::DisconnectNotifier;
use super::guild_session::PlaybackSignal;
use super::music_manager::{MusicError, MusicResult};

/// Opens and closes voice connections.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Connects to `channel_id`. A connection lost later on is reported on
    /// `signals` as `PlaybackSignal::VoiceDisconnected`.
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        signals: broadcast::Sender<PlaybackSignal>,
    ) -> MusicResult<()>;
    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()>;
}

/// `VoiceGateway` backed by the songbird manager registered with the client.
pub struct SongbirdGateway {
    songbird: Arc<Songbird>,
}

impl SongbirdGateway {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self { songbird }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        signals: broadcast::Sender<PlaybackSignal>,
    ) -> MusicResult<()> {
        let call = self
            .songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;

        // The call outlives a channel switch; keep one notifier, for the new channel.
        let mut handler = call.lock().await;
        handler.remove_all_global_events();
        handler.add_global_event(
            Event::Core(CoreEvent::DriverDisconnect),
            DisconnectNotifier {
                guild_id,
                channel_id,
                signals,
            },
        );
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        if self.songbird.get(guild_id).is_none() {
            return Err(MusicError::NotConnected);
        }

        self.songbird
            .remove(guild_id)
            .await
            .map_err(|e| MusicError::JoinError(format!("Failed to leave voice channel: {}", e)))
    }
}

/// Outcome of a join request.
#[derive(Debug)]
pub enum JoinOutcome {
    Joined,
    /// Already in that very channel; nothing was done.
    AlreadyConnected,
    Failed(MusicError),
}

/// The voice connection of one guild. At most one channel at a time.
pub struct VoiceSession {
    guild_id: GuildId,
    channel: Option<ChannelId>,
    gateway: Arc<dyn VoiceGateway>,
    signals: broadcast::Sender<PlaybackSignal>,
}

impl VoiceSession {
    pub fn new(
        guild_id: GuildId,
        gateway: Arc<dyn VoiceGateway>,
        signals: broadcast::Sender<PlaybackSignal>,
    ) -> Self {
        Self {
            guild_id,
            channel: None,
            gateway,
            signals,
        }
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Joins `channel_id`, leaving any other channel first.
    ///
    /// Connection failures are logged and returned as `JoinOutcome::Failed`;
    /// the session then stays disconnected.
    pub async fn join(&mut self, channel_id: ChannelId) -> JoinOutcome {
        if self.channel == Some(channel_id) {
            return JoinOutcome::AlreadyConnected;
        }
        if self.channel.is_some() {
            self.leave().await;
        }

        info!("Joining voice channel {} in guild {}", channel_id, self.guild_id);
        match self
            .gateway
            .connect(self.guild_id, channel_id, self.signals.clone())
            .await {
            Ok(()) => {
                self.channel = Some(channel_id);
                JoinOutcome::Joined
            }
            Err(e) => {
                error!(
                    "Failed to join voice channel {} for guild {}: {}",
                    channel_id, self.guild_id, e
                );
                JoinOutcome::Failed(e)
            }
        }
    }

    /// Leaves the current channel. Returns whether there was one.
    pub async fn leave(&mut self) -> bool {
        let Some(channel_id) = self.channel.take() else {
            return false;
        };

        info!("Leaving voice channel {} in guild {}", channel_id, self.guild_id);
        if let Err(e) = self.gateway.disconnect(self.guild_id).await {
            warn!("Failed to leave voice channel for guild {}: {}", self.guild_id, e);
        }
        true
    }

    /// Forgets `channel_id` after the driver lost it, without asking the
    /// gateway to disconnect. Returns whether it was the current channel.
    pub fn forget(&mut self, channel_id: ChannelId) -> bool {
        if self.channel != Some(channel_id) {
            return false;
        }
        warn!(
            "Lost voice channel {} in guild {}, next join reconnects",
            channel_id, self.guild_id
        );
        self.channel = None;
        true
    }
}
