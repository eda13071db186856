use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::broadcast;
use tracing::warn;
use url::Url;

use super::guild_session::PlaybackSignal;

/// Status of the audio driver, as reported by songbird track events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Buffering,
    Playing,
    Paused,
    Idle,
    Errored,
}

/// Forwards one kind of track event of one stream to the guild's signal channel.
pub struct TrackStatusNotifier {
    pub guild_id: GuildId,
    pub status: PlayerStatus,
    pub stream: Url,
    pub signals: broadcast::Sender<PlaybackSignal>,
}

#[async_trait]
impl songbird::EventHandler for TrackStatusNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            for (state, _) in tracks.iter() {
                if let songbird::tracks::PlayMode::Errored(e) = &state.playing {
                    warn!("Track error in guild {}: {:?}", self.guild_id, e);
                }
            }
            // Nobody listening is fine.
            let _ = self.signals.send(PlaybackSignal::Player {
                status: self.status,
                stream: self.stream.clone(),
            });
        }
        None
    }
}

/// Reports a voice driver that lost its connection. Disconnects the bot asked
/// for itself carry no reason and are ignored.
pub struct DisconnectNotifier {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub signals: broadcast::Sender<PlaybackSignal>,
}

#[async_trait]
impl songbird::EventHandler for DisconnectNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::DriverDisconnect(data) = ctx {
            if let Some(reason) = &data.reason {
                warn!(
                    "Voice driver for guild {} disconnected: {:?}",
                    self.guild_id, reason
                );
                let _ = self
                    .signals
                    .send(PlaybackSignal::VoiceDisconnected(self.channel_id));
            }
        }
        None
    }
}
