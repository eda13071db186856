use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::model::id::GuildId;
use songbird::input::HttpRequest;
use songbird::tracks::TrackHandle;
use songbird::{Event, Songbird, TrackEvent};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};
use url::Url;

use super::event_handlers::{PlayerStatus, TrackStatusNotifier};
use super::guild_session::PlaybackSignal;
use super::music_manager::{MusicError, MusicResult};

/// The audio player of one guild.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Starts streaming `url`, replacing whatever was playing.
    async fn play(&self, url: Url) -> MusicResult<()>;
    async fn pause(&self) -> MusicResult<()>;
    async fn resume(&self) -> MusicResult<()>;
    async fn stop(&self) -> MusicResult<()>;
}

/// Builds the sink of a guild; receives the guild's signal channel for driver events.
pub type SinkFactory =
    Arc<dyn Fn(GuildId, broadcast::Sender<PlaybackSignal>) -> Arc<dyn AudioSink> + Send + Sync>;

/// Plays HTTP streams on the guild's songbird call.
pub struct SongbirdSink {
    songbird: Arc<Songbird>,
    guild_id: GuildId,
    http: reqwest::Client,
    volume: f32,
    signals: broadcast::Sender<PlaybackSignal>,
    handle: Mutex<Option<TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(
        songbird: Arc<Songbird>,
        guild_id: GuildId,
        http: reqwest::Client,
        volume: f32,
        signals: broadcast::Sender<PlaybackSignal>,
    ) -> Self {
        Self {
            songbird,
            guild_id,
            http,
            volume,
            signals,
            handle: Mutex::new(None),
        }
    }

    /// A factory producing one `SongbirdSink` per guild.
    pub fn factory(songbird: Arc<Songbird>, http: reqwest::Client, volume: f32) -> SinkFactory {
        Arc::new(move |guild_id, signals| {
            Arc::new(SongbirdSink::new(
                songbird.clone(),
                guild_id,
                http.clone(),
                volume,
                signals,
            )) as Arc<dyn AudioSink>
        })
    }

    fn watch(&self, handle: &TrackHandle, url: &Url) -> MusicResult<()> {
        let events = [
            (TrackEvent::Preparing, PlayerStatus::Buffering),
            (TrackEvent::Play, PlayerStatus::Playing),
            (TrackEvent::Pause, PlayerStatus::Paused),
            (TrackEvent::End, PlayerStatus::Idle),
            (TrackEvent::Error, PlayerStatus::Errored),
        ];

        for (event, status) in events {
            handle
                .add_event(
                    Event::Track(event),
                    TrackStatusNotifier {
                        guild_id: self.guild_id,
                        status,
                        stream: url.clone(),
                        signals: self.signals.clone(),
                    },
                )
                .map_err(|e| MusicError::Player(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn play(&self, url: Url) -> MusicResult<()> {
        let call = self
            .songbird
            .get(self.guild_id)
            .ok_or(MusicError::NotConnected)?;

        let input = HttpRequest::new(self.http.clone(), url.to_string());
        let track = {
            let mut handler = call.lock().await;
            handler.stop();
            handler.play_input(input.into())
        };

        track
            .set_volume(self.volume)
            .map_err(|e| MusicError::Player(e.to_string()))?;
        self.watch(&track, &url)?;

        info!("Handed stream to the voice driver for guild {}", self.guild_id);
        *self.handle.lock().await = Some(track);
        Ok(())
    }

    async fn pause(&self) -> MusicResult<()> {
        match self.handle.lock().await.as_ref() {
            Some(track) => track.pause().map_err(|e| MusicError::Player(e.to_string())),
            None => Ok(()),
        }
    }

    async fn resume(&self) -> MusicResult<()> {
        match self.handle.lock().await.as_ref() {
            Some(track) => track.play().map_err(|e| MusicError::Player(e.to_string())),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> MusicResult<()> {
        if let Some(track) = self.handle.lock().await.take() {
            debug!("Stopping track for guild {}", self.guild_id);
            // A track that already ended reports an error here; there is nothing left to stop.
            let _ = track.stop();
        }
        Ok(())
    }
}
