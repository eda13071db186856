//! Everything the bot keeps for one guild: playback, voice connection, open menus.
//!
//! All playback changes of a guild go through the `playback` mutex. The only
//! awaits that happen outside of it are stream resolutions; a resolution
//! commits only if no stop and no newer play attempt happened meanwhile
//! (see `PlaybackState::begin_attempt`).

use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, info, warn};
use url::Url;

use super::audio_sink::{AudioSink, SinkFactory};
use super::event_handlers::PlayerStatus;
use super::menus::PagedMenu;
use super::playback_state::{
    Effect, PlaybackEvent, PlaybackSnapshot, PlaybackState, PlaybackStatus, Tick, transition,
};
use super::stream_resolver::StreamResolver;
use super::voice_session::{JoinOutcome, VoiceGateway, VoiceSession};
use crate::commands::music::audio_sources::{Track, TrackField};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
const SIGNAL_CAPACITY: usize = 64;
/// Menus kept per guild; the oldest message loses its buttons first.
pub const MAX_OPEN_MENUS: usize = 20;

/// Lifecycle notifications of a guild's playback.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackSignal {
    Started(Track),
    Paused,
    Resumed,
    Stopped,
    /// Skipping found the queue empty.
    Idle,
    Failed { track: Track, reason: String },
    /// Raw driver status for the stream `stream`.
    Player { status: PlayerStatus, stream: Url },
    VoiceError(String),
    /// The voice driver lost the connection to this channel.
    VoiceDisconnected(ChannelId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    Played,
    /// 1-based position in the queue.
    Queued { position: usize },
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipOutcome {
    Played(Track),
    Empty,
    Failed(Track),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    Resumed,
    AlreadyPlaying,
    /// Nothing was current, so the next queued track was started instead.
    Skipped(SkipOutcome),
}

/// Per-guild settings taken from the bot configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub history_limit: usize,
    pub auto_leave: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            auto_leave: None,
        }
    }
}

pub struct GuildSession {
    guild_id: GuildId,
    playback: Mutex<PlaybackState>,
    /// Stream of the current track. Locked after `playback` when both are needed.
    current_stream: Mutex<Option<Url>>,
    voice: Mutex<VoiceSession>,
    resolver: StreamResolver,
    sink: Arc<dyn AudioSink>,
    signals: broadcast::Sender<PlaybackSignal>,
    auto_leave: Option<Duration>,
    auto_leave_task: Mutex<Option<JoinHandle<()>>>,
    menus: DashMap<MessageId, PagedMenu>,
}

impl GuildSession {
    pub fn new(
        guild_id: GuildId,
        resolver: StreamResolver,
        gateway: Arc<dyn VoiceGateway>,
        sinks: &SinkFactory,
        settings: &SessionSettings,
    ) -> Arc<Self> {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        let sink = sinks(guild_id, signals.clone());

        let session = Arc::new(Self {
            guild_id,
            playback: Mutex::new(PlaybackState::new(settings.history_limit)),
            current_stream: Mutex::new(None),
            voice: Mutex::new(VoiceSession::new(guild_id, gateway, signals.clone())),
            resolver,
            sink,
            signals,
            auto_leave: settings.auto_leave,
            auto_leave_task: Mutex::new(None),
            menus: DashMap::new(),
        });

        Self::spawn_signal_watcher(&session);
        session
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackSignal> {
        self.signals.subscribe()
    }

    pub fn menus(&self) -> &DashMap<MessageId, PagedMenu> {
        &self.menus
    }

    /// Tracks the menu sent as `message_id`, forgetting the oldest ones past
    /// `MAX_OPEN_MENUS`. Message ids are snowflakes, so the smallest is the oldest.
    pub fn open_menu(&self, message_id: MessageId, menu: PagedMenu) {
        self.menus.insert(message_id, menu);
        while self.menus.len() > MAX_OPEN_MENUS {
            let Some(oldest) = self.menus.iter().map(|entry| *entry.key()).min() else {
                break;
            };
            debug!("Dropping menu {} in guild {}", oldest, self.guild_id);
            self.menus.remove(&oldest);
        }
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        self.playback.lock().await.snapshot()
    }

    pub async fn is_countdown_armed(&self) -> bool {
        self.playback.lock().await.is_countdown_armed()
    }

    fn emit(&self, signal: PlaybackSignal) {
        // No subscriber is not an error.
        let _ = self.signals.send(signal);
    }

    /// Plays `track` right away when nothing is playing, otherwise queues it.
    pub async fn enqueue_or_play(self: &Arc<Self>, track: Track) -> EnqueueOutcome {
        let generation = {
            let mut state = self.playback.lock().await;
            if state.is_busy() {
                let position = state.enqueue(track.clone());
                info!(
                    "Queued '{}' at position {} in guild {}",
                    track.title, position, self.guild_id
                );
                return EnqueueOutcome::Queued { position };
            }
            state.begin_attempt()
        };

        if self.finish_play(generation, track).await {
            EnqueueOutcome::Played
        } else {
            EnqueueOutcome::Failed
        }
    }

    /// Makes `track` the current track. Returns `false`, leaving the current
    /// track as it was, when its stream cannot be obtained or started.
    pub async fn play(self: &Arc<Self>, track: Track) -> bool {
        let generation = self.playback.lock().await.begin_attempt();
        self.finish_play(generation, track).await
    }

    async fn finish_play(self: &Arc<Self>, generation: u64, track: Track) -> bool {
        self.cancel_auto_leave().await;

        let url = match self.resolver.resolve_stream_url(&track).await {
            Ok(url) => url,
            Err(e) => {
                let idle = {
                    let mut state = self.playback.lock().await;
                    state.abandon_attempt(generation);
                    !state.is_busy()
                };
                self.fail_play(track, e.to_string(), idle).await;
                return false;
            }
        };

        let mut state = self.playback.lock().await;
        if !state.is_current_attempt(generation) {
            debug!(
                "Discarding stream of '{}' in guild {}: playback changed while resolving",
                track.title, self.guild_id
            );
            return false;
        }

        if let Err(e) = self.sink.play(url.clone()).await {
            error!("Failed to start '{}' in guild {}: {}", track.title, self.guild_id, e);
            state.abandon_attempt(generation);
            let idle = !state.is_busy();
            drop(state);
            self.fail_play(track, e.to_string(), idle).await;
            return false;
        }

        state.commit(generation, track.clone());
        *self.current_stream.lock().await = Some(url);
        self.apply(&mut state, PlaybackEvent::Started).await;
        self.emit(PlaybackSignal::Started(track));
        true
    }

    /// Reports a play attempt that never started. The auto-leave timer was
    /// cancelled for it, so it is armed again when nothing else is playing.
    async fn fail_play(self: &Arc<Self>, track: Track, reason: String, idle: bool) {
        self.emit(PlaybackSignal::Failed { track, reason });
        if idle {
            self.arm_auto_leave().await;
        }
    }

    /// Pauses the player and the countdown. Returns whether anything was playing.
    pub async fn pause(self: &Arc<Self>) -> bool {
        let mut state = self.playback.lock().await;
        if state.status() != PlaybackStatus::Playing {
            return false;
        }
        self.apply(&mut state, PlaybackEvent::Paused).await;
        self.emit(PlaybackSignal::Paused);
        true
    }

    pub async fn resume(self: &Arc<Self>) -> ResumeOutcome {
        let skip = {
            let mut state = self.playback.lock().await;
            let status = state.status();
            let skip = self.apply(&mut state, PlaybackEvent::Resumed).await;
            match status {
                PlaybackStatus::Playing => return ResumeOutcome::AlreadyPlaying,
                PlaybackStatus::Paused => {
                    self.emit(PlaybackSignal::Resumed);
                    return ResumeOutcome::Resumed;
                }
                PlaybackStatus::Idle => skip,
            }
        };

        if skip {
            ResumeOutcome::Skipped(self.skip().await)
        } else {
            ResumeOutcome::AlreadyPlaying
        }
    }

    /// Stops the player and clears the current track. Queue and history stay.
    pub async fn stop(self: &Arc<Self>) {
        let mut state = self.playback.lock().await;
        self.stop_locked(&mut state).await;
    }

    async fn stop_locked(self: &Arc<Self>, state: &mut PlaybackState) {
        self.apply(state, PlaybackEvent::Stopped).await;
        state.clear_current();
        *self.current_stream.lock().await = None;
        self.emit(PlaybackSignal::Stopped);
    }

    /// Stops the current track and starts the head of the queue, if any.
    pub async fn skip(self: &Arc<Self>) -> SkipOutcome {
        let next = {
            let mut state = self.playback.lock().await;
            self.advance_locked(&mut state).await
        };
        self.start_next(next).await
    }

    /// Stops the current track and takes the head of the queue, reserving the
    /// slot for it before the lock is released.
    async fn advance_locked(self: &Arc<Self>, state: &mut PlaybackState) -> Option<(u64, Track)> {
        self.stop_locked(state).await;
        state
            .dequeue()
            .map(|track| (state.begin_attempt(), track))
    }

    async fn start_next(self: &Arc<Self>, next: Option<(u64, Track)>) -> SkipOutcome {
        let Some((generation, track)) = next else {
            info!("Queue is empty for guild {}", self.guild_id);
            self.emit(PlaybackSignal::Idle);
            self.arm_auto_leave().await;
            return SkipOutcome::Empty;
        };

        if self.finish_play(generation, track.clone()).await {
            SkipOutcome::Played(track)
        } else {
            SkipOutcome::Failed(track)
        }
    }

    /// Runs the effects `event` calls for and records the new status.
    /// Returns whether a skip was requested; the caller runs it once the lock is gone.
    async fn apply(self: &Arc<Self>, state: &mut PlaybackState, event: PlaybackEvent) -> bool {
        let transition = transition(state.status(), event);
        let mut skip = false;

        for effect in transition.effects {
            match effect {
                Effect::CancelCountdown => state.cancel_countdown(),
                Effect::ArmCountdown => self.arm_countdown(state),
                Effect::PauseSink => {
                    if let Err(e) = self.sink.pause().await {
                        warn!("Failed to pause player in guild {}: {}", self.guild_id, e);
                    }
                }
                Effect::ResumeSink => {
                    if let Err(e) = self.sink.resume().await {
                        warn!("Failed to resume player in guild {}: {}", self.guild_id, e);
                    }
                }
                Effect::StopSink => {
                    if let Err(e) = self.sink.stop().await {
                        warn!("Failed to stop player in guild {}: {}", self.guild_id, e);
                    }
                }
                Effect::Skip => skip = true,
            }
        }

        state.set_status(transition.next);
        skip
    }

    /// Spawns the once-per-second countdown of the current track.
    fn arm_countdown(self: &Arc<Self>, state: &mut PlaybackState) {
        let id = state.next_countdown_id();
        let weak = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
            loop {
                ticker.tick().await;
                let Some(session) = weak.upgrade() else {
                    break;
                };

                // The expiring tick and the advance share one guard: no play
                // or skip can land between them.
                let next = {
                    let mut state = session.playback.lock().await;
                    match state.tick(id) {
                        Tick::Stale => break,
                        Tick::Running(_) => continue,
                        Tick::Expired => session.expire_locked(&mut state).await,
                    }
                };
                if let Some(next) = next {
                    session.auto_skip(next).await;
                }
                break;
            }
        });

        state.set_countdown(id, task.abort_handle());
    }

    /// Applies the end of the countdown. `Some` carries the advance to finish
    /// once the lock is gone.
    async fn expire_locked(
        self: &Arc<Self>,
        state: &mut PlaybackState,
    ) -> Option<Option<(u64, Track)>> {
        debug!("Countdown expired in guild {}", self.guild_id);
        if !self.apply(state, PlaybackEvent::Expired).await {
            return None;
        }
        Some(self.advance_locked(state).await)
    }

    async fn auto_skip(self: &Arc<Self>, next: Option<(u64, Track)>) {
        match self.start_next(next).await {
            SkipOutcome::Played(track) => {
                info!("Auto-skipped to '{}' in guild {}", track.title, self.guild_id)
            }
            SkipOutcome::Empty => debug!("Auto-skip found an empty queue in guild {}", self.guild_id),
            SkipOutcome::Failed(track) => warn!(
                "Auto-skip could not start '{}' in guild {}",
                track.title, self.guild_id
            ),
        }
    }

    async fn arm_auto_leave(self: &Arc<Self>) {
        let Some(delay) = self.auto_leave else {
            return;
        };

        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(session) = weak.upgrade() {
                info!("Idle for {:?}, leaving voice in guild {}", delay, session.guild_id);
                session.leave_voice().await;
            }
        });

        if let Some(previous) = self.auto_leave_task.lock().await.replace(task) {
            previous.abort();
        }
    }

    async fn cancel_auto_leave(&self) {
        if let Some(task) = self.auto_leave_task.lock().await.take() {
            task.abort();
        }
    }

    /// Joins `channel_id`; a no-op when already there.
    pub async fn join_voice(&self, channel_id: ChannelId) -> JoinOutcome {
        let outcome = self.voice.lock().await.join(channel_id).await;
        if let JoinOutcome::Failed(e) = &outcome {
            self.emit(PlaybackSignal::VoiceError(e.to_string()));
        }
        outcome
    }

    /// Leaves the voice channel. Returns whether the bot was connected.
    pub async fn leave_voice(&self) -> bool {
        self.voice.lock().await.leave().await
    }

    pub async fn voice_channel(&self) -> Option<ChannelId> {
        self.voice.lock().await.channel()
    }

    pub async fn shuffle_queue(&self) -> usize {
        let mut state = self.playback.lock().await;
        state.shuffle_queue();
        state.queue().len()
    }

    pub async fn clear_queue(&self) -> usize {
        self.playback.lock().await.clear_queue()
    }

    /// Removes the queue entry at the 1-based `position`.
    pub async fn remove_from_queue(&self, position: usize) -> Option<Track> {
        self.playback.lock().await.remove_at(position)
    }

    pub async fn remove_titled(&self, title: &str) -> Option<Track> {
        self.playback.lock().await.remove_titled(title)
    }

    pub async fn clear_matching(&self, field: TrackField, value: &str) -> usize {
        self.playback.lock().await.clear_matching(field, value)
    }

    pub async fn queue_len(&self) -> usize {
        self.playback.lock().await.queue().len()
    }

    fn spawn_signal_watcher(session: &Arc<Self>) {
        let mut signals = session.signals.subscribe();
        let weak = Arc::downgrade(session);

        tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(signal) => {
                        let Some(session) = weak.upgrade() else {
                            break;
                        };
                        session.handle_signal(signal).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Playback log fell behind, {} signals dropped", missed)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Logs `signal`. A lost voice channel is also forgotten, so the next join
    /// connects again.
    async fn handle_signal(&self, signal: PlaybackSignal) {
        let guild_id = self.guild_id;
        match signal {
            PlaybackSignal::Started(track) => info!(
                "Now playing '{}' by {} from {} in guild {}",
                track.title, track.artist, track.backend, guild_id
            ),
            PlaybackSignal::Paused => info!("Playback paused in guild {}", guild_id),
            PlaybackSignal::Resumed => info!("Playback resumed in guild {}", guild_id),
            PlaybackSignal::Stopped => debug!("Playback stopped in guild {}", guild_id),
            PlaybackSignal::Idle => info!("Playback idle in guild {}", guild_id),
            PlaybackSignal::Failed { track, reason } => warn!(
                "Could not play '{}' in guild {}: {}",
                track.title, guild_id, reason
            ),
            PlaybackSignal::VoiceError(reason) => {
                error!("Voice connection error in guild {}: {}", guild_id, reason)
            }
            PlaybackSignal::VoiceDisconnected(channel_id) => {
                self.voice.lock().await.forget(channel_id);
            }
            PlaybackSignal::Player { status, stream } => match status {
                PlayerStatus::Buffering => info!("Player is buffering in guild {}", guild_id),
                PlayerStatus::Playing => info!("Player has started playing in guild {}", guild_id),
                PlayerStatus::Paused => info!("Player has been paused in guild {}", guild_id),
                PlayerStatus::Errored => error!("Player errored in guild {}", guild_id),
                PlayerStatus::Idle => {
                    info!("Player is idle in guild {}", guild_id);
                    let state = self.playback.lock().await;
                    let same_stream = self.current_stream.lock().await.as_ref() == Some(&stream);
                    if same_stream
                        && state.status() == PlaybackStatus::Playing
                        && state.remaining_secs() > 1
                    {
                        warn!(
                            "Player seems to have crashed or failed to buffer in guild {} ({}s left)",
                            guild_id,
                            state.remaining_secs()
                        );
                    }
                }
            },
        }
    }
}
