//! Per-guild playback bookkeeping: the current track, its countdown, the queue
//! and the history, plus the transition table driving player status changes.
//!
//! Nothing in here awaits or touches audio. `GuildSession` owns a
//! `PlaybackState` behind a mutex and carries out the effects a transition asks for.

use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::task::AbortHandle;

use crate::commands::music::audio_sources::{Track, TrackField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A resolved track was handed to the player.
    Started,
    Paused,
    Resumed,
    Stopped,
    /// The countdown of the current track reached zero.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    CancelCountdown,
    ArmCountdown,
    PauseSink,
    ResumeSink,
    StopSink,
    /// Advance to the next queued track. Runs after the state lock is released.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: PlaybackStatus,
    pub effects: &'static [Effect],
}

/// Transition table of the player.
pub fn transition(status: PlaybackStatus, event: PlaybackEvent) -> Transition {
    use Effect::*;
    use PlaybackEvent as E;
    use PlaybackStatus::*;

    let (next, effects): (PlaybackStatus, &'static [Effect]) = match (status, event) {
        (_, E::Started) => (Playing, &[CancelCountdown, ArmCountdown]),
        (_, E::Stopped) => (Idle, &[CancelCountdown, StopSink]),

        (Playing, E::Paused) => (Paused, &[CancelCountdown, PauseSink]),
        (Paused | Idle, E::Paused) => (status, &[]),

        (Paused, E::Resumed) => (Playing, &[ArmCountdown, ResumeSink]),
        (Playing, E::Resumed) => (Playing, &[]),
        // Nothing to resume: move on to whatever is queued.
        (Idle, E::Resumed) => (Idle, &[Skip]),

        (Playing, E::Expired) => (Playing, &[CancelCountdown, Skip]),
        (Paused | Idle, E::Expired) => (status, &[]),
    };

    Transition { next, effects }
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The tick belongs to a countdown that was cancelled or replaced.
    Stale,
    Running(u64),
    Expired,
}

#[derive(Debug)]
struct Countdown {
    id: u64,
    task: AbortHandle,
}

/// Read-only copy of a guild's playback, used for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub current: Option<Track>,
    pub remaining_secs: u64,
    pub queue: Vec<Track>,
    pub history: Vec<Track>,
}

impl PlaybackSnapshot {
    /// Seconds until the queue entry at `index` (0-based) starts.
    pub fn time_until(&self, index: usize) -> u64 {
        self.remaining_secs
            + self
                .queue
                .iter()
                .take(index)
                .map(|track| track.duration_secs)
                .sum::<u64>()
    }

    /// Remaining time of the current track plus the whole queue.
    pub fn total_secs(&self) -> u64 {
        self.time_until(self.queue.len())
    }
}

/// Playback state of one guild.
///
/// Invariants: `current` is `None` exactly when `remaining_secs` is 0, and a
/// countdown is armed exactly when a track is current and not paused.
#[derive(Debug)]
pub struct PlaybackState {
    status: PlaybackStatus,
    current: Option<Track>,
    remaining_secs: u64,
    queue: VecDeque<Track>,
    history: VecDeque<Track>,
    history_limit: usize,
    /// Bumped by every play attempt and every stop; stale resolutions compare against it.
    generation: u64,
    /// Generation of the play attempt waiting on a stream URL.
    pending: Option<u64>,
    countdown: Option<Countdown>,
    next_countdown_id: u64,
}

impl PlaybackState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            status: PlaybackStatus::Idle,
            current: None,
            remaining_secs: 0,
            queue: VecDeque::new(),
            history: VecDeque::new(),
            history_limit,
            generation: 0,
            pending: None,
            countdown: None,
            next_countdown_id: 0,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn queue(&self) -> &VecDeque<Track> {
        &self.queue
    }

    /// Most recently played first.
    pub fn history(&self) -> &VecDeque<Track> {
        &self.history
    }

    pub fn is_countdown_armed(&self) -> bool {
        self.countdown.is_some()
    }

    /// Whether a new track would have to wait in the queue.
    pub fn is_busy(&self) -> bool {
        self.current.is_some() || self.pending.is_some()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status,
            current: self.current.clone(),
            remaining_secs: self.remaining_secs,
            queue: self.queue.iter().cloned().collect(),
            history: self.history.iter().cloned().collect(),
        }
    }

    pub(crate) fn set_status(&mut self, status: PlaybackStatus) {
        self.status = status;
    }

    /// Starts a play attempt and returns its generation.
    pub(crate) fn begin_attempt(&mut self) -> u64 {
        self.generation += 1;
        self.pending = Some(self.generation);
        self.generation
    }

    /// Whether no stop or newer attempt happened since `generation` began.
    pub(crate) fn is_current_attempt(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub(crate) fn abandon_attempt(&mut self, generation: u64) {
        if self.pending == Some(generation) {
            self.pending = None;
        }
    }

    /// Makes `track` the current track once its stream is playing.
    pub(crate) fn commit(&mut self, generation: u64, track: Track) {
        self.abandon_attempt(generation);
        // A track of unknown length still has to leave the slot on the next tick.
        self.remaining_secs = track.duration_secs.max(1);
        self.history.push_front(track.clone());
        self.history.truncate(self.history_limit);
        self.current = Some(track);
    }

    /// Empties the current slot and invalidates any attempt in flight.
    pub(crate) fn clear_current(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.current = None;
        self.remaining_secs = 0;
    }

    pub(crate) fn next_countdown_id(&mut self) -> u64 {
        self.next_countdown_id += 1;
        self.next_countdown_id
    }

    /// Installs a new countdown, aborting the one it replaces.
    pub(crate) fn set_countdown(&mut self, id: u64, task: AbortHandle) {
        self.cancel_countdown();
        self.countdown = Some(Countdown { id, task });
    }

    pub(crate) fn cancel_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.task.abort();
        }
    }

    /// Counts one second off the countdown `id`.
    ///
    /// On expiry the countdown slot is emptied here, by the ticking task itself,
    /// so no second tick of it can ever be accepted.
    pub(crate) fn tick(&mut self, id: u64) -> Tick {
        match &self.countdown {
            Some(countdown) if countdown.id == id => {}
            _ => return Tick::Stale,
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.countdown = None;
            Tick::Expired
        } else {
            Tick::Running(self.remaining_secs)
        }
    }

    pub(crate) fn enqueue(&mut self, track: Track) -> usize {
        self.queue.push_back(track);
        self.queue.len()
    }

    pub(crate) fn dequeue(&mut self) -> Option<Track> {
        self.queue.pop_front()
    }

    pub(crate) fn shuffle_queue(&mut self) {
        self.queue.make_contiguous().shuffle(&mut rand::rng());
    }

    pub(crate) fn clear_queue(&mut self) -> usize {
        let removed = self.queue.len();
        self.queue.clear();
        removed
    }

    /// Removes the entry at the 1-based `position`.
    pub(crate) fn remove_at(&mut self, position: usize) -> Option<Track> {
        position
            .checked_sub(1)
            .and_then(|index| self.queue.remove(index))
    }

    /// Removes the first entry titled exactly `title`.
    pub(crate) fn remove_titled(&mut self, title: &str) -> Option<Track> {
        let index = self.queue.iter().position(|track| track.title == title)?;
        self.queue.remove(index)
    }

    /// Removes every entry whose `field` equals `value`, returning how many went.
    pub(crate) fn clear_matching(&mut self, field: TrackField, value: &str) -> usize {
        let before = self.queue.len();
        self.queue.retain(|track| field.value(track) != value);
        before - self.queue.len()
    }

    pub fn queued_duration(&self) -> Duration {
        Duration::from_secs(self.queue.iter().map(|track| track.duration_secs).sum())
    }
}
