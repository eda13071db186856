use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serenity::model::id::ChannelId;
use tokio::time::sleep;

use subsonic_bot::commands::music::utils::guild_session::{
    EnqueueOutcome, GuildSession, PlaybackSignal, ResumeOutcome, SessionSettings, SkipOutcome,
};
use subsonic_bot::commands::music::utils::playback_state::{PlaybackSnapshot, PlaybackStatus};
use subsonic_bot::commands::music::utils::voice_session::JoinOutcome;

use crate::common::fixtures::{CHANNEL_A, HOME, track};
use crate::common::mocks::{FakeBackend, MockGateway, RecordingSink, SinkCall, permissive_gateway};
use crate::common::session;
use crate::test_utils;

fn url(id: &str) -> url::Url {
    FakeBackend::stream_url_for(HOME, id)
}

fn plain_session(backend: FakeBackend, sink: &Arc<RecordingSink>) -> Arc<GuildSession> {
    test_utils::init();
    session(
        backend,
        sink,
        permissive_gateway(),
        SessionSettings::default(),
    )
}

fn current_id(snapshot: &PlaybackSnapshot) -> Option<&str> {
    snapshot.current.as_ref().map(|track| track.id.as_str())
}

#[tokio::test(start_paused = true)]
async fn test_play_when_idle_starts_track() {
    let sink = RecordingSink::new();
    let session = plain_session(FakeBackend::new(HOME, Vec::new()), &sink);

    let outcome = session.enqueue_or_play(track("a", 180)).await;

    assert_eq!(outcome, EnqueueOutcome::Played);
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, PlaybackStatus::Playing);
    assert_eq!(current_id(&snapshot), Some("a"));
    assert_eq!(snapshot.remaining_secs, 180);
    assert_eq!(snapshot.history[0].id, "a");
    assert!(session.is_countdown_armed().await);
    assert_eq!(sink.calls(), vec![SinkCall::Play(url("a"))]);
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_while_playing_is_fifo() {
    let sink = RecordingSink::new();
    let session = plain_session(FakeBackend::new(HOME, Vec::new()), &sink);

    session.enqueue_or_play(track("a", 180)).await;
    assert_eq!(
        session.enqueue_or_play(track("b", 60)).await,
        EnqueueOutcome::Queued { position: 1 }
    );
    assert_eq!(
        session.enqueue_or_play(track("c", 60)).await,
        EnqueueOutcome::Queued { position: 2 }
    );

    let snapshot = session.snapshot().await;
    let queued: Vec<&str> = snapshot.queue.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(queued, vec!["b", "c"]);
    assert_eq!(snapshot.time_until(1), 240);
    assert_eq!(sink.plays(), vec![url("a")]);

    assert_eq!(session.skip().await, SkipOutcome::Played(track("b", 60)));
    assert_eq!(session.skip().await, SkipOutcome::Played(track("c", 60)));
    assert_eq!(sink.plays(), vec![url("a"), url("b"), url("c")]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_resolution_leaves_state_untouched() {
    let sink = RecordingSink::new();
    let session = plain_session(
        FakeBackend::new(HOME, Vec::new()).with_broken_stream("gone"),
        &sink,
    );
    let mut signals = session.subscribe();

    assert!(!session.play(track("gone", 100)).await);

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, PlaybackStatus::Idle);
    assert_eq!(snapshot.current, None);
    assert_eq!(snapshot.remaining_secs, 0);
    assert!(snapshot.history.is_empty());
    assert!(sink.calls().is_empty());
    assert_matches!(
        signals.try_recv(),
        Ok(PlaybackSignal::Failed { track, .. }) if track.id == "gone"
    );

    // The slot is free again, so the next request plays right away
    assert_eq!(
        session.enqueue_or_play(track("ok", 10)).await,
        EnqueueOutcome::Played
    );
}

#[tokio::test(start_paused = true)]
async fn test_sink_failure_reports_failed() {
    let sink = RecordingSink::failing_play();
    let session = plain_session(FakeBackend::new(HOME, Vec::new()), &sink);

    assert_eq!(
        session.enqueue_or_play(track("a", 100)).await,
        EnqueueOutcome::Failed
    );
    assert_eq!(session.snapshot().await.current, None);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_skips_exactly_once() {
    let sink = RecordingSink::new();
    let session = plain_session(FakeBackend::new(HOME, Vec::new()), &sink);

    session.enqueue_or_play(track("a", 3)).await;
    session.enqueue_or_play(track("b", 5)).await;

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(session.snapshot().await.remaining_secs, 2);

    sleep(Duration::from_secs(2)).await;
    let snapshot = session.snapshot().await;
    assert_eq!(current_id(&snapshot), Some("b"));
    assert_eq!(snapshot.remaining_secs, 5);
    assert!(snapshot.queue.is_empty());

    // Long after everything ran out: no further skips happened
    sleep(Duration::from_secs(30)).await;
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, PlaybackStatus::Idle);
    assert_eq!(snapshot.current, None);
    assert!(!session.is_countdown_armed().await);
    let history: Vec<&str> = snapshot.history.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(history, vec!["b", "a"]);
    assert_eq!(sink.plays(), vec![url("a"), url("b")]);
    assert_eq!(
        sink.calls().iter().filter(|call| **call == SinkCall::Stop).count(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn test_auto_skip_stops_at_a_broken_track() {
    let sink = RecordingSink::new();
    let session = plain_session(
        FakeBackend::new(HOME, Vec::new()).with_broken_stream("broken"),
        &sink,
    );

    session.enqueue_or_play(track("a", 1)).await;
    session.enqueue_or_play(track("broken", 10)).await;
    session.enqueue_or_play(track("ok", 10)).await;
    sleep(Duration::from_secs(5)).await;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, PlaybackStatus::Idle);
    assert_eq!(snapshot.current, None);
    assert_eq!(snapshot.remaining_secs, 0);
    assert_eq!(snapshot.queue, vec![track("ok", 10)]);
    assert!(!session.is_countdown_armed().await);
    assert_eq!(sink.plays(), vec![url("a")]);
}

#[tokio::test(start_paused = true)]
async fn test_skip_during_auto_advance_gets_a_full_countdown() {
    let sink = RecordingSink::new();
    let session = plain_session(
        FakeBackend::new(HOME, Vec::new()).with_stream_delay("b", Duration::from_secs(3)),
        &sink,
    );

    session.enqueue_or_play(track("a", 1)).await;
    session.enqueue_or_play(track("b", 10)).await;
    session.enqueue_or_play(track("c", 10)).await;

    // a expired and b is still resolving: nothing is current in between
    sleep(Duration::from_millis(1500)).await;
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.current, None);
    assert_eq!(snapshot.remaining_secs, 0);
    assert_eq!(snapshot.queue, vec![track("c", 10)]);

    assert_eq!(session.skip().await, SkipOutcome::Played(track("c", 10)));

    // b resolves long after it was skipped and must not touch c
    sleep(Duration::from_millis(4800)).await;
    let snapshot = session.snapshot().await;
    assert_eq!(current_id(&snapshot), Some("c"));
    assert_eq!(snapshot.remaining_secs, 6);
    assert!(session.is_countdown_armed().await);
    assert_eq!(sink.plays(), vec![url("a"), url("c")]);
}

#[tokio::test(start_paused = true)]
async fn test_pause_freezes_countdown() {
    let sink = RecordingSink::new();
    let session = plain_session(FakeBackend::new(HOME, Vec::new()), &sink);

    session.enqueue_or_play(track("a", 10)).await;
    sleep(Duration::from_millis(2500)).await;

    assert!(session.pause().await);
    assert!(!session.pause().await);
    sleep(Duration::from_secs(20)).await;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, PlaybackStatus::Paused);
    assert_eq!(current_id(&snapshot), Some("a"));
    assert_eq!(snapshot.remaining_secs, 8);
    assert!(!session.is_countdown_armed().await);

    assert_eq!(session.resume().await, ResumeOutcome::Resumed);
    assert_eq!(session.resume().await, ResumeOutcome::AlreadyPlaying);
    sleep(Duration::from_millis(8500)).await;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, PlaybackStatus::Idle);
    assert_eq!(snapshot.current, None);
    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::Play(url("a")),
            SinkCall::Pause,
            SinkCall::Resume,
            SinkCall::Stop,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_keeps_queue() {
    let sink = RecordingSink::new();
    let session = plain_session(FakeBackend::new(HOME, Vec::new()), &sink);

    session.enqueue_or_play(track("a", 100)).await;
    session.enqueue_or_play(track("b", 100)).await;
    session.stop().await;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, PlaybackStatus::Idle);
    assert_eq!(snapshot.current, None);
    assert_eq!(snapshot.queue.len(), 1);
    assert!(!session.is_countdown_armed().await);

    // Nothing current, so continuing starts the queue
    assert_eq!(
        session.resume().await,
        ResumeOutcome::Skipped(SkipOutcome::Played(track("b", 100)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_stopped_track_stays_in_history() {
    let sink = RecordingSink::new();
    let session = plain_session(FakeBackend::new(HOME, Vec::new()), &sink);

    assert!(session.play(track("a", 100)).await);
    session.stop().await;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.current, None);
    assert_eq!(snapshot.history, vec![track("a", 100)]);
}

#[tokio::test(start_paused = true)]
async fn test_skip_with_empty_queue_goes_idle() {
    let sink = RecordingSink::new();
    let session = plain_session(FakeBackend::new(HOME, Vec::new()), &sink);
    session.enqueue_or_play(track("a", 100)).await;
    let mut signals = session.subscribe();

    assert_eq!(session.skip().await, SkipOutcome::Empty);

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.current, None);
    assert_eq!(snapshot.remaining_secs, 0);
    assert_eq!(signals.try_recv(), Ok(PlaybackSignal::Stopped));
    assert_eq!(signals.try_recv(), Ok(PlaybackSignal::Idle));
}

#[tokio::test(start_paused = true)]
async fn test_stop_discards_pending_resolution() {
    let sink = RecordingSink::new();
    let session = plain_session(
        FakeBackend::new(HOME, Vec::new()).with_stream_delay("slow", Duration::from_secs(5)),
        &sink,
    );

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.play(track("slow", 100)).await })
    };
    sleep(Duration::from_secs(1)).await;
    session.stop().await;

    assert!(!pending.await.unwrap());
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.current, None);
    assert_eq!(snapshot.status, PlaybackStatus::Idle);
    assert!(sink.plays().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_newer_play_wins_over_slower_one() {
    let sink = RecordingSink::new();
    let session = plain_session(
        FakeBackend::new(HOME, Vec::new()).with_stream_delay("slow", Duration::from_secs(5)),
        &sink,
    );

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.play(track("slow", 100)).await })
    };
    sleep(Duration::from_secs(1)).await;
    assert!(session.play(track("fast", 100)).await);

    assert!(!pending.await.unwrap());
    assert_eq!(current_id(&session.snapshot().await), Some("fast"));
    assert_eq!(sink.plays(), vec![url("fast")]);
}

#[tokio::test(start_paused = true)]
async fn test_pending_resolution_reserves_the_slot() {
    let sink = RecordingSink::new();
    let session = plain_session(
        FakeBackend::new(HOME, Vec::new()).with_stream_delay("slow", Duration::from_secs(5)),
        &sink,
    );

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.enqueue_or_play(track("slow", 100)).await })
    };
    sleep(Duration::from_secs(1)).await;

    assert_eq!(
        session.enqueue_or_play(track("next", 100)).await,
        EnqueueOutcome::Queued { position: 1 }
    );
    assert_eq!(pending.await.unwrap(), EnqueueOutcome::Played);

    let snapshot = session.snapshot().await;
    assert_eq!(current_id(&snapshot), Some("slow"));
    assert_eq!(snapshot.queue, vec![track("next", 100)]);
}

#[tokio::test(start_paused = true)]
async fn test_auto_leave_after_queue_runs_dry() {
    test_utils::init();
    let mut gateway = MockGateway::new();
    gateway.expect_connect().times(1).returning(|_, _, _| Ok(()));
    gateway.expect_disconnect().times(1).returning(|_| Ok(()));

    let sink = RecordingSink::new();
    let session = session(
        FakeBackend::new(HOME, Vec::new()),
        &sink,
        Arc::new(gateway),
        SessionSettings {
            history_limit: 100,
            auto_leave: Some(Duration::from_secs(30)),
        },
    );

    assert_matches!(
        session.join_voice(ChannelId::new(CHANNEL_A)).await,
        JoinOutcome::Joined
    );
    session.enqueue_or_play(track("a", 1)).await;

    sleep(Duration::from_secs(10)).await;
    assert_eq!(session.snapshot().await.status, PlaybackStatus::Idle);
    assert_eq!(session.voice_channel().await, Some(ChannelId::new(CHANNEL_A)));

    sleep(Duration::from_secs(30)).await;
    assert_eq!(session.voice_channel().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_playing_cancels_auto_leave() {
    test_utils::init();
    let mut gateway = MockGateway::new();
    gateway.expect_connect().times(1).returning(|_, _, _| Ok(()));
    gateway.expect_disconnect().never();

    let sink = RecordingSink::new();
    let session = session(
        FakeBackend::new(HOME, Vec::new()),
        &sink,
        Arc::new(gateway),
        SessionSettings {
            history_limit: 100,
            auto_leave: Some(Duration::from_secs(30)),
        },
    );

    session.join_voice(ChannelId::new(CHANNEL_A)).await;
    session.enqueue_or_play(track("a", 1)).await;
    sleep(Duration::from_secs(10)).await;
    session.enqueue_or_play(track("b", 600)).await;

    sleep(Duration::from_secs(60)).await;
    assert_eq!(session.voice_channel().await, Some(ChannelId::new(CHANNEL_A)));
}

#[tokio::test(start_paused = true)]
async fn test_failed_play_rearms_auto_leave() {
    test_utils::init();
    let mut gateway = MockGateway::new();
    gateway.expect_connect().times(1).returning(|_, _, _| Ok(()));
    gateway.expect_disconnect().times(1).returning(|_| Ok(()));

    let sink = RecordingSink::new();
    let session = session(
        FakeBackend::new(HOME, Vec::new()).with_broken_stream("gone"),
        &sink,
        Arc::new(gateway),
        SessionSettings {
            history_limit: 100,
            auto_leave: Some(Duration::from_secs(30)),
        },
    );

    session.join_voice(ChannelId::new(CHANNEL_A)).await;
    session.enqueue_or_play(track("a", 1)).await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(
        session.enqueue_or_play(track("gone", 100)).await,
        EnqueueOutcome::Failed
    );

    // The timer restarted with the failed attempt
    sleep(Duration::from_secs(25)).await;
    assert_eq!(session.voice_channel().await, Some(ChannelId::new(CHANNEL_A)));
    sleep(Duration::from_secs(10)).await;
    assert_eq!(session.voice_channel().await, None);
}
