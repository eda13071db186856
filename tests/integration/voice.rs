use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use mockall::Sequence;
use mockall::predicate::{always, eq};
use pretty_assertions::assert_eq;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::broadcast;

use subsonic_bot::commands::music::utils::guild_session::{PlaybackSignal, SessionSettings};
use subsonic_bot::commands::music::utils::music_manager::MusicError;
use subsonic_bot::commands::music::utils::voice_session::{JoinOutcome, VoiceSession};

use crate::common::fixtures::{CHANNEL_A, CHANNEL_B, GUILD_ID, HOME};
use crate::common::mocks::{FakeBackend, MockGateway, RecordingSink};
use crate::common::session;
use crate::test_utils;

fn guild() -> GuildId {
    GuildId::new(GUILD_ID)
}

fn voice_session(gateway: MockGateway) -> VoiceSession {
    let (signals, _) = broadcast::channel(8);
    VoiceSession::new(guild(), Arc::new(gateway), signals)
}

#[tokio::test]
async fn test_joining_same_channel_twice_connects_once() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_connect()
        .with(eq(guild()), eq(ChannelId::new(CHANNEL_A)), always())
        .times(1)
        .returning(|_, _, _| Ok(()));
    let mut voice = voice_session(gateway);

    assert_matches!(voice.join(ChannelId::new(CHANNEL_A)).await, JoinOutcome::Joined);
    assert_matches!(
        voice.join(ChannelId::new(CHANNEL_A)).await,
        JoinOutcome::AlreadyConnected
    );
    assert_eq!(voice.channel(), Some(ChannelId::new(CHANNEL_A)));
}

#[tokio::test]
async fn test_switching_channels_leaves_first() {
    let mut sequence = Sequence::new();
    let mut gateway = MockGateway::new();
    gateway
        .expect_connect()
        .with(eq(guild()), eq(ChannelId::new(CHANNEL_A)), always())
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _, _| Ok(()));
    gateway
        .expect_disconnect()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    gateway
        .expect_connect()
        .with(eq(guild()), eq(ChannelId::new(CHANNEL_B)), always())
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _, _| Ok(()));
    let mut voice = voice_session(gateway);

    voice.join(ChannelId::new(CHANNEL_A)).await;
    assert_matches!(voice.join(ChannelId::new(CHANNEL_B)).await, JoinOutcome::Joined);
    assert_eq!(voice.channel(), Some(ChannelId::new(CHANNEL_B)));
}

#[tokio::test]
async fn test_leave_is_idempotent() {
    let mut gateway = MockGateway::new();
    gateway.expect_connect().times(1).returning(|_, _, _| Ok(()));
    gateway.expect_disconnect().times(1).returning(|_| Ok(()));
    let mut voice = voice_session(gateway);

    assert!(!voice.leave().await);
    voice.join(ChannelId::new(CHANNEL_A)).await;
    assert!(voice.leave().await);
    assert!(!voice.leave().await);
    assert!(!voice.is_connected());
}

#[tokio::test]
async fn test_failed_join_stays_disconnected() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_connect()
        .returning(|_, _, _| Err(MusicError::JoinError("missing permissions".to_string())));
    gateway.expect_disconnect().never();
    let mut voice = voice_session(gateway);

    assert_matches!(
        voice.join(ChannelId::new(CHANNEL_A)).await,
        JoinOutcome::Failed(MusicError::JoinError(_))
    );
    assert_eq!(voice.channel(), None);
    assert!(!voice.leave().await);
}

#[tokio::test]
async fn test_disconnect_error_still_forgets_channel() {
    let mut gateway = MockGateway::new();
    gateway.expect_connect().returning(|_, _, _| Ok(()));
    gateway
        .expect_disconnect()
        .times(1)
        .returning(|_| Err(MusicError::NotConnected));
    let mut voice = voice_session(gateway);

    voice.join(ChannelId::new(CHANNEL_A)).await;
    assert!(voice.leave().await);
    assert_eq!(voice.channel(), None);
}

#[tokio::test]
async fn test_lost_channel_is_rejoined() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_connect()
        .with(eq(guild()), eq(ChannelId::new(CHANNEL_A)), always())
        .times(2)
        .returning(|_, _, _| Ok(()));
    gateway.expect_disconnect().never();
    let mut voice = voice_session(gateway);

    voice.join(ChannelId::new(CHANNEL_A)).await;
    // A drop reported for some other channel changes nothing
    assert!(!voice.forget(ChannelId::new(CHANNEL_B)));
    assert_eq!(voice.channel(), Some(ChannelId::new(CHANNEL_A)));

    assert!(voice.forget(ChannelId::new(CHANNEL_A)));
    assert_eq!(voice.channel(), None);
    assert_matches!(voice.join(ChannelId::new(CHANNEL_A)).await, JoinOutcome::Joined);
}

#[tokio::test(start_paused = true)]
async fn test_driver_disconnect_frees_the_channel() {
    test_utils::init();
    let reported: Arc<Mutex<Option<broadcast::Sender<PlaybackSignal>>>> = Arc::default();
    let mut gateway = MockGateway::new();
    {
        let reported = reported.clone();
        gateway
            .expect_connect()
            .times(2)
            .returning(move |_, _, signals| {
                *reported.lock().unwrap() = Some(signals);
                Ok(())
            });
    }
    gateway.expect_disconnect().never();
    let session = session(
        FakeBackend::new(HOME, Vec::new()),
        &RecordingSink::new(),
        Arc::new(gateway),
        SessionSettings::default(),
    );

    session.join_voice(ChannelId::new(CHANNEL_A)).await;
    let driver = reported.lock().unwrap().clone().unwrap();
    driver
        .send(PlaybackSignal::VoiceDisconnected(ChannelId::new(CHANNEL_A)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(session.voice_channel().await, None);
    assert_matches!(
        session.join_voice(ChannelId::new(CHANNEL_A)).await,
        JoinOutcome::Joined
    );
    assert_eq!(session.voice_channel().await, Some(ChannelId::new(CHANNEL_A)));
}
