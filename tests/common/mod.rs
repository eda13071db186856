//! Common test utilities, fixtures, and mocks

pub mod fixtures;

use std::sync::Arc;

use serenity::model::id::GuildId;
use subsonic_bot::commands::music::audio_sources::{BackendRegistry, MediaBackend};
use subsonic_bot::commands::music::utils::guild_session::{GuildSession, SessionSettings};
use subsonic_bot::commands::music::utils::stream_resolver::StreamResolver;
use subsonic_bot::commands::music::utils::voice_session::VoiceGateway;

use mocks::{FakeBackend, RecordingSink};

/// Registry over the given fakes, in the order given
pub fn registry(backends: Vec<FakeBackend>) -> Arc<BackendRegistry> {
    let backends = backends
        .into_iter()
        .map(|backend| Arc::new(backend) as Arc<dyn MediaBackend>)
        .collect();
    Arc::new(BackendRegistry::from_live(backends))
}

/// A guild session over one backend, a recording sink and `gateway`
pub fn session(
    backend: FakeBackend,
    sink: &Arc<RecordingSink>,
    gateway: Arc<dyn VoiceGateway>,
    settings: SessionSettings,
) -> Arc<GuildSession> {
    GuildSession::new(
        GuildId::new(fixtures::GUILD_ID),
        StreamResolver::new(registry(vec![backend])),
        gateway,
        &RecordingSink::factory(sink.clone()),
        &settings,
    )
}
