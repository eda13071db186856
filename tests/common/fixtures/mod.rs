//! Sample data used across the integration tests

use subsonic_bot::commands::music::audio_sources::Track;

pub const GUILD_ID: u64 = 123456789;
pub const CHANNEL_A: u64 = 987654321;
pub const CHANNEL_B: u64 = 987654322;

/// Backend name used by single-backend tests
pub const HOME: &str = "home";

pub fn track(id: &str, duration_secs: u64) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Song {}", id),
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        duration_secs,
        backend: HOME.to_string(),
    }
}

/// `count` tracks named after `prefix`, found on `backend`
pub fn library(backend: &str, prefix: &str, count: usize) -> Vec<Track> {
    (1..=count)
        .map(|i| Track {
            id: format!("{}-{}", prefix, i),
            title: format!("{} {}", prefix, i),
            artist: "Test Artist".to_string(),
            album: "Test Album".to_string(),
            duration_secs: 120,
            backend: backend.to_string(),
        })
        .collect()
}
