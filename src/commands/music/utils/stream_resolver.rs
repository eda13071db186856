use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

use super::music_manager::{MusicError, MusicResult};
use crate::commands::music::audio_sources::{BackendRegistry, Track};

/// Routes stream requests to the backend a track was found on.
#[derive(Clone)]
pub struct StreamResolver {
    backends: Arc<BackendRegistry>,
}

impl StreamResolver {
    pub fn new(backends: Arc<BackendRegistry>) -> Self {
        Self { backends }
    }

    /// Obtains a streaming URL for `track`. Failures are reported once, never retried.
    pub async fn resolve_stream_url(&self, track: &Track) -> MusicResult<Url> {
        let backend = self
            .backends
            .get(&track.backend)
            .ok_or_else(|| MusicError::BackendNotFound(track.backend.clone()))?;

        debug!("Resolving stream for '{}' on {}", track.title, track.backend);
        backend.stream_url(&track.id).await.inspect_err(|e| {
            error!("Failed to get stream URL for '{}': {}", track.title, e);
        })
    }
}
