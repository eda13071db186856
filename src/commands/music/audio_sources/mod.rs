//! This module defines the common interface for media backends and the registry
//! holding the backends that answered at start-up.

/// Submodule implementing `MediaBackend` for Subsonic-protocol servers.
pub mod subsonic;
/// Submodule defining the `Track` struct used across the music commands.
pub mod track;

use crate::commands::music::utils::music_manager::MusicResult;
use futures::future::join_all;
use serenity::async_trait;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

pub use track::{Track, TrackField};

/// Trait defining the common interface of a media server the bot can search and stream from.
/// Requires `Send + Sync` to be safely used across async tasks.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Unique display name, also used to route stream requests.
    fn name(&self) -> &str;

    /// Host and port, for start-up logging.
    fn endpoint(&self) -> String {
        self.name().to_string()
    }

    /// Checks that the server is reachable and accepts our credentials.
    async fn ping(&self) -> MusicResult<()>;

    /// Searches songs, returning at most `count` tracks.
    async fn search(&self, query: &str, count: usize) -> MusicResult<Vec<Track>>;

    /// Obtains a streaming URL for the song `id`.
    async fn stream_url(&self, id: &str) -> MusicResult<Url>;
}

/// The set of live backends, fixed for the lifetime of the process.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn MediaBackend>>,
}

impl BackendRegistry {
    /// Pings every candidate concurrently and keeps the ones that answer, ordered by name.
    pub async fn connect(candidates: Vec<Arc<dyn MediaBackend>>) -> Self {
        let width = candidates
            .iter()
            .map(|backend| backend.endpoint().len())
            .max()
            .unwrap_or(0);

        let checks = candidates.into_iter().map(|backend| async move {
            let endpoint = backend.endpoint();
            match backend.ping().await {
                Ok(()) => {
                    info!("Check server: {:>width$} [connected]", endpoint);
                    Some(backend)
                }
                Err(e) => {
                    error!("Check server: {:>width$} [not connected] {}", endpoint, e);
                    None
                }
            }
        });

        let mut backends: Vec<_> = join_all(checks).await.into_iter().flatten().collect();
        backends.sort_by(|a, b| a.name().cmp(b.name()));

        Self { backends }
    }

    /// Wraps backends that are already known to be live, keeping their order.
    pub fn from_live(backends: Vec<Arc<dyn MediaBackend>>) -> Self {
        Self { backends }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn MediaBackend>> {
        self.backends.iter().find(|backend| backend.name() == name)
    }

    pub fn live(&self) -> &[Arc<dyn MediaBackend>] {
        &self.backends
    }

    pub fn names(&self) -> Vec<String> {
        self.backends
            .iter()
            .map(|backend| backend.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
