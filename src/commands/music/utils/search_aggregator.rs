use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::commands::music::audio_sources::{BackendRegistry, Track};

/// Fans a query out to every live backend and merges what comes back.
#[derive(Clone)]
pub struct SearchAggregator {
    backends: Arc<BackendRegistry>,
}

impl SearchAggregator {
    pub fn new(backends: Arc<BackendRegistry>) -> Self {
        Self { backends }
    }

    /// Searches all backends concurrently and returns at most `limit` tracks.
    ///
    /// Each backend gets an equal share of `limit` (rounded up) so a large library
    /// cannot crowd out the others. Results keep backend order, then server order.
    /// A backend that fails or finds nothing contributes nothing; an empty result
    /// is a normal answer, not an error.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Track> {
        let backends = self.backends.live();
        if limit == 0 || backends.is_empty() {
            warn!("No server to search for query: {}", query);
            return Vec::new();
        }

        let per_backend = limit.div_ceil(backends.len());

        let searches = backends.iter().map(|backend| async move {
            let name = backend.name();
            match backend.search(query, per_backend).await {
                Ok(tracks) if !tracks.is_empty() => {
                    let tracks: Vec<Track> = tracks
                        .into_iter()
                        .take(per_backend)
                        .map(|track| track.from_backend(name))
                        .collect();
                    info!(
                        "Found {} result{} on {} for query: {}",
                        tracks.len(),
                        if tracks.len() == 1 { "" } else { "s" },
                        name,
                        query
                    );
                    tracks
                }
                Ok(_) => {
                    warn!("No results found on {} for query: {}", name, query);
                    Vec::new()
                }
                Err(e) => {
                    error!("Search on {} failed for query {}: {}", name, query, e);
                    Vec::new()
                }
            }
        });

        let mut tracks: Vec<Track> = join_all(searches).await.into_iter().flatten().collect();
        tracks.truncate(limit);

        if tracks.is_empty() {
            warn!("No server returned results for query: {}", query);
        }
        tracks
    }
}
