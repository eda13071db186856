//! Defines the `Track` struct, the one shape a song takes once it leaves a media backend.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A playable song as reported by one of the registered backends.
///
/// Created when search results come in and never mutated afterwards; the queue,
/// the history and the menus all hold their own clones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    /// Identifier, only meaningful to the backend named in `backend`.
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Length in whole seconds; 0 when the server does not know.
    pub duration_secs: u64,
    /// Name of the backend the track was found on.
    pub backend: String,
}

impl Track {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Returns the same track attributed to `backend`.
    pub fn from_backend(self, backend: &str) -> Self {
        Self {
            backend: backend.to_string(),
            ..self
        }
    }
}

/// Field of a track used to bulk-remove entries from a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackField {
    Artist,
    Album,
    Title,
}

impl TrackField {
    pub fn value<'a>(&self, track: &'a Track) -> &'a str {
        match self {
            TrackField::Artist => &track.artist,
            TrackField::Album => &track.album,
            TrackField::Title => &track.title,
        }
    }
}
