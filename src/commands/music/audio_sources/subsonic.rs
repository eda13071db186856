//! Implements `MediaBackend` for servers speaking the Subsonic REST API
//! (Subsonic, Navidrome, Airsonic, Gonic, ...).
//!
//! Authentication uses the token scheme of API 1.13+: every request carries a
//! fresh random salt `s` and `t = md5(password + salt)`, so stream URLs handed
//! to the voice driver never contain the password itself.

use md5::{Digest, Md5};
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, RANGE};
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{MediaBackend, Track};
use crate::commands::music::utils::music_manager::{MusicError, MusicResult};

const API_VERSION: &str = "1.16.1";
const CLIENT_NAME: &str = "subsonic-music-bot";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SALT_LENGTH: usize = 13;

/// A port as written in the credentials file, either `"4533"` or `4533`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Port {
    Number(u16),
    Text(String),
}

impl From<String> for Port {
    fn from(value: String) -> Self {
        Port::Text(value)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Number(port) => write!(f, "{}", port),
            Port::Text(port) => write!(f, "{}", port),
        }
    }
}

/// One entry of the `subsonic` list in `credentials.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCredentials {
    pub name: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<Port>,
    pub username: String,
    pub password: String,
}

fn default_protocol() -> String {
    "http".to_string()
}

impl BackendCredentials {
    /// `host[:port]`, as shown in the start-up log.
    pub fn host_port(&self) -> String {
        match &self.port {
            Some(port) if !port.to_string().is_empty() => format!("{}:{}", self.host, port),
            _ => self.host.clone(),
        }
    }

    /// Base of every API endpoint, e.g. `https://music.example.com:443/rest/`.
    pub fn api_base(&self) -> MusicResult<Url> {
        let raw = format!("{}://{}/rest/", self.protocol, self.host_port());
        Url::parse(&raw).map_err(|e| MusicError::Config(format!("Invalid server URL {}: {}", raw, e)))
    }
}

/// Envelope wrapping every JSON answer of the API.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "subsonic-response")]
    response: SubsonicResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubsonicResponse {
    status: String,
    #[serde(default)]
    error: Option<SubsonicApiError>,
    #[serde(default)]
    search_result2: Option<SearchResult2>,
}

#[derive(Debug, Deserialize)]
struct SubsonicApiError {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult2 {
    #[serde(default)]
    song: Vec<SubsonicSong>,
}

/// A song entry as servers actually send it: anything may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubsonicSong {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
}

impl SubsonicSong {
    /// Normalizes a server entry into a `Track`; entries without an id cannot be streamed.
    pub fn into_track(self, backend: &str) -> Option<Track> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(Track {
            id,
            title: self.title.unwrap_or_else(|| "Unknown Title".to_string()),
            artist: self.artist.unwrap_or_else(|| "Unknown Artist".to_string()),
            album: self.album.unwrap_or_else(|| "Unknown Album".to_string()),
            duration_secs: self.duration.unwrap_or(0),
            backend: backend.to_string(),
        })
    }
}

/// Computes the `t` parameter for a given salt.
pub fn auth_token(password: &str, salt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn random_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

/// Client for a single Subsonic server.
pub struct SubsonicClient {
    credentials: BackendCredentials,
    base: Url,
    http: Client,
}

impl SubsonicClient {
    pub fn new(credentials: BackendCredentials) -> MusicResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MusicError::Config(format!("Unable to build HTTP client: {}", e)))?;
        Self::with_client(credentials, http)
    }

    pub fn with_client(credentials: BackendCredentials, http: Client) -> MusicResult<Self> {
        let base = credentials.api_base()?;
        Ok(Self {
            credentials,
            base,
            http,
        })
    }

    fn upstream(&self, reason: impl fmt::Display) -> MusicError {
        MusicError::Upstream {
            backend: self.credentials.name.clone(),
            reason: reason.to_string(),
        }
    }

    /// Builds an authenticated URL for `method` with the given extra parameters.
    fn endpoint(&self, method: &str, params: &[(&str, &str)]) -> MusicResult<Url> {
        let mut url = self
            .base
            .join(&format!("{}.view", method))
            .map_err(|e| self.upstream(e))?;

        let salt = random_salt();
        let token = auth_token(&self.credentials.password, &salt);
        url.query_pairs_mut()
            .append_pair("u", &self.credentials.username)
            .append_pair("t", &token)
            .append_pair("s", &salt)
            .append_pair("v", API_VERSION)
            .append_pair("c", CLIENT_NAME)
            .append_pair("f", "json")
            .extend_pairs(params);

        Ok(url)
    }

    /// Calls `method` and returns the response body once the server reported `ok`.
    async fn call(&self, method: &str, params: &[(&str, &str)]) -> MusicResult<SubsonicResponse> {
        let url = self.endpoint(method, params)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.upstream(e))?
            .error_for_status()
            .map_err(|e| self.upstream(e))?;

        let envelope: Envelope = response.json().await.map_err(|e| self.upstream(e))?;
        check_status(envelope.response).map_err(|reason| self.upstream(reason))
    }
}

fn check_status(response: SubsonicResponse) -> Result<SubsonicResponse, String> {
    if response.status == "ok" {
        return Ok(response);
    }
    Err(match &response.error {
        Some(error) => format!("error {}: {}", error.code, error.message),
        None => format!("status {}", response.status),
    })
}

#[async_trait]
impl MediaBackend for SubsonicClient {
    fn name(&self) -> &str {
        &self.credentials.name
    }

    fn endpoint(&self) -> String {
        self.credentials.host_port()
    }

    async fn ping(&self) -> MusicResult<()> {
        self.call("ping", &[]).await.map(|_| ())
    }

    async fn search(&self, query: &str, count: usize) -> MusicResult<Vec<Track>> {
        let count = count.to_string();
        let response = self
            .call(
                "search2",
                &[
                    ("query", query),
                    ("songCount", &count),
                    ("artistCount", "0"),
                    ("albumCount", "0"),
                ],
            )
            .await?;

        let songs = response.search_result2.unwrap_or_default().song;
        let tracks: Vec<Track> = songs
            .into_iter()
            .filter_map(|song| song.into_track(self.name()))
            .collect();

        debug!("{} returned {} songs for '{}'", self.name(), tracks.len(), query);
        Ok(tracks)
    }

    async fn stream_url(&self, id: &str) -> MusicResult<Url> {
        let url = self.endpoint("stream", &[("id", id)])?;

        // Servers answer stream errors with a 200 and an API envelope instead of audio.
        let response = self
            .http
            .get(url.clone())
            .header(RANGE, "bytes=0-1")
            .send()
            .await
            .map_err(|e| self.upstream(e))?
            .error_for_status()
            .map_err(|e| self.upstream(e))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.contains("json") || content_type.contains("xml") {
            let reason = match response.json::<Envelope>().await {
                Ok(envelope) => check_status(envelope.response)
                    .err()
                    .unwrap_or_else(|| "no audio in stream response".to_string()),
                Err(e) => e.to_string(),
            };
            warn!("Stream handshake for {} on {} failed: {}", id, self.name(), reason);
            return Err(self.upstream(reason));
        }

        info!("Obtained stream URL for {} from {}", id, self.name());
        Ok(url)
    }
}
