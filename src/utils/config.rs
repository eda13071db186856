//! Start-up configuration: Discord/Subsonic credentials and bot settings.
//!
//! Both files are JSON and are read once. `credentials.json` files written by
//! older versions (a single `subsonic` object) are converted in place, keeping a
//! backup of the original. `config.json` is created from defaults when missing
//! and gains any keys introduced since it was written.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::commands::music::audio_sources::subsonic::BackendCredentials;

pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
const CREDENTIALS_BACKUP_V1: &str = "credentials.bak-v1.json";
const CREDENTIALS_VERSION: u32 = 2;

/// Errors raised while loading configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No Discord token in DISCORD_TOKEN or the credentials file")]
    MissingToken,

    #[error("No Subsonic servers configured")]
    NoBackends,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Bot behaviour settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Entries per page in search and queue menus.
    pub max_page_entries: usize,
    /// Show which server a track comes from.
    pub show_provider: bool,
    /// Playback volume, 1.0 being unchanged.
    pub volume: f32,
    /// Number of played tracks kept per guild.
    pub history_limit: usize,
    /// Leave voice this long after the queue runs dry. Disabled when absent.
    #[serde(with = "humantime_serde")]
    pub auto_leave: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_page_entries: 10,
            show_provider: true,
            volume: 0.1,
            history_limit: 100,
            auto_leave: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscordCredentials {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub client_id: String,
}

/// Contents of `credentials.json` (version 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub version: u32,
    #[serde(default)]
    pub discord: DiscordCredentials,
    #[serde(default)]
    pub subsonic: Vec<BackendCredentials>,
}

impl Credentials {
    /// The Discord token, `DISCORD_TOKEN` taking precedence over the file.
    pub fn discord_token(&self) -> ConfigResult<String> {
        match env::var("DISCORD_TOKEN") {
            Ok(token) if !token.is_empty() => Ok(token),
            _ if !self.discord.token.is_empty() => Ok(self.discord.token.clone()),
            _ => Err(ConfigError::MissingToken),
        }
    }
}

/// Pre-version-2 layout: exactly one server.
#[derive(Debug, Deserialize)]
struct LegacyCredentials {
    #[serde(default)]
    discord: DiscordCredentials,
    subsonic: LegacyServer,
}

#[derive(Debug, Deserialize)]
struct LegacyServer {
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<Value>,
    username: String,
    password: String,
}

pub fn credentials_path() -> PathBuf {
    env::var("CREDENTIALS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CREDENTIALS_PATH))
}

pub fn config_path() -> PathBuf {
    env::var("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn read_json(path: &Path) -> ConfigResult<Value> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> ConfigResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the credentials file, migrating version 1 files first.
pub fn load_credentials(path: &Path) -> ConfigResult<Credentials> {
    let raw = read_json(path)?;

    let version = raw.get("version").and_then(Value::as_u64).unwrap_or(1);
    let credentials = if version < CREDENTIALS_VERSION as u64 {
        info!("Found old credentials file. Converting to version {}...", CREDENTIALS_VERSION);
        let credentials = migrate_credentials(raw.clone(), path)?;

        let backup = path.with_file_name(CREDENTIALS_BACKUP_V1);
        write_json(&backup, &raw)?;
        write_json(path, &credentials)?;
        credentials
    } else {
        serde_json::from_value(raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    };

    if credentials.subsonic.is_empty() {
        return Err(ConfigError::NoBackends);
    }

    Ok(credentials)
}

fn migrate_credentials(raw: Value, path: &Path) -> ConfigResult<Credentials> {
    let legacy: LegacyCredentials =
        serde_json::from_value(raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let host = legacy
        .subsonic
        .host
        .unwrap_or_else(|| "localhost".to_string());
    let port = match legacy.subsonic.port {
        Some(Value::String(port)) => port,
        Some(Value::Number(port)) => port.to_string(),
        _ => "80".to_string(),
    };

    Ok(Credentials {
        version: CREDENTIALS_VERSION,
        discord: legacy.discord,
        subsonic: vec![BackendCredentials {
            name: server_name_from_host(&host),
            protocol: legacy.subsonic.protocol.unwrap_or_else(|| "http".to_string()),
            host,
            port: Some(port.into()),
            username: legacy.subsonic.username,
            password: legacy.subsonic.password,
        }],
    })
}

/// `music.example.com` becomes `example`; a bare host keeps its only label.
fn server_name_from_host(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    let index = if labels.len() > 1 { labels.len() - 2 } else { 0 };
    labels[index].to_string()
}

/// Loads `config.json`, creating it or adding missing keys as needed.
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let defaults = serde_json::to_value(Config::default()).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if !path.exists() {
        info!("Config file not found. Creating a new one...");
        write_json(path, &defaults)?;
        return Ok(Config::default());
    }

    let mut raw = read_json(path)?;
    if let (Some(current), Some(template)) = (raw.as_object_mut(), defaults.as_object()) {
        for (key, value) in template {
            if !current.contains_key(key) {
                info!("Config is outdated. Adding missing key: {}", key);
                current.insert(key.clone(), value.clone());
            }
        }
    }
    write_json(path, &raw)?;

    serde_json::from_value(raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}
