use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use subsonic_bot::commands::music::{
    self,
    audio_sources::{BackendRegistry, MediaBackend, subsonic::SubsonicClient},
    utils::{
        audio_sink::SongbirdSink, guild_session::SessionSettings, music_manager::MusicManager,
        voice_session::SongbirdGateway,
    },
};
use subsonic_bot::events::Handler;
use subsonic_bot::utils::config::{self, ConfigError};
use subsonic_bot::{Data, Error, gateway_intents, help, register};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("subsonic_bot=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Arc::new(config::load_config(&config::config_path())?);
    let credentials = config::load_credentials(&config::credentials_path())?;
    let token = credentials.discord_token()?;

    let mut candidates: Vec<Arc<dyn MediaBackend>> = Vec::new();
    for server in credentials.subsonic {
        let name = server.name.clone();
        match SubsonicClient::new(server) {
            Ok(client) => candidates.push(Arc::new(client)),
            Err(e) => error!("Skipping server {}: {}", name, e),
        }
    }
    if candidates.is_empty() {
        return Err(ConfigError::NoBackends.into());
    }

    let backends = Arc::new(BackendRegistry::connect(candidates).await);
    if backends.is_empty() {
        warn!("No Subsonic server is reachable, searches will find nothing");
    }

    let songbird = Songbird::serenity();
    let music = Arc::new(MusicManager::new(
        backends,
        Arc::new(SongbirdGateway::new(songbird.clone())),
        SongbirdSink::factory(songbird.clone(), reqwest::Client::new(), config.volume),
        SessionSettings {
            history_limit: config.history_limit,
            auto_leave: config.auto_leave,
        },
    ));

    let intents = gateway_intents();

    let mut commands = vec![register(), help()];
    commands.extend(music::commands());

    let data = Data {
        music: music.clone(),
        config: config.clone(),
    };
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        });

    let mut client = ClientBuilder::new(token, intents)
        .event_handler(Handler {
            music: music.clone(),
            config,
        })
        .framework(framework.build())
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down");
        music.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    client.start().await.map_err(Into::into)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let term = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = term => {},
    }

    warn!("Shutdown signal received.");
}
