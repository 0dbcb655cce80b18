use std::sync::Arc;
use std::time::Duration;

use clip_daemon::avatar::AvatarCache;
use clip_daemon::callback::callback_channel;
use clip_daemon::clipboard::SystemClipboard;
use clip_daemon::error::StartupError;
use clip_daemon::menu::HeadlessMenu;
use clip_daemon::player::CommandPlayer;
use clip_daemon::streamlink::Streamlink;
use clip_daemon::twitch::{FollowedChannels, TwitchClient};
use clip_daemon::{http, notifier, Lifecycle, RunSettings, Services};
use clip_proto::config::Config;
use clip_proto::platform;
use tracing::{error, info};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join(format!("{}.log", clip_proto::APP_NAME));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("debug,hyper_util=warn,reqwest=warn,hyper=warn")
            }),
        )
        .with_ansi(false)
        .init();

    eprintln!("Logs: {}", log_path.display());
    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    // Everything that can be missing is checked before any task starts.
    let client = Arc::new(TwitchClient::from_config(&config.twitch)?);
    let resolver = Streamlink::from_config(&config.streamlink)?;
    let player = CommandPlayer::from_config(&config.player).map_err(StartupError::from)?;
    let channels = FollowedChannels::connect(Arc::clone(&client))
        .await
        .map_err(StartupError::from)?;

    let user = channels.user();
    let connected_as = if user.display_name.is_empty() {
        &user.login
    } else {
        &user.display_name
    };
    info!("Connected as {}", connected_as);

    let menu = HeadlessMenu::new();
    menu.add_label(&format!("Connected as {}", connected_as));

    let (callback_tx, callback_rx) = callback_channel();
    let notifier = notifier::select(&config.notifications, callback_tx.clone());

    let services = Services {
        channels: Arc::new(channels),
        avatars: Arc::new(AvatarCache::new(client, platform::avatar_cache_dir())),
        resolver: Arc::new(resolver),
        player: Arc::new(player),
        notifier,
        clipboard: Arc::new(SystemClipboard::new()),
        menu: Arc::new(menu),
    };
    let settings = RunSettings {
        poll_interval: config.poller.interval(),
        resolve_timeout: config.streamlink.timeout(),
    };

    let lifecycle = Lifecycle::start(services, settings, callback_rx);

    let http_handle = if config.http.enabled {
        match http::start_server(
            &config.http.bind_address,
            config.http.port,
            lifecycle.registry(),
            callback_tx,
            lifecycle.cancel_token(),
        )
        .await
        {
            Ok((addr, handle)) => {
                eprintln!("HTTP API: http://{}", addr);
                Some(handle)
            }
            Err(e) => {
                error!("Failed to start HTTP server: {}", e);
                None
            }
        }
    } else {
        drop(callback_tx);
        None
    };

    info!("Daemon initialised, waiting for Ctrl-C");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("unable to listen for shutdown signal: {}", e);
    }

    let clean = lifecycle.shutdown(SHUTDOWN_GRACE).await;
    if let Some(handle) = http_handle {
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, handle).await;
    }
    info!("stopped{}", if clean { "" } else { " (some tasks did not finish)" });
    Ok(())
}
