use anyhow::{Context, Result};
use liftstream::api::{create_router, AppState};
use liftstream::changelog::ChangeLog;
use liftstream::config::load_config_or_default;
use liftstream::poller::FacilityClient;
use liftstream::simulator::quiet_cycle_for;
use liftstream::snapshot::SnapshotFile;
use liftstream::{Feed, Publisher, StateStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftstream=info".into()),
        )
        .init();

    info!("Liftstream starting...");

    let config_path = std::env::var("LIFTSTREAM_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("liftstream.toml"));

    let mut config = load_config_or_default(&config_path).context("Failed to load config")?;
    config.apply_env();

    // Restore state; a corrupt state file must stop startup
    let store = Arc::new(StateStore::new());
    let snapshot = config.feed.state_file().map(SnapshotFile::new);
    match &snapshot {
        Some(file) => {
            file.restore(&store)
                .context("Failed to restore state file")?;
        }
        None => info!("State file disabled, starting with empty state"),
    }

    let publisher = Arc::new(Publisher::new(config.server.sink_capacity));

    let client = FacilityClient::new(
        config.feed.endpoint.clone(),
        &config.feed.user_agent,
        config.feed.request_timeout(),
    )
    .context("Failed to build HTTP client")?;

    let mut feed = Feed::new(
        Arc::clone(&store),
        Arc::clone(&publisher),
        Box::new(client),
        config.feed.interval(),
    )
    .with_quiet_cycle(quiet_cycle_for(config.feed.dev));

    if config.feed.dev {
        warn!("Development mode: simulated changes will be published");
    }
    if let Some(file) = snapshot {
        feed = feed.with_snapshot(file);
    }
    if let Some(path) = &config.feed.logfile {
        let changelog = ChangeLog::open(path)
            .await
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        feed = feed.with_changelog(changelog);
    }

    let feed = Arc::new(feed);
    let mut errors = feed.subscribe_errors();
    tokio::spawn(async move {
        while let Ok(event) = errors.recv().await {
            debug!(reason = %event.reason, at = %event.timestamp, "Feed error");
        }
    });

    let feed_handle = Arc::clone(&feed).start();

    let app = create_router(Arc::new(AppState {
        store: Arc::clone(&store),
        publisher: Arc::clone(&publisher),
    }));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Could not bind to {}", addr))?;
    info!(addr = %addr, "Server listening");

    let shutdown_publisher = Arc::clone(&publisher);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
            // Ends open streams so in-flight connections can finish
            shutdown_publisher.close_all();
        })
        .await
        .context("Server error")?;

    feed_handle.stop().await;
    info!("Liftstream stopped");
    Ok(())
}
