mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamecaster_core::{
    config_path, load_config, validate_config, Announcer, AnnouncerConfig, CandidateResolver,
    CandidateScorer, ChatBackend, DedupLedger, GameCatalog, HttpFeedSource, HttpMediaFetcher,
    IgdbClient, MatrixClient, MediaFetcher, SanitizedConfig, SqliteLedger, ThreadComposer,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gamecaster_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("gamecaster {} starting", VERSION);

    let config_path = config_path();
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default();
    info!(config = %sanitized, "Configuration loaded successfully");

    let catalog: Arc<dyn GameCatalog> =
        Arc::new(IgdbClient::new(config.igdb.clone()).context("Failed to create IGDB client")?);

    let chat: Arc<dyn ChatBackend> = Arc::new(
        MatrixClient::new(config.matrix.clone(), config.media.retry.clone())
            .context("Failed to create Matrix client")?,
    );
    info!("Posting to room {}", config.matrix.room_id);

    let fetcher: Arc<dyn MediaFetcher> = Arc::new(
        HttpMediaFetcher::new(
            config.media.fetch_timeout(),
            config.media.max_image_bytes,
            config.media.retry.clone(),
        )
        .context("Failed to create media fetcher")?,
    );

    let ledger: Arc<dyn DedupLedger> = Arc::new(
        SqliteLedger::new(&config.database.path).context("Failed to open dedup ledger")?,
    );
    info!("Dedup ledger at {:?}", config.database.path);

    let feed = HttpFeedSource::new(config.feed.url.clone(), config.feed.timeout())
        .context("Failed to create feed client")?;

    let resolver = CandidateResolver::new(CandidateScorer::new(config.matcher.clone()));
    let composer = ThreadComposer::new(chat, fetcher, config.media.clone());
    let announcer = Announcer::new(
        catalog,
        ledger,
        resolver,
        composer,
        AnnouncerConfig::from(&config),
    );

    if let Some(addr) = config.metrics.listen {
        tokio::spawn(async move {
            if let Err(e) = metrics::serve(addr).await {
                error!("Metrics endpoint failed: {:#}", e);
            }
        });
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!(
        "Polling {} every {}s",
        config.feed.url, config.feed.poll_interval_secs
    );

    loop {
        if let Err(e) = announcer.run_once(&feed).await {
            warn!("Feed pass failed: {}", e);
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(config.feed.poll_interval()) => {}
        }
    }

    info!("gamecaster stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
