//! Weatherboy - Backend Server
//!
//! Runs the IMD feed ingestion scheduler and serves the flood-risk read API.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weatherboy_backend::{
    config::Config,
    create_app,
    external::{ChatCompletionSummarizer, FeedClient, PdfToTextExtractor, Summarizer, TextExtractor},
    ingest::{build_adapters, IngestPipeline},
    repository::{PgRepository, Repository},
    scheduler::Scheduler,
    AppState,
};

const DEFAULT_LOG_FILTER: &str =
    "weatherboy=debug,weatherboy_backend=debug,tower_http=debug,sqlx=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::load().context("Failed to load configuration")?;

    tracing::info!("Starting Weatherboy server");
    tracing::info!("Environment: {}", config.environment);

    let registry = config.location_registry()?;
    tracing::info!(locations = registry.len(), "Location registry loaded");

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Migrations completed");

    let repo: Arc<dyn Repository> = Arc::new(PgRepository::new(db_pool));
    let timeout = Duration::from_secs(config.feeds.request_timeout_secs);

    let scheduler = if config.scheduler.enabled {
        let pipeline = Arc::new(IngestPipeline::new(
            FeedClient::new(timeout)?,
            repo.clone(),
            &config.storage.data_dir,
        ));
        let extractor: Arc<dyn TextExtractor> =
            Arc::new(PdfToTextExtractor::new(config.bulletin.pdftotext_path.clone()));
        let summarizer: Arc<dyn Summarizer> = Arc::new(ChatCompletionSummarizer::new(
            config.bulletin.summarizer_endpoint.clone(),
            config.bulletin.summarizer_api_key.clone(),
            config.bulletin.summarizer_model.clone(),
            timeout,
        )?);

        let adapters = build_adapters(&registry, &config.feeds, pipeline, extractor, summarizer);
        let scheduler = Scheduler::new(adapters, &config.scheduler);
        scheduler.start();
        Some(scheduler)
    } else {
        tracing::info!("Ingestion scheduler disabled");
        None
    };

    let app = create_app(AppState::new(repo, registry));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(scheduler) = scheduler {
        let grace = Duration::from_secs(config.scheduler.shutdown_grace_secs);
        scheduler.shutdown(grace).await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Human readable logs by default, JSON lines when `WEATHERBOY_LOG_FORMAT=json`
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("WEATHERBOY_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
