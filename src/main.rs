use api_rest::{AppState, router};
use fm_core::{CoreConfig, FilesService, StatsService, Stores, UploadService, UserService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the files manager
///
/// Resolves configuration, starts connecting the document store and the cache in the
/// background, provisions the `users` and `files` collections once the document store is
/// ready, and serves the REST API. Requests arriving before the stores are connected are
/// answered (`/status` reports `false`, `/stats` reports zeros, writes fail with 500).
///
/// # Environment Variables
/// - `DB_HOST`, `DB_PORT`, `DB_DATABASE`: MongoDB location (default `localhost:27017/files_manager`)
/// - `REDIS_HOST`, `REDIS_PORT`: Redis location (default `localhost:6379`)
/// - `FOLDER_PATH`: storage root for uploaded bytes (default `/tmp/files_manager`)
/// - `PORT`: HTTP port (default `5000`)
/// - `STORE_BACKEND`: `external` or `memory` (default `external`)
/// - `STORE_CONNECT_TIMEOUT_MS`, `STORE_OPERATION_TIMEOUT_MS`, `STORE_HEARTBEAT_MS`
///
/// # Errors
/// Returns an error if:
/// - the logging configuration or any setting is invalid,
/// - the storage root cannot be created,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("files_manager=info".parse()?)
                .add_directive("fm_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
    let storage = FilesService::new(cfg.folder_path())?;
    tracing::info!("++ Storing uploads under {}", storage.root_directory().display());

    let stores = Stores::connect(&cfg);
    stores.provision();

    let state = AppState {
        stats: StatsService::new(stores.db.clone(), stores.cache.clone()),
        users: UserService::new(stores.db.clone()),
        uploads: UploadService::new(stores.db.clone(), storage),
    };

    let addr = format!("0.0.0.0:{}", cfg.port());
    tracing::info!("++ Starting files manager REST on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Files manager stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
