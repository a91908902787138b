// src/main.rs

use std::{net::SocketAddr, sync::Arc};

use dotenvy::dotenv;
use econzones::{
    config::Config,
    db, routes,
    state::AppState,
    utils::storage::LocalObjectStore,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Err(e) = run(config).await {
        tracing::error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = std::path::Path::new(config.database_url.trim_start_matches("sqlite://"))
        .parent()
        .filter(|p| !p.as_os_str().is_empty() && !config.database_url.contains(":memory:"))
    {
        tokio::fs::create_dir_all(dir).await?;
    }

    let pool = db::connect(&config.database_url, 5).await?;

    // Seed Admin User
    if let Err(e) = db::seed_admin_user(&pool, &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let storage = LocalObjectStore::new(config.bucket_dir());
    storage.ensure_bucket().await?;
    tracing::info!("Document bucket at {}", storage.root().display());

    let port = config.port;
    let state = AppState::new(pool, config, Arc::new(storage));

    // Create the Axum application router
    let app = routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
