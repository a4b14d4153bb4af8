use std::net::SocketAddr;

use evkin_api::config;
use evkin_api::database::DatabaseManager;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("evkin_api=info,tower_http=info")),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting E-EVKIN API in {:?} mode", config.environment);

    if config.database.auto_migrate {
        // the server still starts without a database; /health reports it
        if let Err(e) = DatabaseManager::migrate().await {
            tracing::error!("Auto-migration failed: {}", e);
        }
    }

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("E-EVKIN API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        evkin_api::app().into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    DatabaseManager::close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
