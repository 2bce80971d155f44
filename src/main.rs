use std::sync::Arc;
use tokio::net::TcpListener;
use traffic_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router, database,
    repository::{PostgresRepository, RepositoryState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Startup contract: configuration, logging, store connection, HTTP server.
/// Any failure before the server is listening is fatal, so a supervisor
/// sees the process die with a clear message and restarts it.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail fast on missing DATABASE_URL / production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "traffic_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Store: one pool for the whole process, injected through AppState.
    let pool = match database::connect(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "FATAL: store initialisation failed");
            std::process::exit(1);
        }
    };
    let repo = Arc::new(PostgresRepository::new(pool.clone())) as RepositoryState;

    // 4. Router and server.
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState { repo, config });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind the HTTP listener");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server error");

    // 5. Shutdown: drain the pool once the server has stopped accepting requests.
    pool.close().await;
    tracing::info!("Server shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
