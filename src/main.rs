//! Application entry point and server initialization
//!
//! Loads configuration, opens the store, seeds listings when asked to and
//! serves the API until SIGINT/SIGTERM.

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fakebnb::config::Config;
use fakebnb::database::{AppState, Store};
use fakebnb::route::create_app;
use fakebnb::seed;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fakebnb=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();

    let store = match Store::open(&config.database_url) {
        Ok(store) => store,
        Err(err) => {
            error!(error = %err, path = %config.database_url, "failed to initialize database");
            std::process::exit(1);
        }
    };

    if let Some(path) = &config.seed_file {
        if let Err(err) = seed::import_file(&store, path).await {
            error!(error = %err, path = %path, "seeding failed");
            std::process::exit(1);
        }
    }

    let port = config.port;
    let db_name = config.database_url.clone();
    info!(policy = ?config.boundary_policy, auth = config.auth_token.is_some(), "configuration loaded");

    let state = AppState::new(store, config);
    let app = create_app(state).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = %addr, "failed to bind");
            std::process::exit(1);
        }
    };

    info!("🚀 Server running at http://localhost:{}", port);
    info!("📂 Using database: {}", db_name);

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %err, "server error");
    }
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install signal handler");
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

    info!("🛑 Shutdown signal received, stopping server.");
}
