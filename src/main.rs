//! Application entry point and server initialization
//!
//! Loads configuration, opens the configured storage backend and serves the
//! API with graceful shutdown.

use std::error::Error;

use axum::http::{HeaderValue, Method};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use toyshop::auth::hash_password;
use toyshop::config::{Config, StorageConfig};
use toyshop::route::create_app;
use toyshop::service::NewUser;
use toyshop::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("toyshop=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();

    match &config.storage {
        StorageConfig::Redb { path } => tracing::info!(path = %path, "using redb storage"),
        StorageConfig::JsonFiles { dir } => {
            tracing::info!(dir = %dir.display(), "using JSON file storage")
        }
    }
    let state = AppState::open(&config.storage, config.auth.clone()).await?;

    // Bootstrap the admin account, if one is configured
    if let Some(seed) = &config.admin {
        let admin = state
            .users
            .ensure_admin(NewUser {
                username: seed.username.clone(),
                password_hash: hash_password(&seed.password)?,
                fullname: seed.fullname.clone(),
                score: None,
                is_admin: true,
            })
            .await?;
        tracing::info!(user_id = %admin.id, username = %admin.username, "admin account ready");
    }

    let origins = config
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true);

    let app = create_app(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://127.0.0.1:{}/", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
///
/// Lets in-flight requests finish and redb commit before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server");
}
