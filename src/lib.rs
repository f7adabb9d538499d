use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod ai;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod security;
pub mod state;

use config::AppConfig;
use routes::{mount_tables, not_found, RouteTableError};
use security::{get_cors_layer, security_headers_middleware};
use state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Mounts every route table on one router and applies the shared layers.
pub fn create_app_router(app_state: Arc<AppState>) -> Result<Router, RouteTableError> {
    let api_router = mount_tables(api::route_tables(), &app_state)?;

    Ok(api_router
        .fallback(not_found)
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)) // 📦 1MB, JSON bodies only
        .layer(TraceLayer::new_for_http())
        .layer(get_cors_layer())
        .layer(axum_middleware::from_fn(security_headers_middleware)))
}

/// Builds the application and, outside the test environment, serves it on
/// `0.0.0.0:PORT` until a shutdown signal arrives.
///
/// A database that can't be reached fails here, before anything is bound.
pub async fn launch(config: AppConfig) -> anyhow::Result<Router> {
    let app_state = AppState::connect(&config).await?;
    info!("🚀 Application state initialized ({})", config.environment.as_str());

    let app = create_app_router(Arc::new(app_state))?;

    if config.environment.is_test() {
        info!("🧪 Test environment, listener not started");
        return Ok(app);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Server running on port {}", config.port);

    axum::serve(listener, app.clone())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(app)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
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

    info!("signal received, starting graceful shutdown");
}
