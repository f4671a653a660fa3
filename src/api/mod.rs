mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::contracts::DocumentStore;

pub use handlers::{
    ApiError, AppState, ErrorResponse, ListQuery, ListResponse, Metrics, OpStats, StatsResponse,
};

/// Creates the API router.
pub fn create_router<S: DocumentStore + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats::<S>))
        .route(
            "/:collection",
            get(handlers::list_documents::<S>).post(handlers::create_document::<S>),
        )
        .route(
            "/:collection/:id",
            get(handlers::get_document::<S>)
                .put(handlers::update_document::<S>)
                .delete(handlers::delete_document::<S>),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Creates a config from environment variables.
    ///
    /// Reads:
    /// - `LIMSD_HOST`: Bind address (default: 0.0.0.0)
    /// - `LIMSD_PORT`: Listen port (default: 8080)
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("LIMSD_HOST").unwrap_or(default.host),
            port: std::env::var("LIMSD_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(default.port),
        }
    }
}

/// Starts the HTTP server.
pub async fn start_server<S, F>(
    config: ServerConfig,
    state: Arc<AppState<S>>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: DocumentStore + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
