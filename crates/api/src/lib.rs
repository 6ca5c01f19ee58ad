//! Malaria Cell Classifier API Server
//!
//! HTTP front end for the cell image classifier.

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use inference_engine::{InferencePipeline, ModelHandle};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn, Level};

pub mod config;
pub mod error;
pub mod routes;

pub use config::{LoggingConfig, ModelConfig, ServerConfig, ServiceConfig};
pub use error::ApiError;

/// Application state shared across handlers.
///
/// Read-only after startup.
pub struct AppState {
    /// Request pipeline holding the model handle
    pub pipeline: InferencePipeline,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(pipeline: InferencePipeline) -> Self {
        Self {
            pipeline,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .route("/predict", post(routes::predict::predict))
        .route("/api/predict", post(routes::predict::predict));

    if let Some(dir) = &server.static_dir {
        info!("Serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown log level {:?}", config.level))?;

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {}", e))
}

/// Load the model according to the deployment policy.
///
/// With `require_model` a load failure is fatal; otherwise the service starts
/// degraded and every prediction reports the model as unavailable.
pub fn load_model(config: &ModelConfig) -> anyhow::Result<ModelHandle> {
    match ModelHandle::load(&config.artifact_path) {
        Ok(handle) => Ok(handle),
        Err(e) if config.require_model => {
            Err(e).context("model.require_model is set; refusing to start without a model")
        }
        Err(e) => {
            warn!(
                "Starting in degraded mode ({}): predictions will fail until the model artifact is fixed",
                e
            );
            Ok(ModelHandle::unavailable(&config.artifact_path))
        }
    }
}

/// Run the server
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    let model = load_model(&config.model)?;
    let pipeline = InferencePipeline::new(Arc::new(model), config.model.labels);

    let mut state = AppState::new(pipeline);
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!("Metrics recorder not installed: {}", e),
    }

    let app = create_router(Arc::new(state), &config.server);

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            artifact_path: dir.path().join("absent.onnx"),
            ..Default::default()
        };

        let handle = load_model(&config).unwrap();
        assert!(!handle.is_loaded());
        assert_eq!(handle.artifact_path(), config.artifact_path.as_path());
    }

    #[test]
    fn test_missing_model_fatal_when_required() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            artifact_path: dir.path().join("absent.onnx"),
            require_model: true,
            ..Default::default()
        };

        assert!(load_model(&config).is_err());
    }
}
