//! Earlywarn Server Module
//!
//! REST API for student academic risk scoring. Serves a single loaded
//! model and answers each prediction with a probability, a label, and a
//! rendered explanation chart.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::{PredictRequest, PredictResponse};
pub use state::{AppState, PipelineState};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::pipeline::RiskPipeline;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub schema_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "./risk_model.json".to_string())
                .into(),
            schema_path: std::env::var("SCHEMA_PATH")
                .unwrap_or_else(|_| "./model_columns.json".to_string())
                .into(),
        }
    }
}

/// Load the pipeline for serving, degrading instead of exiting when the
/// artifacts are unusable.
pub fn load_pipeline_state(config: &ServerConfig) -> PipelineState {
    match RiskPipeline::load(&config.model_path, &config.schema_path) {
        Ok(pipeline) => {
            info!(
                model = %config.model_path.display(),
                columns = pipeline.schema().len(),
                trees = pipeline.model().n_trees(),
                "Model and schema loaded"
            );
            PipelineState::Ready(Arc::new(pipeline))
        }
        Err(e) => {
            error!(
                model = %config.model_path.display(),
                schema = %config.schema_path.display(),
                error = %e,
                "Could not load model assets; serving degraded"
            );
            PipelineState::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        model = %config.model_path.display(),
        schema = %config.schema_path.display(),
        started_at = %start_time.to_rfc3339(),
        "Loading model and assets"
    );

    let pipeline = load_pipeline_state(&config);
    let state = Arc::new(AppState::new(config.clone(), pipeline));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        "Earlywarn server starting"
    );
    info!(url = %format!("http://{}/predict", addr), "Prediction endpoint available");
    info!(url = %format!("http://{}/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    // Graceful shutdown on ctrl+c
    let start_time_for_shutdown = start_time;
    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time_for_shutdown);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    info!("Server started successfully (press ctrl+c to stop)");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_paths() {
        // Only assert fields that env vars are unlikely to override in CI.
        let config = ServerConfig::default();
        assert!(config.model_path.to_string_lossy().ends_with("risk_model.json"));
        assert!(config
            .schema_path
            .to_string_lossy()
            .ends_with("model_columns.json"));
    }
}
