//! Application state management

use std::sync::Arc;

use crate::pipeline::RiskPipeline;

use super::error::ServerError;
use super::ServerConfig;

/// Whether the serving pipeline came up at startup.
///
/// Artifact problems leave the process running in a degraded state that
/// answers health checks and refuses predictions, instead of serving from
/// half-initialized globals.
pub enum PipelineState {
    Ready(Arc<RiskPipeline>),
    Unavailable { reason: String },
}

impl PipelineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, PipelineState::Ready(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            PipelineState::Ready(_) => None,
            PipelineState::Unavailable { reason } => Some(reason),
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub pipeline: PipelineState,
}

impl AppState {
    pub fn new(config: ServerConfig, pipeline: PipelineState) -> Self {
        Self { config, pipeline }
    }

    /// The pipeline, or the 503 the caller should get while degraded.
    pub fn pipeline(&self) -> Result<&Arc<RiskPipeline>, ServerError> {
        match &self.pipeline {
            PipelineState::Ready(pipeline) => Ok(pipeline),
            PipelineState::Unavailable { reason } => Err(ServerError::NotReady(reason.clone())),
        }
    }
}
