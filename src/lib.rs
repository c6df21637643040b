//! Earlywarn - Student academic risk scoring service
//!
//! This crate serves a trained gradient-boosted risk model:
//! - Dense feature rows built from three request fields
//! - Probability scoring with a fixed High Risk / Safe boundary
//! - Exact per-feature attributions rendered as a chart per prediction
//! - HTTP server and CLI interfaces
//!
//! # Modules
//!
//! ## Scoring core
//! - [`schema`] - Training-time column list and feature row construction
//! - [`model`] - Gradient boosted tree ensemble and its JSON artifact
//! - [`scorer`] - Probability and label over a feature row
//!
//! ## Explanations
//! - [`explain`] - Decision-path attributions and chart rendering
//!
//! ## Services
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface
//!
//! ## Supporting
//! - [`pipeline`] - Startup assembly and per-request orchestration
//! - [`demo`] - Demonstration artifacts for local use

// Core error handling
pub mod error;

// Scoring core
pub mod model;
pub mod schema;
pub mod scorer;

// Explanations
pub mod explain;

// Orchestration
pub mod demo;
pub mod pipeline;

// Services
pub mod cli;
pub mod server;

pub use error::{EarlywarnError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{EarlywarnError, Result};

    // Scoring
    pub use crate::model::{GradientBoostedTrees, TreeNode};
    pub use crate::schema::{FeatureRow, FeatureSchema};
    pub use crate::scorer::{RiskLabel, RiskScore, RiskScorer};

    // Explanations
    pub use crate::explain::{
        Attribution, Explanation, FeatureContribution, ForcePlotRenderer, RenderConfig,
        TreeAttributor,
    };

    // Orchestration
    pub use crate::pipeline::{Prediction, RiskPipeline};

    // Server
    pub use crate::server::{AppState, PipelineState, ServerConfig};
}
