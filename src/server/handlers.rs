//! HTTP request handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pipeline::{Prediction, SETTABLE_COLUMNS};
use crate::scorer::RiskLabel;

use super::error::{Result, ServerError};
use super::state::AppState;

/// The three early-warning signals a caller provides.
///
/// By convention G1 is the first-period grade (0-20), absences a count,
/// and studytime the 1-4 weekly study band. Out-of-range integers are
/// scored as-is; only the types are enforced here.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "G1")]
    pub g1: i64,
    pub absences: i64,
    pub studytime: i64,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub risk_score: f64,
    pub label: RiskLabel,
    /// Encoded explanation chart; empty when the explanation stage failed.
    pub shap_image_base64: String,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            risk_score: prediction.probability,
            label: prediction.label,
            shap_image_base64: prediction.explanation.image_base64().to_string(),
        }
    }
}

/// Score one student and explain the result
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>> {
    let pipeline = state.pipeline()?;

    info!(
        g1 = request.g1,
        absences = request.absences,
        studytime = request.studytime,
        "Received prediction request"
    );

    let prediction = pipeline
        .predict(request.g1, request.absences, request.studytime)
        .map_err(|e| ServerError::Scoring(e.to_string()))?;

    info!(
        risk_score = prediction.probability,
        label = %prediction.label,
        explained = prediction.explanation.is_rendered(),
        "Prediction served"
    );

    Ok(Json(PredictResponse::from(prediction)))
}

/// Liveness plus readiness in one place
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.pipeline.unavailable_reason() {
        None => Json(serde_json::json!({
            "status": "ok",
            "ready": true,
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Some(reason) => Json(serde_json::json!({
            "status": "degraded",
            "ready": false,
            "reason": reason,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    }
}

/// Describe the feature schema the loaded model expects
pub async fn schema_info(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    let pipeline = state.pipeline()?;
    let schema = pipeline.schema();
    Ok(Json(serde_json::json!({
        "column_count": schema.len(),
        "columns": schema.columns(),
        "settable": SETTABLE_COLUMNS,
        "trees": pipeline.model().n_trees(),
    })))
}
