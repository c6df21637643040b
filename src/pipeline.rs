//! The end-to-end prediction pipeline: sparse request fields in, scored
//! and explained prediction out.
//!
//! Scoring is the hard path: if it fails the request fails. Explanation
//! is the soft path: any failure there downgrades the prediction's
//! explanation without touching its probability or label.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::explain::{Attribution, Explanation, ForcePlotRenderer, RenderConfig, TreeAttributor};
use crate::model::GradientBoostedTrees;
use crate::schema::{FeatureRow, FeatureSchema};
use crate::scorer::{RiskLabel, RiskScorer};

/// Request fields callers may set; every other schema column stays at its
/// zero default.
pub const SETTABLE_COLUMNS: [&str; 3] = ["G1", "absences", "studytime"];

/// A scored and explained prediction.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub probability: f64,
    pub label: RiskLabel,
    pub explanation: Explanation,
}

/// Immutable serving pipeline built once at startup.
pub struct RiskPipeline {
    schema: FeatureSchema,
    model: Arc<GradientBoostedTrees>,
    scorer: RiskScorer,
    attributor: TreeAttributor,
    renderer: ForcePlotRenderer,
}

impl RiskPipeline {
    /// Load the pipeline from its two artifacts: the model and the
    /// training-time column list.
    pub fn load<P: AsRef<Path>>(model_path: P, schema_path: P) -> Result<Self> {
        let schema = FeatureSchema::load(schema_path)?;
        let model = GradientBoostedTrees::load(model_path)?;
        Self::from_parts(schema, model, RenderConfig::default())
    }

    /// Assemble a pipeline from already-loaded parts.
    ///
    /// The attributor construction cross-checks model width against the
    /// schema, so a mismatched artifact pair fails here, at startup.
    pub fn from_parts(
        schema: FeatureSchema,
        model: GradientBoostedTrees,
        render: RenderConfig,
    ) -> Result<Self> {
        let model = Arc::new(model);
        let attributor = TreeAttributor::new(Arc::clone(&model), &schema)?;
        let scorer = RiskScorer::new(Arc::clone(&model));
        let renderer = ForcePlotRenderer::new(render)?;
        Ok(Self {
            schema,
            model,
            scorer,
            attributor,
            renderer,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn model(&self) -> &Arc<GradientBoostedTrees> {
        &self.model
    }

    /// Build the dense row for a request: zeros everywhere except the
    /// three settable columns.
    pub fn build_row(&self, g1: i64, absences: i64, studytime: i64) -> FeatureRow {
        self.schema.build_row(&[
            ("G1", g1 as f64),
            ("absences", absences as f64),
            ("studytime", studytime as f64),
        ])
    }

    pub fn score_row(&self, row: &FeatureRow) -> Result<crate::scorer::RiskScore> {
        self.scorer.score(row)
    }

    pub fn explain_row(&self, row: &FeatureRow) -> Result<Attribution> {
        self.attributor.attribute(row)
    }

    pub fn render(&self, attribution: &Attribution, probability: f64) -> Result<String> {
        self.renderer.render(attribution, probability)
    }

    /// Score and explain one request.
    pub fn predict(&self, g1: i64, absences: i64, studytime: i64) -> Result<Prediction> {
        let row = self.build_row(g1, absences, studytime);
        let score = self.scorer.score(&row)?;

        let explanation = match self.attributor.attribute(&row) {
            Ok(attribution) => match self.renderer.render(&attribution, score.probability) {
                Ok(image_base64) => Explanation::Rendered {
                    attribution,
                    image_base64,
                },
                Err(e) => {
                    warn!(error = %e, "explanation chart failed; serving score without it");
                    Explanation::Unrendered {
                        reason: e.to_string(),
                    }
                }
            },
            Err(e) => {
                warn!(error = %e, "attribution failed; serving score without it");
                Explanation::Unrendered {
                    reason: e.to_string(),
                }
            }
        };

        Ok(Prediction {
            probability: score.probability,
            label: score.label,
            explanation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeNode;

    fn tiny_pipeline(render: RenderConfig) -> RiskPipeline {
        let schema = FeatureSchema::new(vec![
            "G1".to_string(),
            "absences".to_string(),
            "studytime".to_string(),
            "failures".to_string(),
        ])
        .unwrap();
        let tree = TreeNode::split(
            0,
            9.5,
            0.0,
            TreeNode::leaf(2.0),
            TreeNode::leaf(-2.0),
        );
        let model = GradientBoostedTrees::new(0.0, 1.0, 4, vec![tree]).unwrap();
        RiskPipeline::from_parts(schema, model, render).unwrap()
    }

    #[test]
    fn test_predict_scores_and_renders() {
        let pipeline = tiny_pipeline(RenderConfig {
            width: 400,
            height: 200,
            max_features: 10,
        });
        let prediction = pipeline.predict(5, 20, 1).unwrap();
        assert!(prediction.probability > 0.5);
        assert_eq!(prediction.label, RiskLabel::HighRisk);
        assert!(prediction.explanation.is_rendered());
        assert!(!prediction.explanation.image_base64().is_empty());
    }

    #[test]
    fn test_render_failure_does_not_change_score() {
        let working = tiny_pipeline(RenderConfig {
            width: 400,
            height: 200,
            max_features: 10,
        });
        let broken = tiny_pipeline(RenderConfig {
            width: 0,
            height: 200,
            max_features: 10,
        });

        let reference = working.predict(5, 20, 1).unwrap();
        let degraded = broken.predict(5, 20, 1).unwrap();

        assert_eq!(
            degraded.probability.to_bits(),
            reference.probability.to_bits()
        );
        assert_eq!(degraded.label, reference.label);
        assert!(!degraded.explanation.is_rendered());
        assert_eq!(degraded.explanation.image_base64(), "");
    }

    #[test]
    fn test_mismatched_artifacts_fail_at_assembly() {
        let schema = FeatureSchema::new(vec!["G1".to_string()]).unwrap();
        let model = GradientBoostedTrees::new(0.0, 0.1, 4, vec![]).unwrap();
        let result = RiskPipeline::from_parts(schema, model, RenderConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_attribution_additivity_through_pipeline() {
        let pipeline = tiny_pipeline(RenderConfig {
            width: 400,
            height: 200,
            max_features: 10,
        });
        let row = pipeline.build_row(5, 20, 1);
        let attribution = pipeline.explain_row(&row).unwrap();
        let margin = attribution.base_value + attribution.sum_contributions();
        assert!((margin - attribution.margin).abs() < 1e-9);
    }
}
