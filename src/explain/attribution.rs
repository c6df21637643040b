//! Exact per-feature contributions for a single prediction.
//!
//! Contributions are computed from the decision paths of the loaded trees,
//! in margin (log-odds) units. No sampling is involved, so the same row
//! always produces the same attribution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{EarlywarnError, Result};
use crate::model::GradientBoostedTrees;
use crate::schema::{FeatureRow, FeatureSchema};

/// Feature contribution to a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContribution {
    /// Feature index in schema order
    pub feature_index: usize,
    /// Feature name
    pub feature_name: String,
    /// Feature value for this row
    pub feature_value: f64,
    /// Contribution to the margin
    pub contribution: f64,
}

/// Attribution for a single prediction
///
/// Additive decomposition of the row's margin:
/// `base_value + sum(contributions) == margin` up to float rounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    /// Expected margin over the training distribution
    pub base_value: f64,
    /// Raw margin for this row; the served probability is its sigmoid
    pub margin: f64,
    /// Per-feature contributions, one entry per schema column
    pub contributions: Vec<FeatureContribution>,
}

impl Attribution {
    /// Get sum of contributions
    pub fn sum_contributions(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }

    /// Get sorted contributions (by absolute value, descending)
    pub fn sorted_contributions(&self) -> Vec<&FeatureContribution> {
        let mut sorted: Vec<&FeatureContribution> = self.contributions.iter().collect();
        sorted.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// Get top k contributors
    pub fn top_k_contributors(&self, k: usize) -> Vec<&FeatureContribution> {
        self.sorted_contributions().into_iter().take(k).collect()
    }

    /// Get contributors pushing the prediction toward risk
    pub fn positive_contributors(&self) -> Vec<&FeatureContribution> {
        self.contributions
            .iter()
            .filter(|c| c.contribution > 0.0)
            .collect()
    }

    /// Get contributors pushing the prediction away from risk
    pub fn negative_contributors(&self) -> Vec<&FeatureContribution> {
        self.contributions
            .iter()
            .filter(|c| c.contribution < 0.0)
            .collect()
    }
}

/// Computes exact decision-path attributions against the loaded model.
#[derive(Debug, Clone)]
pub struct TreeAttributor {
    model: Arc<GradientBoostedTrees>,
    feature_names: Vec<String>,
}

impl TreeAttributor {
    /// Create an attributor for a model and the schema it was trained on.
    ///
    /// Fails if the schema width does not match the model width, so the
    /// mismatch surfaces at startup rather than on the first request.
    pub fn new(model: Arc<GradientBoostedTrees>, schema: &FeatureSchema) -> Result<Self> {
        if schema.len() != model.n_features() {
            return Err(EarlywarnError::Shape {
                expected: format!("{} columns (model)", model.n_features()),
                actual: format!("{} columns (schema)", schema.len()),
            });
        }
        Ok(Self {
            model,
            feature_names: schema.columns().to_vec(),
        })
    }

    /// Attribute a row's margin across its features.
    pub fn attribute(&self, row: &FeatureRow) -> Result<Attribution> {
        let sample = row.as_slice();
        let credits = self.model.path_contributions(sample)?;
        let margin = self.model.predict_margin(sample)?;
        let base_value = self.model.expected_margin();

        let contributions = credits
            .into_iter()
            .enumerate()
            .map(|(i, contribution)| FeatureContribution {
                feature_index: i,
                feature_name: self.feature_names[i].clone(),
                feature_value: sample[i],
                contribution,
            })
            .collect();

        Ok(Attribution {
            base_value,
            margin,
            contributions,
        })
    }
}
