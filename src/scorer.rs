//! Risk scoring: probability plus the binary label served to callers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::GradientBoostedTrees;
use crate::schema::FeatureRow;

/// Decision boundary between the two labels. Not configurable: the label
/// is a presentation of the probability, not a tunable policy.
const RISK_THRESHOLD: f64 = 0.5;

/// Binary outcome served alongside the probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "Safe")]
    Safe,
    #[serde(rename = "High Risk")]
    HighRisk,
}

impl RiskLabel {
    /// Strictly above the boundary maps to [`RiskLabel::HighRisk`];
    /// exactly on it maps to [`RiskLabel::Safe`].
    pub fn from_probability(probability: f64) -> Self {
        if probability > RISK_THRESHOLD {
            RiskLabel::HighRisk
        } else {
            RiskLabel::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Safe => "Safe",
            RiskLabel::HighRisk => "High Risk",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored row: probability of the risky class and its label.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RiskScore {
    pub probability: f64,
    pub label: RiskLabel,
}

/// Scores feature rows against the loaded model.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    model: Arc<GradientBoostedTrees>,
}

impl RiskScorer {
    pub fn new(model: Arc<GradientBoostedTrees>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<GradientBoostedTrees> {
        &self.model
    }

    pub fn score(&self, row: &FeatureRow) -> Result<RiskScore> {
        let probability = self.model.predict_proba(row.as_slice())?;
        Ok(RiskScore {
            probability,
            label: RiskLabel::from_probability(probability),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeNode;
    use crate::schema::FeatureSchema;

    fn scorer_with_one_tree() -> (FeatureSchema, RiskScorer) {
        let schema =
            FeatureSchema::new(vec!["G1".to_string(), "absences".to_string()]).unwrap();
        let tree = TreeNode::split(0, 10.0, 0.0, TreeNode::leaf(2.0), TreeNode::leaf(-2.0));
        let model = GradientBoostedTrees::new(0.0, 1.0, 2, vec![tree]).unwrap();
        (schema, RiskScorer::new(Arc::new(model)))
    }

    #[test]
    fn test_label_strictly_above_half_is_high_risk() {
        assert_eq!(RiskLabel::from_probability(0.500001), RiskLabel::HighRisk);
        assert_eq!(RiskLabel::from_probability(1.0), RiskLabel::HighRisk);
    }

    #[test]
    fn test_label_at_exactly_half_is_safe() {
        assert_eq!(RiskLabel::from_probability(0.5), RiskLabel::Safe);
    }

    #[test]
    fn test_label_below_half_is_safe() {
        assert_eq!(RiskLabel::from_probability(0.499999), RiskLabel::Safe);
        assert_eq!(RiskLabel::from_probability(0.0), RiskLabel::Safe);
    }

    #[test]
    fn test_score_matches_label_rule() {
        let (schema, scorer) = scorer_with_one_tree();
        let risky = scorer.score(&schema.build_row(&[("G1", 5.0)])).unwrap();
        assert!(risky.probability > 0.5);
        assert_eq!(risky.label, RiskLabel::HighRisk);

        let safe = scorer.score(&schema.build_row(&[("G1", 15.0)])).unwrap();
        assert!(safe.probability < 0.5);
        assert_eq!(safe.label, RiskLabel::Safe);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let (schema, scorer) = scorer_with_one_tree();
        let row = schema.build_row(&[("G1", 9.0), ("absences", 4.0)]);
        let first = scorer.score(&row).unwrap();
        for _ in 0..10 {
            let again = scorer.score(&row).unwrap();
            assert_eq!(again.probability.to_bits(), first.probability.to_bits());
            assert_eq!(again.label, first.label);
        }
    }

    #[test]
    fn test_label_serializes_with_space() {
        assert_eq!(
            serde_json::to_string(&RiskLabel::HighRisk).unwrap(),
            "\"High Risk\""
        );
        assert_eq!(serde_json::to_string(&RiskLabel::Safe).unwrap(), "\"Safe\"");
    }
}
