//! Gradient boosted tree ensemble loaded from a trained artifact.
//!
//! The artifact is a JSON document produced offline by the training
//! pipeline. Each tree node carries the expected raw margin (`value`) of
//! the training rows that reached it, which is what makes exact
//! decision-path attribution possible without re-touching training data.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EarlywarnError, Result};

/// Artifact format version understood by this build.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Logistic link between raw margin and probability.
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// A node in a regression tree over dense feature rows.
///
/// Split semantics follow the usual left-closed convention:
/// `feature <= threshold` goes left, otherwise right.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        value: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn leaf(value: f64) -> Self {
        TreeNode::Leaf { value }
    }

    pub fn split(feature: usize, threshold: f64, value: f64, left: TreeNode, right: TreeNode) -> Self {
        TreeNode::Split {
            feature,
            threshold,
            value,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Expected margin of the rows that reach this node; the leaf weight
    /// for leaves.
    pub fn value(&self) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split { value, .. } => *value,
        }
    }

    /// Walk the sample to a leaf and return its weight.
    fn predict(&self, sample: &[f64]) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    /// Walk the sample to a leaf, crediting each split's feature with the
    /// change in expected margin between parent and taken child.
    ///
    /// The per-step credits telescope: their sum is exactly
    /// `leaf.value() - root.value()`.
    fn credit_path(&self, sample: &[f64], credits: &mut [f64]) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature,
                threshold,
                value,
                left,
                right,
            } => {
                let child = if sample[*feature] <= *threshold { left } else { right };
                credits[*feature] += child.value() - *value;
                child.credit_path(sample, credits)
            }
        }
    }

    fn max_feature(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Split {
                feature, left, right, ..
            } => {
                let mut max = *feature;
                if let Some(m) = left.max_feature() {
                    max = max.max(m);
                }
                if let Some(m) = right.max_feature() {
                    max = max.max(m);
                }
                Some(max)
            }
        }
    }

    fn all_finite(&self) -> bool {
        match self {
            TreeNode::Leaf { value } => value.is_finite(),
            TreeNode::Split {
                threshold,
                value,
                left,
                right,
                ..
            } => {
                threshold.is_finite() && value.is_finite() && left.all_finite() && right.all_finite()
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }
}

/// A binary classifier: additive trees over a base score, squashed
/// through the logistic link.
///
/// `margin(x) = base_score + learning_rate * sum(tree_i(x))`, and the
/// served probability is `sigmoid(margin(x))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    version: u32,
    base_score: f64,
    learning_rate: f64,
    n_features: usize,
    trees: Vec<TreeNode>,
}

impl GradientBoostedTrees {
    pub fn new(
        base_score: f64,
        learning_rate: f64,
        n_features: usize,
        trees: Vec<TreeNode>,
    ) -> Result<Self> {
        let model = Self {
            version: MODEL_FORMAT_VERSION,
            base_score,
            learning_rate,
            n_features,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    /// Load a model from a JSON artifact, validating it structurally
    /// before use.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let model: GradientBoostedTrees = serde_json::from_str(&raw)?;
        model.validate()?;
        Ok(model)
    }

    /// Write the model as a JSON artifact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), raw)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.version != MODEL_FORMAT_VERSION {
            return Err(EarlywarnError::Model(format!(
                "unsupported artifact version {} (expected {})",
                self.version, MODEL_FORMAT_VERSION
            )));
        }
        if self.n_features == 0 {
            return Err(EarlywarnError::Model(
                "model must declare at least one feature".to_string(),
            ));
        }
        if !self.base_score.is_finite() || !self.learning_rate.is_finite() {
            return Err(EarlywarnError::Model(
                "base score and learning rate must be finite".to_string(),
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if !tree.all_finite() {
                return Err(EarlywarnError::Model(format!(
                    "tree {i} contains a non-finite threshold or value"
                )));
            }
            if let Some(max) = tree.max_feature() {
                if max >= self.n_features {
                    return Err(EarlywarnError::Model(format!(
                        "tree {i} references feature {max} but model has {} features",
                        self.n_features
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn trees(&self) -> &[TreeNode] {
        &self.trees
    }

    fn check_width(&self, sample: &[f64]) -> Result<()> {
        if sample.len() != self.n_features {
            return Err(EarlywarnError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", sample.len()),
            });
        }
        Ok(())
    }

    /// Raw margin (log-odds) for a sample.
    pub fn predict_margin(&self, sample: &[f64]) -> Result<f64> {
        self.check_width(sample)?;
        let tree_sum: f64 = self.trees.iter().map(|t| t.predict(sample)).sum();
        Ok(self.base_score + self.learning_rate * tree_sum)
    }

    /// Probability of the positive class for a sample.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64> {
        Ok(sigmoid(self.predict_margin(sample)?))
    }

    /// Expected margin over the training distribution: the margin of a row
    /// that stops at every root. This is the baseline that per-feature
    /// contributions are measured against.
    pub fn expected_margin(&self) -> f64 {
        let root_sum: f64 = self.trees.iter().map(TreeNode::value).sum();
        self.base_score + self.learning_rate * root_sum
    }

    /// Per-feature contributions to the sample's margin, in margin units.
    ///
    /// Exact by construction: `expected_margin() + sum(contributions)`
    /// equals `predict_margin(sample)` up to float rounding.
    pub fn path_contributions(&self, sample: &[f64]) -> Result<Vec<f64>> {
        self.check_width(sample)?;
        let mut credits = vec![0.0; self.n_features];
        for tree in &self.trees {
            tree.credit_path(sample, &mut credits);
        }
        for credit in &mut credits {
            *credit *= self.learning_rate;
        }
        Ok(credits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two shallow trees over three features.
    fn sample_model() -> GradientBoostedTrees {
        let tree_a = TreeNode::split(
            0,
            10.0,
            0.1,
            TreeNode::leaf(1.2),
            TreeNode::split(0, 14.0, -0.6, TreeNode::leaf(-0.2), TreeNode::leaf(-1.0)),
        );
        let tree_b = TreeNode::split(1, 5.0, -0.05, TreeNode::leaf(-0.4), TreeNode::leaf(0.8));
        GradientBoostedTrees::new(0.2, 0.5, 3, vec![tree_a, tree_b]).unwrap()
    }

    #[test]
    fn test_predict_walks_both_branches() {
        let model = sample_model();
        // feature0 <= 10 -> 1.2; feature1 <= 5 -> -0.4
        let margin = model.predict_margin(&[8.0, 2.0, 0.0]).unwrap();
        assert!((margin - (0.2 + 0.5 * (1.2 - 0.4))).abs() < 1e-12);
        // feature0 > 14 -> -1.0; feature1 > 5 -> 0.8
        let margin = model.predict_margin(&[16.0, 9.0, 0.0]).unwrap();
        assert!((margin - (0.2 + 0.5 * (-1.0 + 0.8))).abs() < 1e-12);
    }

    #[test]
    fn test_proba_is_sigmoid_of_margin() {
        let model = sample_model();
        let sample = [8.0, 2.0, 0.0];
        let margin = model.predict_margin(&sample).unwrap();
        let proba = model.predict_proba(&sample).unwrap();
        assert!((proba - sigmoid(margin)).abs() < 1e-15);
        assert!(proba > 0.0 && proba < 1.0);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let model = sample_model();
        let result = model.predict_margin(&[1.0, 2.0]);
        assert!(matches!(result, Err(EarlywarnError::Shape { .. })));
    }

    #[test]
    fn test_contributions_telescope_to_margin() {
        let model = sample_model();
        for sample in [[8.0, 2.0, 0.0], [12.0, 9.0, 1.0], [16.0, 2.0, -3.0]] {
            let margin = model.predict_margin(&sample).unwrap();
            let credits = model.path_contributions(&sample).unwrap();
            let reconstructed = model.expected_margin() + credits.iter().sum::<f64>();
            assert!(
                (reconstructed - margin).abs() < 1e-9,
                "expected {margin}, reconstructed {reconstructed}"
            );
        }
    }

    #[test]
    fn test_unused_feature_gets_zero_contribution() {
        let model = sample_model();
        let credits = model.path_contributions(&[8.0, 2.0, 123.0]).unwrap();
        assert_eq!(credits[2], 0.0);
    }

    #[test]
    fn test_empty_ensemble_predicts_base_score() {
        let model = GradientBoostedTrees::new(0.0, 0.1, 2, vec![]).unwrap();
        let margin = model.predict_margin(&[1.0, 2.0]).unwrap();
        assert_eq!(margin, 0.0);
        assert_eq!(model.predict_proba(&[1.0, 2.0]).unwrap(), 0.5);
    }

    #[test]
    fn test_out_of_range_feature_index_rejected() {
        let tree = TreeNode::split(5, 1.0, 0.0, TreeNode::leaf(0.1), TreeNode::leaf(-0.1));
        let result = GradientBoostedTrees::new(0.0, 0.1, 3, vec![tree]);
        assert!(matches!(result, Err(EarlywarnError::Model(_))));
    }

    #[test]
    fn test_non_finite_leaf_rejected() {
        let tree = TreeNode::split(
            0,
            1.0,
            0.0,
            TreeNode::leaf(f64::NAN),
            TreeNode::leaf(-0.1),
        );
        let result = GradientBoostedTrees::new(0.0, 0.1, 3, vec![tree]);
        assert!(matches!(result, Err(EarlywarnError::Model(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let model = sample_model();
        let path = std::env::temp_dir().join("earlywarn_test_model.json");
        model.save(&path).unwrap();
        let loaded = GradientBoostedTrees::load(&path).unwrap();
        assert_eq!(loaded.n_trees(), model.n_trees());
        assert_eq!(loaded.n_features(), model.n_features());
        let sample = [8.0, 2.0, 0.0];
        assert_eq!(
            loaded.predict_margin(&sample).unwrap(),
            model.predict_margin(&sample).unwrap()
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let model = sample_model();
        let mut raw = serde_json::to_value(&model).unwrap();
        raw["version"] = serde_json::json!(99);
        let path = std::env::temp_dir().join("earlywarn_test_bad_version.json");
        std::fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();
        let result = GradientBoostedTrees::load(&path);
        assert!(matches!(result, Err(EarlywarnError::Model(_))));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_tree_shape_helpers() {
        let model = sample_model();
        assert_eq!(model.trees()[0].depth(), 3);
        assert_eq!(model.trees()[0].leaf_count(), 3);
        assert_eq!(model.trees()[1].depth(), 2);
    }
}
